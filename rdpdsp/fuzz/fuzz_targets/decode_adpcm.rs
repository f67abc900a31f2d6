#![no_main]
use libfuzzer_sys::fuzz_target;
use rdpdsp::core::format::AudioFormat;
use rdpdsp_fuzz::fuzz_decode;

fuzz_target!(|data: Vec<u8>| {
    if data.len() < 4 {
        return;
    }

    // Use the first byte to select the algorithm and channel count, and the next two bytes as the
    // block alignment, including ones that are too small.
    let channels = 1 + u16::from(data[0] & 1);
    let block_align = u16::from_le_bytes([data[1], data[2]]);

    let format = if data[0] & 2 == 0 {
        AudioFormat::adpcm_ima(channels, 22050, block_align)
    }
    else {
        AudioFormat::adpcm_ms(channels, 22050, block_align)
    };

    // Split the rest of the data into two packets so state is carried across calls.
    let payload = &data[3..];
    let (first, second) = payload.split_at(payload.len() / 2);

    fuzz_decode(&format, &[first, second]);
});
