#![no_main]
use libfuzzer_sys::fuzz_target;
use rdpdsp::core::format::AudioFormat;
use rdpdsp_fuzz::{formats, fuzz_encode};

const SOURCE_RATES: &[u32] = &[8000, 11025, 22050, 44100, 48000];

fuzz_target!(|data: Vec<u8>| {
    if data.len() < 2 {
        return;
    }

    // Use the first byte to select the target format, and the second the source layout.
    let formats = formats();
    let format = &formats[data[0] as usize % formats.len()];

    let channels = 1 + u16::from(data[1] & 1);
    let bits = if data[1] & 2 == 0 { 16 } else { 8 };
    let rate = SOURCE_RATES[(data[1] >> 2) as usize % SOURCE_RATES.len()];

    fuzz_encode(&AudioFormat::pcm(channels, rate, bits), format, &data[2..]);
});
