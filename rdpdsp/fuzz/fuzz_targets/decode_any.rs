#![no_main]
use libfuzzer_sys::fuzz_target;
use rdpdsp_fuzz::{formats, fuzz_decode};

fuzz_target!(|data: Vec<u8>| {
    if data.is_empty() {
        return;
    }

    // Use the first byte to select the format.
    let formats = formats();
    let format = &formats[data[0] as usize % formats.len()];

    // Use the rest of the data as payload.
    fuzz_decode(format, &[&data[1..]]);
});
