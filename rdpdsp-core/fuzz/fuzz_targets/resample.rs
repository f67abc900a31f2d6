#![no_main]

use libfuzzer_sys::fuzz_target;

use rdpdsp_core::dsp::resample::{resample, resampled_frames};
use rdpdsp_core::format::AudioFormat;
use rdpdsp_core::io::ByteBuffer;

const RATES: &[u32] = &[1, 8000, 11025, 16000, 22050, 44100, 48000, 96000];

fuzz_target!(|data: Vec<u8>| {
    if data.len() < 2 {
        return;
    }

    let src_rate = RATES[usize::from(data[0] & 7)];
    let dst_rate = RATES[usize::from((data[0] >> 3) & 7)];
    let src_channels = 1 + u16::from(data[1] & 1);
    let dst_channels = 1 + u16::from((data[1] >> 1) & 1);
    let bits = if data[1] & 4 == 0 { 16 } else { 8 };

    let format = AudioFormat::pcm(src_channels, src_rate, bits);
    let src = &data[2..];

    let mut out = ByteBuffer::with_limit(1 << 24);

    if resample(src, &format, dst_rate, dst_channels, &mut out).is_ok() {
        let src_frames = (src.len() / format.bytes_per_frame()) as u64;
        let frames = resampled_frames(src_frames, src_rate, dst_rate);
        let frame_len = format.bytes_per_sample() * usize::from(dst_channels);

        assert_eq!(out.len() as u64, frames * frame_len as u64);
    }
});
