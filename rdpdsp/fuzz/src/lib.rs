use rdpdsp::DspContext;
use rdpdsp::core::codecs::Mode;
use rdpdsp::core::format::AudioFormat;
use rdpdsp::core::format::well_known::*;
use rdpdsp::core::io::ByteBuffer;

/// Formats a fuzz target may select with its first input byte.
pub fn formats() -> [AudioFormat; 8] {
    [
        AudioFormat::adpcm_ima(1, 22050, 256),
        AudioFormat::adpcm_ima(2, 22050, 1024),
        AudioFormat::adpcm_ms(1, 22050, 256),
        AudioFormat::adpcm_ms(2, 44100, 2048),
        AudioFormat::pcm(1, 8000, 8),
        AudioFormat::pcm(2, 44100, 16),
        AudioFormat { tag: FORMAT_TAG_ALAW, ..AudioFormat::pcm(1, 8000, 8) },
        AudioFormat { tag: FORMAT_TAG_MULAW, ..AudioFormat::pcm(2, 8000, 8) },
    ]
}

/// Upper bound on the output of one call.
const MAX_OUTPUT_LEN: usize = 1 << 24;

pub fn fuzz_decode(format: &AudioFormat, packets: &[&[u8]]) {
    let Ok(mut ctx) = DspContext::new(Mode::Decoder)
    else {
        return;
    };

    if ctx.reset_format(format).is_err() {
        return;
    }

    for packet in packets {
        let mut out = ByteBuffer::with_limit(MAX_OUTPUT_LEN);
        let _ = ctx.decode(format, packet, &mut out);
    }
}

pub fn fuzz_encode(src_format: &AudioFormat, format: &AudioFormat, pcm: &[u8]) {
    let Ok(mut ctx) = DspContext::new(Mode::Encoder)
    else {
        return;
    };

    if ctx.reset_format(format).is_err() {
        return;
    }

    let mut out = ByteBuffer::with_limit(MAX_OUTPUT_LEN);
    let _ = ctx.encode(src_format, pcm, &mut out);
}
