// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use rdpdsp::core::codecs::registry::{CodecRegistry, RegisterableProvider, SupportedFormat};
use rdpdsp::core::codecs::{CodecInfo, DspOptions, ExternalCodec, Mode};
use rdpdsp::core::errors::{Error, Result};
use rdpdsp::core::format::well_known::*;
use rdpdsp::core::format::{AudioFormat, FormatTag};
use rdpdsp::core::io::ByteBuffer;
use rdpdsp::core::util::pcm::samples_i16;
use rdpdsp::{CodecState, DspContext};

fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// A slowly varying signal with some noise, interleaved over `channels`.
fn signal(frames: usize, channels: usize, seed: u64) -> Vec<i16> {
    let mut rng = SmallRng::seed_from_u64(seed);

    (0..frames * channels)
        .map(|i| {
            let t = (i / channels) as f64 / 8000.0;
            let ch = (i % channels) as f64;
            let tone = 6000.0 * (2.0 * std::f64::consts::PI * (100.0 + 100.0 * ch) * t).sin();
            tone as i16 + rng.random_range(-32..32)
        })
        .collect()
}

fn encoder(format: &AudioFormat) -> DspContext<'static> {
    let mut ctx = DspContext::new(Mode::Encoder).unwrap();
    ctx.reset_format(format).unwrap();
    ctx
}

fn decoder(format: &AudioFormat) -> DspContext<'static> {
    let mut ctx = DspContext::new(Mode::Decoder).unwrap();
    ctx.reset_format(format).unwrap();
    ctx
}

#[test]
fn verify_pcm_passthrough() {
    let format = AudioFormat::pcm(2, 44100, 16);
    let data: Vec<u8> = (0..=255).collect();

    let mut out = ByteBuffer::new();
    encoder(&format).encode(&format, &data, &mut out).unwrap();
    assert_eq!(out.as_slice(), &data[..]);

    let mut out = ByteBuffer::new();
    decoder(&format).decode(&format, &data, &mut out).unwrap();
    assert_eq!(out.as_slice(), &data[..]);
}

#[test]
fn verify_encode_resamples_first() {
    let target = AudioFormat::pcm(1, 11025, 16);
    let source = AudioFormat::pcm(1, 8000, 16);

    let samples: Vec<i16> = (0..100).collect();

    let mut out = ByteBuffer::new();
    encoder(&target).encode(&source, &to_bytes(&samples), &mut out).unwrap();

    assert_eq!(out.len(), 138 * 2);

    // Equal rates but different channel counts still go through the resampler.
    let target = AudioFormat::pcm(2, 8000, 16);

    let mut out = ByteBuffer::new();
    encoder(&target).encode(&source, &to_bytes(&[5, -5]), &mut out).unwrap();
    assert_eq!(out.as_slice(), &to_bytes(&[5, 5, -5, -5])[..]);
}

/// Encode and decode a signal packet by packet, returning the input and output of each packet.
fn round_trip(
    format: &AudioFormat,
    frames: usize,
    packet_frames: usize,
) -> Vec<(Vec<i16>, Vec<i16>)> {
    let channels = usize::from(format.channels);
    let source = AudioFormat::pcm(format.channels, format.samples_per_sec, 16);

    let input = signal(frames, channels, 0x5eed);

    let mut enc = encoder(format);
    let mut dec = decoder(format);

    let mut packets = Vec::new();

    for packet in input.chunks(packet_frames * channels) {
        let mut coded = ByteBuffer::new();
        enc.encode(&source, &to_bytes(packet), &mut coded).unwrap();

        let mut decoded = ByteBuffer::new();
        dec.decode(format, coded.as_slice(), &mut decoded).unwrap();

        packets.push((packet.to_vec(), samples_i16(decoded.as_slice()).collect()));
    }

    packets
}

fn max_deviation(input: &[i16], output: &[i16], skip: usize) -> i32 {
    input
        .iter()
        .zip(output)
        .skip(skip)
        .map(|(&a, &b)| (i32::from(a) - i32::from(b)).abs())
        .max()
        .unwrap_or(0)
}

/// Check each packet decodes to its input minus the samples the encoder held back.
fn check_packets(packets: &[(Vec<i16>, Vec<i16>)], held_back: usize, skip: usize) {
    for (i, (input, output)) in packets.iter().enumerate() {
        assert_eq!(output.len(), input.len() - held_back, "packet {}", i);

        // Each packet opens with a jump over the samples held back from the previous one.
        assert!(max_deviation(input, output, skip) < 1024, "packet {}", i);
    }
}

#[test]
fn verify_ima_round_trip() {
    // One block per packet: 2040 mono samples, or 1016 stereo frames, of which the last group
    // of 2 samples or 8 frames is held back.
    let mono = AudioFormat::adpcm_ima(1, 8000, 1024);
    check_packets(&round_trip(&mono, 2 * 2040, 2040), 2, 64);

    let stereo = AudioFormat::adpcm_ima(2, 8000, 1024);
    check_packets(&round_trip(&stereo, 2 * 1016, 1016), 16, 128);
}

#[test]
fn verify_ms_round_trip() {
    // One block per packet: 2 header frames then one byte per stereo frame or per 2 mono samples.
    // The encoder stops once fewer than 2 frames and one code byte remain, holding back the
    // last 2 frames.
    let mono = AudioFormat::adpcm_ms(1, 8000, 256);
    check_packets(&round_trip(&mono, 3 * 500, 500), 2, 64);

    let stereo = AudioFormat::adpcm_ms(2, 8000, 256);
    check_packets(&round_trip(&stereo, 3 * 244, 244), 4, 128);
}

#[test]
fn verify_ms_stereo_channel_assignment() {
    let format = AudioFormat::adpcm_ms(2, 8000, 256);

    #[rustfmt::skip]
    let block = [
        // predictor
        0, 0,
        // delta
        16, 0, 16, 0,
        // sample1
        100, 0, 0x9c, 0xff,
        // sample2
        50, 0, 0xce, 0xff,
        // left +3, right -3
        0x3d,
    ];

    let mut out = ByteBuffer::new();
    decoder(&format).decode(&format, &block, &mut out).unwrap();

    let samples: Vec<i16> = samples_i16(out.as_slice()).collect();
    assert_eq!(samples, [50, -50, 100, -100, 148, -148]);
}

#[test]
fn verify_ima_stereo_channel_assignment() {
    let format = AudioFormat::adpcm_ima(2, 8000, 16);

    #[rustfmt::skip]
    let block = [
        // left header: sample 0, step 0. right header: sample 0, step 0.
        0, 0, 0, 0, 0, 0, 0, 0,
        // 4 left bytes then 4 right bytes.
        0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
    ];

    let mut out = ByteBuffer::new();
    decoder(&format).decode(&format, &block, &mut out).unwrap();

    let samples: Vec<i16> = samples_i16(out.as_slice()).collect();
    assert_eq!(samples.len(), 16);

    // Byte 4 opens the right channel: +7, then +1 from its upper nibble in the next frame.
    assert_eq!(samples[1], 7);
    assert_eq!(samples[3], 8);
    assert!(samples.iter().step_by(2).all(|&s| s == 0));
}

#[test]
fn verify_capability_query_matches_reset() {
    let formats = [
        AudioFormat::pcm(1, 8000, 8),
        AudioFormat::pcm(2, 44100, 16),
        AudioFormat::pcm(3, 44100, 16),
        AudioFormat::pcm(2, 44100, 24),
        AudioFormat::adpcm_ima(2, 22050, 1024),
        AudioFormat::adpcm_ms(1, 22050, 512),
        AudioFormat { tag: FORMAT_TAG_ALAW, ..AudioFormat::pcm(1, 8000, 8) },
        AudioFormat { tag: FORMAT_TAG_MULAW, ..AudioFormat::pcm(2, 8000, 8) },
        AudioFormat { tag: FORMAT_TAG_GSM610, ..AudioFormat::pcm(1, 8000, 16) },
        AudioFormat { tag: FORMAT_TAG_AAC_MS, ..AudioFormat::pcm(2, 44100, 16) },
    ];

    for format in &formats {
        for mode in [Mode::Encoder, Mode::Decoder] {
            let mut ctx = DspContext::new(mode).unwrap();

            let supported = rdpdsp::supports_format(format, mode.is_encoder());
            assert_eq!(ctx.supports_format(format), supported);

            match ctx.reset_format(format) {
                Ok(()) => assert!(supported, "{} accepted but not supported", format.tag),
                Err(Error::Unsupported(_)) => {
                    assert!(!supported, "{} rejected but supported", format.tag)
                }
                Err(err) => panic!("unexpected error {}", err),
            }
        }
    }
}

#[test]
fn verify_mode_and_format_checks() {
    let format = AudioFormat::adpcm_ima(1, 8000, 256);
    let source = AudioFormat::pcm(1, 8000, 16);

    let mut out = ByteBuffer::new();

    let mut ctx = DspContext::new(Mode::Encoder).unwrap();
    assert!(matches!(ctx.encode(&source, &[0; 4], &mut out), Err(Error::InvalidArgument(_))));

    ctx.reset_format(&format).unwrap();
    assert!(matches!(ctx.decode(&format, &[0; 4], &mut out), Err(Error::InvalidArgument(_))));

    // Compressed targets need 16-bit input.
    let source8 = AudioFormat::pcm(1, 8000, 8);
    assert!(matches!(ctx.encode(&source8, &[0; 4], &mut out), Err(Error::Unsupported(_))));

    let mut ctx = decoder(&format);
    assert_eq!(ctx.mode(), Mode::Decoder);
    assert!(matches!(ctx.encode(&source, &[0; 4], &mut out), Err(Error::InvalidArgument(_))));
    assert!(matches!(ctx.decode(&source, &[0; 4], &mut out), Err(Error::InvalidArgument(_))));

    // Step index 89 is out of range.
    assert!(matches!(
        ctx.decode(&format, &[0, 0, 89, 0, 0x11], &mut out),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn verify_allocation_failure_is_recoverable() {
    let format = AudioFormat::adpcm_ms(1, 8000, 256);
    let mut ctx = decoder(&format);

    let mut block = vec![0u8, 16, 0, 0, 0, 0, 0];
    block.extend_from_slice(&[0x12; 64]);

    let mut limited = ByteBuffer::with_limit(32);
    assert!(matches!(ctx.decode(&format, &block, &mut limited), Err(Error::AllocationFailure(_))));

    let mut out = ByteBuffer::new();
    ctx.decode(&format, &block, &mut out).unwrap();
    assert_eq!(out.len(), 2 * (2 + 2 * 64));

    // A resampling encoder with a capped scratch buffer fails the same way.
    let registry = rdpdsp::default::get_registry();
    let opts = DspOptions { scratch_capacity: 16, max_buffer_len: Some(64) };

    let mut ctx = DspContext::new_with_registry(Mode::Encoder, registry, opts).unwrap();
    ctx.reset_format(&AudioFormat::pcm(2, 48000, 16)).unwrap();

    let source = AudioFormat::pcm(1, 8000, 16);
    let data = to_bytes(&[1; 64]);

    let mut out = ByteBuffer::new();
    assert!(matches!(ctx.encode(&source, &data, &mut out), Err(Error::AllocationFailure(_))));

    ctx.encode(&source, &data[..4], &mut out).unwrap();
    assert_eq!(out.len(), 12 * 4);
}

#[test]
fn verify_g711_through_default_registry() {
    let format = AudioFormat { tag: FORMAT_TAG_ALAW, ..AudioFormat::pcm(1, 8000, 8) };
    let source = AudioFormat::pcm(1, 8000, 16);

    let mut enc = encoder(&format);
    let mut dec = decoder(&format);

    assert!(matches!(enc.state(), CodecState::External { tag: FORMAT_TAG_ALAW, .. }));

    let input = signal(400, 1, 7);

    let mut coded = ByteBuffer::new();
    enc.encode(&source, &to_bytes(&input), &mut coded).unwrap();
    assert_eq!(coded.len(), 400);

    let mut decoded = ByteBuffer::new();
    dec.decode(&format, coded.as_slice(), &mut decoded).unwrap();

    let output: Vec<i16> = samples_i16(decoded.as_slice()).collect();
    assert!(max_deviation(&input, &output, 0) <= 256);

    // Switching law replaces the provider.
    let mulaw = AudioFormat { tag: FORMAT_TAG_MULAW, ..format };
    enc.reset_format(&mulaw).unwrap();
    assert!(matches!(enc.state(), CodecState::External { tag: FORMAT_TAG_MULAW, .. }));

    // Coded G.711 samples are always 8 bits wide.
    let bad = AudioFormat { bits_per_sample: 16, ..mulaw };
    assert!(matches!(enc.reset_format(&bad), Err(Error::ProviderError(_))));
    assert_eq!(enc.format(), None);
}

const TAG_COUNTER: FormatTag = FormatTag::new(0x7000);

const COUNTER_FORMATS: &[SupportedFormat] = &[SupportedFormat {
    tag: TAG_COUNTER,
    info: CodecInfo { short_name: "counter", long_name: "Byte counting test provider" },
    encode: true,
    decode: false,
}];

/// Encodes every packet to its length, and counts resets.
struct Counter {
    resets: u8,
}

impl ExternalCodec for Counter {
    fn codec_info(&self) -> &CodecInfo {
        &COUNTER_FORMATS[0].info
    }

    fn reset(&mut self, _: &AudioFormat) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn encode(
        &mut self,
        _: &AudioFormat,
        pcm: &[u8],
        scratch: &mut ByteBuffer,
        out: &mut ByteBuffer,
    ) -> Result<()> {
        assert!(scratch.is_empty());
        scratch.write_buf(pcm)?;

        out.write_u16(scratch.len() as u16)?;
        out.write_u8(self.resets)
    }

    fn decode(
        &mut self,
        _: &AudioFormat,
        _: &[u8],
        _: &mut ByteBuffer,
        _: &mut ByteBuffer,
    ) -> Result<()> {
        unreachable!()
    }
}

impl RegisterableProvider for Counter {
    fn try_registry_new(
        _: &AudioFormat,
        _: Mode,
        _: &DspOptions,
    ) -> Result<Box<dyn ExternalCodec>> {
        Ok(Box::new(Counter { resets: 0 }))
    }

    fn supported_formats() -> &'static [SupportedFormat] {
        COUNTER_FORMATS
    }
}

#[test]
fn verify_custom_provider() {
    let mut registry = CodecRegistry::new();
    registry.register_provider::<Counter>();

    let format = AudioFormat { tag: TAG_COUNTER, ..AudioFormat::pcm(1, 8000, 16) };
    let source = AudioFormat::pcm(1, 8000, 16);

    let mut dec = DspContext::new_with_registry(Mode::Decoder, &registry, Default::default())
        .unwrap();
    assert!(!dec.supports_format(&format));
    assert!(matches!(dec.reset_format(&format), Err(Error::Unsupported(_))));

    let mut enc = DspContext::new_with_registry(Mode::Encoder, &registry, Default::default())
        .unwrap();
    enc.reset_format(&format).unwrap();

    let mut out = ByteBuffer::new();
    enc.encode(&source, &[0; 10], &mut out).unwrap();

    // The scratch buffer is emptied between calls.
    enc.reset_format(&format).unwrap();
    enc.encode(&source, &[0; 6], &mut out).unwrap();

    assert_eq!(out.as_slice(), &[10, 0, 0, 6, 0, 1]);

    // The default registry knows nothing about the test tag.
    assert!(!rdpdsp::supports_format(&format, true));
}
