// rdpdsp Check Tool
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::info;
use serde::Serialize;

use rdpdsp::{CodecState, DspContext};
use rdpdsp::core::codecs::Mode;
use rdpdsp::core::errors::Result;
use rdpdsp::core::format::AudioFormat;
use rdpdsp::core::io::ByteBuffer;
use rdpdsp::core::util::pcm::samples_i16;

/// Nibble groups of every ADPCM layout divide evenly into packets of this many frames.
const PACKET_FRAME_MULTIPLE: usize = 8;

pub struct CheckOptions {
    /// The format of the PCM being checked. Always 16 bits per sample.
    pub source: AudioFormat,
    /// The wire format to round-trip through.
    pub target: AudioFormat,
    /// The number of PCM frames passed to each encode call.
    pub packet_frames: usize,
}

#[derive(Default, Serialize)]
pub struct CheckReport {
    pub codec: String,
    pub frames_in: u64,
    pub frames_out: u64,
    pub packets: u64,
    pub pcm_bytes: u64,
    pub compressed_bytes: u64,
    pub compression_ratio: f64,
    /// Deviation statistics. Only present when the stream was not resampled.
    pub abs_max_delta: Option<i32>,
    pub rms_delta: Option<f64>,
}

fn codec_name(state: &CodecState) -> &str {
    match state {
        CodecState::Unset => "none",
        CodecState::Pcm => "pcm",
        CodecState::Ima(_) => "ima",
        CodecState::Ms(_) => "ms",
        CodecState::External { codec, .. } => codec.codec_info().short_name,
    }
}

/// Generate a 16-bit sine sweep from 100 Hz to a quarter of the sample rate.
pub fn sine_sweep(frames: usize, channels: u16, rate: u32) -> Vec<u8> {
    let channels = usize::from(channels);
    let rate = f64::from(rate);
    let sweep = (rate / 4.0 - 100.0) / frames.max(1) as f64;

    let mut pcm = Vec::with_capacity(2 * frames * channels);
    let mut phase = 0.0f64;

    for i in 0..frames {
        let freq = 100.0 + sweep * i as f64;
        phase += 2.0 * std::f64::consts::PI * freq / rate;

        let sample = (16384.0 * phase.sin()) as i16;

        for _ in 0..channels {
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
    }

    pcm
}

pub fn run_check(pcm: &[u8], opts: &CheckOptions) -> Result<CheckReport> {
    let mut encoder = DspContext::new(Mode::Encoder)?;
    encoder.reset_format(&opts.target)?;

    let mut decoder = DspContext::new(Mode::Decoder)?;
    decoder.reset_format(&opts.target)?;

    let codec = codec_name(encoder.state()).to_string();

    let packet_frames = (opts.packet_frames / PACKET_FRAME_MULTIPLE).max(1) * PACKET_FRAME_MULTIPLE;
    let packet_len = packet_frames * opts.source.bytes_per_frame();

    info!(
        "checking {} with {} ch at {} Hz, {} frames per packet",
        codec, opts.target.channels, opts.target.samples_per_sec, packet_frames
    );

    let mut report = CheckReport { codec, ..Default::default() };

    let resampled = opts.source.samples_per_sec != opts.target.samples_per_sec
        || opts.source.channels != opts.target.channels;

    let out_frame_len = 2 * usize::from(opts.target.channels);

    let mut coded = ByteBuffer::new();
    let mut decoded = ByteBuffer::new();

    let mut n_samples = 0u64;
    let mut abs_max = 0i32;
    let mut sum_sq = 0f64;

    for packet in pcm.chunks(packet_len) {
        coded.clear();
        decoded.clear();

        encoder.encode(&opts.source, packet, &mut coded)?;
        decoder.decode(&opts.target, coded.as_slice(), &mut decoded)?;

        report.compressed_bytes += coded.len() as u64;
        report.frames_out += (decoded.len() / out_frame_len) as u64;
        report.packets += 1;

        if resampled {
            continue;
        }

        // ADPCM encoders hold back the tail of every packet. Compare what was decoded.
        for (a, b) in samples_i16(packet).zip(samples_i16(decoded.as_slice())) {
            let delta = i32::from(a) - i32::from(b);

            abs_max = abs_max.max(delta.abs());
            sum_sq += f64::from(delta) * f64::from(delta);
            n_samples += 1;
        }
    }

    report.pcm_bytes = pcm.len() as u64;
    report.frames_in = (pcm.len() / opts.source.bytes_per_frame()) as u64;

    if report.compressed_bytes > 0 {
        report.compression_ratio = report.pcm_bytes as f64 / report.compressed_bytes as f64;
    }

    if !resampled {
        report.abs_max_delta = Some(abs_max);
        report.rms_delta =
            Some(if n_samples > 0 { (sum_sq / n_samples as f64).sqrt() } else { 0.0 });
    }

    Ok(report)
}
