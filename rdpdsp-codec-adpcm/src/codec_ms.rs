// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::trace;

use rdpdsp_core::errors::{Result, invalid_argument_error, malformed_error};
use rdpdsp_core::format::{AudioFormat, MS_ADPCM_HEADER_LEN};
use rdpdsp_core::io::{BufReader, ByteBuffer, ReadBytes};
use rdpdsp_core::util::clamp::clamp_i16;

use crate::common::{BlockLayout, Nibble, signed_nibble};

#[rustfmt::skip]
const MS_ADAPTATION_TABLE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614,
    768, 614, 512, 409, 307, 230, 230, 230,
];

const MS_ADAPT_COEFFS1: [i32; 7] = [256, 512, 0, 192, 240, 460, 392];
const MS_ADAPT_COEFFS2: [i32; 7] = [0, -256, 0, 64, 0, -208, -232];

const DELTA_MIN: i32 = 16;

/// Largest delta that can be adapted without overflowing.
const DELTA_MAX: i32 = i32::MAX / 768;

macro_rules! check_block_predictor {
    ($block_predictor:ident) => {
        if usize::from($block_predictor) >= MS_ADAPT_COEFFS1.len() {
            return malformed_error("adpcm (ms): block predictor exceeds range");
        }
    };
}

/// `MsChannelState` is the adaptive state of one channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MsChannelState {
    predictor: u8,
    delta: i32,
    /// Most recent sample.
    sample1: i32,
    /// Sample before `sample1`.
    sample2: i32,
}

impl MsChannelState {
    /// Instantiate the state of a channel. The predictor index must be in the range 0..=6.
    pub fn new(predictor: u8, delta: i32, sample1: i16, sample2: i16) -> Result<Self> {
        if usize::from(predictor) >= MS_ADAPT_COEFFS1.len() {
            return invalid_argument_error("adpcm (ms): predictor index exceeds range");
        }

        Ok(MsChannelState {
            predictor,
            delta: delta.min(DELTA_MAX),
            sample1: i32::from(sample1),
            sample2: i32::from(sample2),
        })
    }

    pub fn predictor(&self) -> u8 {
        self.predictor
    }

    pub fn delta(&self) -> i32 {
        self.delta
    }

    /// The history, most recent first.
    pub fn samples(&self) -> (i32, i32) {
        (self.sample1, self.sample2)
    }

    fn predict(&self) -> i32 {
        let p = usize::from(self.predictor);
        (self.sample1 * MS_ADAPT_COEFFS1[p] + self.sample2 * MS_ADAPT_COEFFS2[p]) / 256
    }

    fn adapt(&mut self, sample: i16, nibble: u8) {
        self.sample2 = self.sample1;
        self.sample1 = i32::from(sample);

        let delta = (self.delta * MS_ADAPTATION_TABLE[usize::from(nibble & 0x0f)]) / 256;
        self.delta = delta.clamp(DELTA_MIN, DELTA_MAX);
    }

    /// Decode one 4-bit code and return the new sample.
    pub fn expand_nibble(&mut self, nibble: u8) -> i16 {
        let sample = clamp_i16(self.predict() + signed_nibble(nibble) * self.delta);
        self.adapt(sample, nibble);
        sample
    }

    /// Encode one sample into a 4-bit code, updating the state with the reconstructed sample.
    ///
    /// The error is rounded up when the remainder exceeds half a delta, then clamped to the
    /// range of a signed nibble.
    pub fn quantize(&mut self, sample: i16) -> u8 {
        let delta = self.delta.max(DELTA_MIN);
        let predicted = self.predict();
        let diff = i32::from(sample) - predicted;

        let mut error = diff / delta;
        if diff % delta > delta / 2 {
            error += 1;
        }
        let error = error.clamp(-8, 7);

        let code = (error & 0x0f) as u8;

        self.delta = delta;
        self.adapt(clamp_i16(predicted + delta * error), code);
        code
    }
}

/// `MsAdpcmState` holds the adaptive state of an MS ADPCM stream across calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MsAdpcmState {
    channels: [MsChannelState; 2],
}

impl MsAdpcmState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets the state of a channel. Channel 1 is unused by mono streams.
    pub fn channel(&self, ch: usize) -> &MsChannelState {
        &self.channels[ch]
    }

    fn read_header<B: ReadBytes>(&mut self, stream: &mut B, channels: usize) -> Result<()> {
        let states = &mut self.channels[..channels];

        for state in states.iter_mut() {
            let block_predictor = stream.read_u8()?;
            check_block_predictor!(block_predictor);
            state.predictor = block_predictor;
        }
        for state in states.iter_mut() {
            state.delta = i32::from(stream.read_i16()?);
        }
        for state in states.iter_mut() {
            state.sample1 = i32::from(stream.read_i16()?);
        }
        for state in states.iter_mut() {
            state.sample2 = i32::from(stream.read_i16()?);
        }

        Ok(())
    }

    /// Decode the MS ADPCM blocks in `src` and append 16-bit PCM to `out`.
    ///
    /// The two history samples of each block header are emitted as the first two frames of the
    /// block, older sample first. `src` must start on a block boundary.
    pub fn decode(&mut self, format: &AudioFormat, src: &[u8], out: &mut ByteBuffer) -> Result<()> {
        let layout = BlockLayout::new(format, MS_ADPCM_HEADER_LEN)?;

        let mut reader = BufReader::new(src);

        while !reader.is_empty() {
            if layout.is_block_start(reader.pos()) {
                if reader.bytes_available() < layout.header_len {
                    return malformed_error("adpcm (ms): truncated block header");
                }

                self.read_header(&mut reader, layout.channels)?;

                let states = &self.channels[..layout.channels];

                for state in states {
                    out.write_i16(state.sample2 as i16)?;
                }
                for state in states {
                    out.write_i16(state.sample1 as i16)?;
                }
                continue;
            }

            let byte = reader.read_u8()?;

            // The upper nibble always goes to the left channel. The lower nibble goes to the
            // right channel, or is the next sample of a mono stream.
            let lower_ch = if layout.is_stereo() { 1 } else { 0 };

            let upper = self.channels[0].expand_nibble(Nibble::Upper.get_nibble(byte));
            out.write_i16(upper)?;

            let lower = self.channels[lower_ch].expand_nibble(Nibble::Lower.get_nibble(byte));
            out.write_i16(lower)?;
        }

        Ok(())
    }

    /// Encode interleaved 16-bit PCM in `src` and append MS ADPCM blocks to `out`.
    ///
    /// At each block boundary of this call's output the next two frames are consumed into the
    /// block header. Each following byte carries one stereo frame or two mono samples.
    ///
    /// Encoding continues only while the input holds two frames of history and one data byte,
    /// even in the middle of a block. Whatever is left at the end of the call is not encoded.
    pub fn encode(&mut self, format: &AudioFormat, src: &[u8], out: &mut ByteBuffer) -> Result<()> {
        let layout = BlockLayout::new(format, MS_ADPCM_HEADER_LEN)?;

        for state in &mut self.channels[..layout.channels] {
            state.delta = state.delta.max(DELTA_MIN);
        }

        // Two frames of history plus the 4 bytes of samples packed into one data byte.
        let step_len = 2 * (2 * layout.channels) + 4;

        let lower_ch = if layout.is_stereo() { 1 } else { 0 };

        let start = out.len();
        let mut reader = BufReader::new(src);

        while reader.bytes_available() >= step_len {
            if layout.is_block_start(out.len() - start) {
                self.write_header(&mut reader, layout.channels, out)?;
            }

            let upper = self.channels[0].quantize(reader.read_i16()?);
            let lower = self.channels[lower_ch].quantize(reader.read_i16()?);

            out.write_u8((upper << 4) | lower)?;
        }

        if !reader.is_empty() {
            trace!("adpcm (ms): {} trailing bytes left unencoded", reader.bytes_available());
        }

        Ok(())
    }

    /// Seed the history from the next two frames and write the block header.
    fn write_header(
        &mut self,
        reader: &mut BufReader<'_>,
        channels: usize,
        out: &mut ByteBuffer,
    ) -> Result<()> {
        let states = &mut self.channels[..channels];

        for state in states.iter_mut() {
            state.sample2 = i32::from(reader.read_i16()?);
        }
        for state in states.iter_mut() {
            state.sample1 = i32::from(reader.read_i16()?);
        }

        for state in states.iter() {
            out.write_u8(state.predictor)?;
        }
        for state in states.iter() {
            // Only the low 16 bits of delta are carried on the wire.
            out.write_u16(state.delta as u16)?;
        }
        for state in states.iter() {
            out.write_i16(state.sample1 as i16)?;
        }
        for state in states.iter() {
            out.write_i16(state.sample2 as i16)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use rdpdsp_core::errors::Error;
    use rdpdsp_core::util::pcm::samples_i16;

    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn sine(frames: usize, channels: usize, seed: u64) -> Vec<u8> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(frames * channels);

        for i in 0..frames {
            for ch in 0..channels {
                let phase = (i as f64) * 2.0 * std::f64::consts::PI * 300.0 / 22050.0;
                let tone = 6000.0 * (phase + 0.5 * ch as f64).sin();
                samples.push(tone as i16 + rng.random_range(-32..32));
            }
        }
        pcm(&samples)
    }

    #[test]
    fn verify_expand_nibble() {
        let mut state = MsChannelState::new(0, 16, 100, 50).unwrap();

        assert_eq!(state.expand_nibble(3), 148);
        assert_eq!(state.samples(), (148, 100));
        // 16 * 230 / 256 = 14, raised to the minimum.
        assert_eq!(state.delta(), 16);

        // Predictor 1 extrapolates linearly: 2 * 148 - 100 = 196, then -2 * 16.
        let mut state = MsChannelState::new(1, 16, 148, 100).unwrap();
        assert_eq!(state.expand_nibble(0xe), 164);
        assert_eq!(state.delta(), 16);

        // Large codes grow the delta.
        let mut state = MsChannelState::new(0, 256, 0, 0).unwrap();
        assert_eq!(state.expand_nibble(0x8), -2048);
        assert_eq!(state.delta(), 768);

        assert!(MsChannelState::new(7, 16, 0, 0).is_err());
    }

    #[test]
    fn verify_delta_is_bounded() {
        let mut state = MsChannelState::new(0, i16::MAX.into(), 0, 0).unwrap();

        for _ in 0..64 {
            state.expand_nibble(0x8);
        }
        assert_eq!(state.delta(), DELTA_MAX);
    }

    #[test]
    fn verify_quantize_matches_decoder() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);

        for predictor in 0..7 {
            let mut encoder = MsChannelState::new(predictor, 16, 0, 0).unwrap();
            let mut decoder = encoder;

            for _ in 0..2048 {
                let code = encoder.quantize(rng.random());
                assert!(code < 16);
                decoder.expand_nibble(code);
                assert_eq!(encoder, decoder);
            }
        }
    }

    #[test]
    fn verify_quantize_rounding() {
        // Predictor 0 predicts the last sample. A difference of 25 with a delta of 16 leaves a
        // remainder of 9, more than half a delta, so the error rounds up to 2.
        let mut state = MsChannelState::new(0, 16, 0, 0).unwrap();
        assert_eq!(state.quantize(25), 2);
        assert_eq!(state.samples(), (32, 0));

        // A remainder of exactly half a delta does not round.
        let mut state = MsChannelState::new(0, 16, 0, 0).unwrap();
        assert_eq!(state.quantize(24), 1);

        // Negative remainders never round, and the error saturates at -8.
        let mut state = MsChannelState::new(0, 16, 0, 0).unwrap();
        assert_eq!(state.quantize(-1000), 0x8);
        assert_eq!(state.samples(), (-128, 0));
    }

    #[test]
    fn verify_decode_mono_block() {
        let format = AudioFormat::adpcm_ms(1, 22050, 9);

        // Predictor 0, delta 16, sample1 100, sample2 50, then 2 data bytes.
        let block = [0, 16, 0, 100, 0, 50, 0, 0x30, 0x00];

        let mut state = MsAdpcmState::new();
        let mut out = ByteBuffer::new();
        state.decode(&format, &block, &mut out).unwrap();

        let samples: Vec<i16> = samples_i16(out.as_slice()).collect();

        // Header history is emitted older sample first.
        assert_eq!(&samples[..4], &[50, 100, 148, 148]);
        assert_eq!(samples.len(), 6);
    }

    #[test]
    fn verify_decode_stereo_channel_assignment() {
        let format = AudioFormat::adpcm_ms(2, 22050, 15);

        let mut block = vec![0, 0];
        block.extend_from_slice(&pcm(&[16, 16, 100, -100, 50, -50]));
        block.push(0x3d);

        let mut state = MsAdpcmState::new();
        let mut out = ByteBuffer::new();
        state.decode(&format, &block, &mut out).unwrap();

        let samples: Vec<i16> = samples_i16(out.as_slice()).collect();

        assert_eq!(samples, vec![50, -50, 100, -100, 148, -148]);
        assert_eq!(state.channel(1).samples(), (-148, -100));
    }

    #[test]
    fn verify_encode_header() {
        let format = AudioFormat::adpcm_ms(2, 22050, 256);

        let src = pcm(&[10, -10, 20, -20, 20, -20]);

        let mut state = MsAdpcmState::new();
        let mut out = ByteBuffer::new();
        state.encode(&format, &src, &mut out).unwrap();

        let mut expected = vec![0, 0];
        expected.extend_from_slice(&pcm(&[16, 16, 20, -20, 10, -10]));

        assert_eq!(&out.as_slice()[..14], &expected[..]);
        assert_eq!(out.len(), 15);
    }

    fn encode_all(format: &AudioFormat, samples: &[i16]) -> (MsAdpcmState, Vec<u8>) {
        let mut state = MsAdpcmState::new();
        let mut out = ByteBuffer::new();
        state.encode(format, &pcm(samples), &mut out).unwrap();

        (state, out.into_vec())
    }

    #[test]
    fn verify_encode_mono_reference() {
        let format = AudioFormat::adpcm_ms(1, 22050, 10);

        let samples = [100, 150, 260, 400, 520, 600, 610, 560, 420, 200, -80, -380, -640, -820];

        let (state, encoded) = encode_all(&format, &samples);

        // Two blocks of a 7 byte header and up to 3 code bytes. The last 2 samples are held
        // back.
        #[rustfmt::skip]
        let expected = [
            0x00, 0x10, 0x00, 0x96, 0x00, 0x64, 0x00, 0x74, 0x22, 0x1f,
            0x00, 0x1b, 0x00, 0xc8, 0x00, 0xa4, 0x01, 0x8c,
        ];

        assert_eq!(encoded, expected);
        assert_eq!(state.channel(0).samples(), (-340, -16));
        assert_eq!(state.channel(0).delta(), 97);
        // Mono streams never touch the second channel.
        assert_eq!(*state.channel(1), MsChannelState::default());
    }

    #[test]
    fn verify_encode_stereo_reference() {
        let format = AudioFormat::adpcm_ms(2, 22050, 16);

        let left = [40, 90, 200, 340, 500, 640, 720, 700, 600];
        let right = [-40, -60, -30, 40, 150, 280, 420, 540, 620];

        let samples: Vec<i16> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

        let (state, encoded) = encode_all(&format, &samples);

        // Two blocks of a 14 byte header and up to 2 code bytes. The second block ends early
        // because fewer than 12 bytes of input remain, so the last 2 frames are held back.
        #[rustfmt::skip]
        let expected = [
            0x00, 0x00, 0x10, 0x00, 0x10, 0x00, 0x5a, 0x00, 0xc4, 0xff, 0x28, 0x00, 0xd8, 0xff,
            0x72, 0x44,
            0x00, 0x00, 0x2d, 0x00, 0x13, 0x00, 0x80, 0x02, 0x18, 0x01, 0xf4, 0x01, 0x96, 0x00,
            0x27,
        ];

        assert_eq!(encoded, expected);
        assert_eq!(state.channel(0).samples(), (730, 640));
        assert_eq!(state.channel(1).samples(), (413, 280));
        assert_eq!((state.channel(0).delta(), state.channel(1).delta()), (40, 45));
    }

    #[test]
    fn verify_round_trip() {
        for channels in [1u16, 2] {
            let format = AudioFormat::adpcm_ms(channels, 22050, 256 * channels);
            let src = sine(1000, usize::from(channels), 11);

            let mut encoder = MsAdpcmState::new();
            let mut encoded = ByteBuffer::new();
            encoder.encode(&format, &src, &mut encoded).unwrap();

            let mut decoder = MsAdpcmState::new();
            let mut decoded = ByteBuffer::new();
            decoder.decode(&format, encoded.as_slice(), &mut decoded).unwrap();

            // Encoding stops once fewer than two frames and one code byte of input remain.
            assert_eq!(decoded.len(), src.len() - 4 * usize::from(channels));
            assert_eq!(encoder, decoder);

            let max_dev = samples_i16(&src)
                .zip(samples_i16(decoded.as_slice()))
                .skip(64)
                .map(|(a, b)| (i32::from(a) - i32::from(b)).abs())
                .max()
                .unwrap();

            assert!(max_dev < 2048, "deviation {} too large", max_dev);
        }
    }

    #[test]
    fn verify_malformed_input() {
        let format = AudioFormat::adpcm_ms(1, 22050, 256);

        let mut state = MsAdpcmState::new();
        let mut out = ByteBuffer::new();

        assert_eq!(
            state.decode(&format, &[7, 16, 0, 0, 0, 0, 0, 0x11], &mut out),
            Err(Error::MalformedInput("adpcm (ms): block predictor exceeds range"))
        );
        assert_eq!(
            state.decode(&format, &[0, 16, 0, 0], &mut out),
            Err(Error::MalformedInput("adpcm (ms): truncated block header"))
        );
    }
}
