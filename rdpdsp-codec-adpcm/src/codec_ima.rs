// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::trace;

use rdpdsp_core::errors::{Result, malformed_error};
use rdpdsp_core::format::{AudioFormat, IMA_ADPCM_HEADER_LEN};
use rdpdsp_core::io::{BufReader, ByteBuffer, ReadBytes};
use rdpdsp_core::util::clamp::clamp_i16;

use crate::common::{BlockLayout, Nibble};

#[rustfmt::skip]
const IMA_INDEX_TABLE: [i32; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8,
    -1, -1, -1, -1, 2, 4, 6, 8,
];

#[rustfmt::skip]
const IMA_STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17,
    19, 21, 23, 25, 28, 31, 34, 37, 41, 45,
    50, 55, 60, 66, 73, 80, 88, 97, 107, 118,
    130, 143, 157, 173, 190, 209, 230, 253, 279, 307,
    337, 371, 408, 449, 494, 544, 598, 658, 724, 796,
    876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358,
    5894, 6484, 7132, 7845, 8630, 9493, 10442, 11487, 12635, 13899,
    15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

const MAX_STEP_INDEX: u8 = 88;

/// Position of each sample of a 16 sample stereo group in the 8 encoded bytes, as
/// `(byte, shift)`. Samples are interleaved, so even entries are the left channel.
///
/// Each channel owns 4 consecutive bytes of the group, and within a byte the earlier sample is
/// in the low nibble.
#[rustfmt::skip]
const IMA_STEREO_ENCODE_MAP: [(usize, u8); 16] = [
    (0, 0), (4, 0), (0, 4), (4, 4),
    (1, 0), (5, 0), (1, 4), (5, 4),
    (2, 0), (6, 0), (2, 4), (6, 4),
    (3, 0), (7, 0), (3, 4), (7, 4),
];

/// Encoded bytes in a stereo group.
const STEREO_GROUP_LEN: usize = 8;

/// `ImaChannelState` is the adaptive state of one channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImaChannelState {
    last_sample: i16,
    step_index: u8,
}

impl ImaChannelState {
    /// Instantiate the state of a channel. The step index is saturated to 88.
    pub fn new(last_sample: i16, step_index: u8) -> Self {
        ImaChannelState { last_sample, step_index: step_index.min(MAX_STEP_INDEX) }
    }

    /// The most recently decoded, or reconstructed, sample.
    pub fn last_sample(&self) -> i16 {
        self.last_sample
    }

    /// The index into the step size table used for the next sample.
    pub fn step_index(&self) -> u8 {
        self.step_index
    }

    fn read_header<B: ReadBytes>(&mut self, stream: &mut B) -> Result<()> {
        let last_sample = stream.read_i16()?;
        let step_index = stream.read_u8()?;
        // Reserved.
        stream.ignore_bytes(1)?;

        if step_index > MAX_STEP_INDEX {
            return malformed_error("adpcm (ima): invalid step index in block header");
        }

        self.last_sample = last_sample;
        self.step_index = step_index;
        Ok(())
    }

    fn write_header(&self, out: &mut ByteBuffer) -> Result<()> {
        out.write_i16(self.last_sample)?;
        out.write_u8(self.step_index)?;
        out.write_u8(0)
    }

    fn adapt(&mut self, sample: i32, nibble: u8) {
        self.last_sample = clamp_i16(sample);

        let step_index = i32::from(self.step_index) + IMA_INDEX_TABLE[usize::from(nibble & 0x0f)];
        self.step_index = step_index.clamp(0, i32::from(MAX_STEP_INDEX)) as u8;
    }

    /// Decode one 4-bit code and return the new sample.
    pub fn expand_nibble(&mut self, nibble: u8) -> i16 {
        let step = IMA_STEP_TABLE[usize::from(self.step_index)];

        let mut diff = step >> 3;
        if nibble & 1 != 0 {
            diff += step >> 2;
        }
        if nibble & 2 != 0 {
            diff += step >> 1;
        }
        if nibble & 4 != 0 {
            diff += step;
        }
        if nibble & 8 != 0 {
            diff = -diff;
        }

        self.adapt(i32::from(self.last_sample) + diff, nibble);
        self.last_sample
    }

    /// Encode one sample into a 4-bit code. The state is updated with the sample a decoder will
    /// reconstruct from the code, so both sides stay in step.
    pub fn quantize(&mut self, sample: i16) -> u8 {
        let mut step = IMA_STEP_TABLE[usize::from(self.step_index)];
        let mut diff = i32::from(sample) - i32::from(self.last_sample);

        let mut code = 0;

        if diff < 0 {
            code = 8;
            diff = -diff;
        }

        for bit in [4, 2, 1] {
            if diff >= step {
                code |= bit;
                diff -= step;
            }
            step >>= 1;
        }

        // Reconstruction is exactly the decoder's.
        self.expand_nibble(code);
        code
    }
}

/// `ImaAdpcmState` holds the adaptive state of an IMA ADPCM stream across calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImaAdpcmState {
    channels: [ImaChannelState; 2],
}

impl ImaAdpcmState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets the state of a channel. Channel 1 is unused by mono streams.
    pub fn channel(&self, ch: usize) -> &ImaChannelState {
        &self.channels[ch]
    }

    /// Decode the IMA ADPCM blocks in `src` and append 16-bit PCM to `out`.
    ///
    /// `src` must start on a block boundary. A final short block is accepted if it holds a
    /// complete header and whole nibble groups.
    pub fn decode(&mut self, format: &AudioFormat, src: &[u8], out: &mut ByteBuffer) -> Result<()> {
        let layout = BlockLayout::new(format, IMA_ADPCM_HEADER_LEN)?;

        let mut reader = BufReader::new(src);

        while !reader.is_empty() {
            if layout.is_block_start(reader.pos()) {
                if reader.bytes_available() < layout.header_len {
                    return malformed_error("adpcm (ima): truncated block header");
                }

                for state in &mut self.channels[..layout.channels] {
                    state.read_header(&mut reader)?;
                }
                continue;
            }

            if layout.is_stereo() {
                if reader.bytes_available() < STEREO_GROUP_LEN {
                    return malformed_error("adpcm (ima): truncated stereo group");
                }

                let group = reader.read_buf_bytes_ref(STEREO_GROUP_LEN)?;
                self.decode_stereo_group(group, out)?;
            }
            else {
                let byte = reader.read_u8()?;
                let state = &mut self.channels[0];

                out.write_i16(state.expand_nibble(Nibble::Lower.get_nibble(byte)))?;
                out.write_i16(state.expand_nibble(Nibble::Upper.get_nibble(byte)))?;
            }
        }

        Ok(())
    }

    /// Decode 8 stereo bytes into 8 interleaved frames. The first 4 bytes carry the left
    /// channel and the last 4 the right, each byte holding two consecutive samples.
    fn decode_stereo_group(&mut self, group: &[u8], out: &mut ByteBuffer) -> Result<()> {
        let frames = out.extend_zeroed(4 * STEREO_GROUP_LEN)?;

        for (i, &byte) in group.iter().enumerate() {
            let ch = if i < 4 { 0 } else { 1 };
            let offset = ((i & 3) << 3) + (ch << 1);

            let state = &mut self.channels[ch];

            let sample = state.expand_nibble(Nibble::Lower.get_nibble(byte));
            frames[offset..offset + 2].copy_from_slice(&sample.to_le_bytes());

            let sample = state.expand_nibble(Nibble::Upper.get_nibble(byte));
            frames[offset + 4..offset + 6].copy_from_slice(&sample.to_le_bytes());
        }

        Ok(())
    }

    /// Encode interleaved 16-bit PCM in `src` and append IMA ADPCM blocks to `out`.
    ///
    /// A block header is written whenever the output of this call reaches a block boundary,
    /// including at its start. Input is consumed in groups of 2 mono samples or 8 stereo frames,
    /// and a group is only encoded while more input follows it. The last group of the call, and
    /// any partial group, are not encoded.
    pub fn encode(&mut self, format: &AudioFormat, src: &[u8], out: &mut ByteBuffer) -> Result<()> {
        let layout = BlockLayout::new(format, IMA_ADPCM_HEADER_LEN)?;

        let group_len = if layout.is_stereo() { 32 } else { 4 };

        let start = out.len();
        let mut reader = BufReader::new(src);

        while reader.bytes_available() > group_len {
            if layout.is_block_start(out.len() - start) {
                for state in &self.channels[..layout.channels] {
                    state.write_header(out)?;
                }
            }

            if layout.is_stereo() {
                let group = out.extend_zeroed(STEREO_GROUP_LEN)?;

                for (i, &(byte, shift)) in IMA_STEREO_ENCODE_MAP.iter().enumerate() {
                    let code = self.channels[i % 2].quantize(reader.read_i16()?);
                    group[byte] |= code << shift;
                }
            }
            else {
                let state = &mut self.channels[0];

                let lower = state.quantize(reader.read_i16()?);
                let upper = state.quantize(reader.read_i16()?);

                out.write_u8(lower | (upper << 4))?;
            }
        }

        if !reader.is_empty() {
            trace!("adpcm (ima): {} trailing bytes left unencoded", reader.bytes_available());
        }

        Ok(())
    }
}
