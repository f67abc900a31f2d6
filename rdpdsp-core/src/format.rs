// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `format` module describes the shape of a PCM or compressed audio stream as it is
//! negotiated on the audio redirection channel.

use std::fmt;

use crate::errors::{Result, invalid_argument_error, unsupported_error};

/// A `FormatTag` identifies the wire encoding of an audio stream. The values are the WAVE format
/// tags carried in a `WAVEFORMATEX` structure.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatTag(u16);

/// Unknown or invalid format tag.
pub const FORMAT_TAG_UNKNOWN: FormatTag = FormatTag(0x0000);

impl Default for FormatTag {
    fn default() -> Self {
        FORMAT_TAG_UNKNOWN
    }
}

impl FormatTag {
    /// Create a format tag from its numeric wire value.
    pub const fn new(tag: u16) -> FormatTag {
        FormatTag(tag)
    }

    /// Get the numeric wire value of the format tag.
    pub const fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for FormatTag {
    fn from(value: u16) -> Self {
        FormatTag(value)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Format tags for well-known wire encodings.
pub mod well_known {
    use super::FormatTag;

    /// Linear PCM, little-endian, interleaved.
    pub const FORMAT_TAG_PCM: FormatTag = FormatTag(0x0001);
    /// Microsoft ADPCM
    pub const FORMAT_TAG_ADPCM_MS: FormatTag = FormatTag(0x0002);
    /// G.711 A-law
    pub const FORMAT_TAG_ALAW: FormatTag = FormatTag(0x0006);
    /// G.711 Mu-law
    pub const FORMAT_TAG_MULAW: FormatTag = FormatTag(0x0007);
    /// IMA (DVI) ADPCM
    pub const FORMAT_TAG_ADPCM_IMA: FormatTag = FormatTag(0x0011);
    /// GSM 6.10
    pub const FORMAT_TAG_GSM610: FormatTag = FormatTag(0x0031);
    /// MPEG Layer 3 (MP3)
    pub const FORMAT_TAG_MPEG_LAYER3: FormatTag = FormatTag(0x0055);
    /// Advanced Audio Coding (AAC) as negotiated by Microsoft clients
    pub const FORMAT_TAG_AAC_MS: FormatTag = FormatTag(0xa106);
}

use well_known::{FORMAT_TAG_ADPCM_IMA, FORMAT_TAG_ADPCM_MS, FORMAT_TAG_PCM};

/// Size of an IMA ADPCM block header for a single channel.
pub const IMA_ADPCM_HEADER_LEN: usize = 4;

/// Size of an MS ADPCM block header for a single channel.
pub const MS_ADPCM_HEADER_LEN: usize = 7;

/// `AudioFormat` is an immutable description of the shape of a stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioFormat {
    /// The wire encoding.
    pub tag: FormatTag,
    /// The number of interleaved channels. Only mono and stereo are supported.
    pub channels: u16,
    /// The number of frames per second.
    pub samples_per_sec: u32,
    /// The average data rate of the stream in bytes per second. Informational only.
    pub avg_bytes_per_sec: u32,
    /// The size of one framing block in bytes. For PCM this is the size of one frame, for ADPCM
    /// it is the size of one block including its header.
    pub block_align: u16,
    /// The number of bits per sample. Compressed ADPCM streams describe 16-bit samples.
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Describe an interleaved linear PCM stream.
    pub fn pcm(channels: u16, samples_per_sec: u32, bits_per_sample: u16) -> Self {
        let block_align = channels.saturating_mul(if bits_per_sample > 8 { 2 } else { 1 });

        AudioFormat {
            tag: FORMAT_TAG_PCM,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: samples_per_sec.saturating_mul(u32::from(block_align)),
            block_align,
            bits_per_sample,
        }
    }

    /// Describe an IMA ADPCM stream with the given block size.
    pub fn adpcm_ima(channels: u16, samples_per_sec: u32, block_align: u16) -> Self {
        AudioFormat {
            tag: FORMAT_TAG_ADPCM_IMA,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: avg_bytes_per_sec_adpcm(
                IMA_ADPCM_HEADER_LEN,
                channels,
                samples_per_sec,
                block_align,
            ),
            block_align,
            bits_per_sample: 16,
        }
    }

    /// Describe an MS ADPCM stream with the given block size.
    pub fn adpcm_ms(channels: u16, samples_per_sec: u32, block_align: u16) -> Self {
        AudioFormat {
            tag: FORMAT_TAG_ADPCM_MS,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: avg_bytes_per_sec_adpcm(
                MS_ADPCM_HEADER_LEN,
                channels,
                samples_per_sec,
                block_align,
            ),
            block_align,
            bits_per_sample: 16,
        }
    }

    /// Returns true if the stream is linear PCM.
    pub fn is_pcm(&self) -> bool {
        self.tag == FORMAT_TAG_PCM
    }

    /// Returns true if the channel layout is one the codecs can process: mono or stereo.
    pub fn is_stereo_capable(&self) -> bool {
        self.channels == 1 || self.channels == 2
    }

    /// The number of bytes used to store one sample of one channel.
    pub fn bytes_per_sample(&self) -> usize {
        if self.bits_per_sample > 8 { 2 } else { 1 }
    }

    /// The number of bytes used to store one frame (one sample of every channel).
    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.channels) * self.bytes_per_sample()
    }

    /// Checks the invariants every format handed to a context must hold.
    pub fn validate(&self) -> Result<()> {
        if !self.is_stereo_capable() {
            return unsupported_error("format: only mono and stereo are supported");
        }

        if self.samples_per_sec == 0 {
            return invalid_argument_error("format: sample rate must be positive");
        }

        let channels = usize::from(self.channels);
        let block_align = usize::from(self.block_align);

        match self.tag {
            FORMAT_TAG_PCM => {
                if self.bits_per_sample != 8 && self.bits_per_sample != 16 {
                    return unsupported_error("format: pcm must be 8 or 16 bits per sample");
                }
            }
            FORMAT_TAG_ADPCM_IMA => {
                let header_len = IMA_ADPCM_HEADER_LEN * channels;

                if block_align <= header_len {
                    return invalid_argument_error("format: ima adpcm block align too small");
                }
                // Stereo nibbles are grouped 8 bytes at a time and a group may not straddle blocks.
                if channels == 2 && (block_align - header_len) % 8 != 0 {
                    return invalid_argument_error(
                        "format: ima adpcm stereo block align must hold whole 8 byte groups",
                    );
                }
            }
            FORMAT_TAG_ADPCM_MS => {
                if block_align <= MS_ADPCM_HEADER_LEN * channels {
                    return invalid_argument_error("format: ms adpcm block align too small");
                }
            }
            _ => (),
        }

        Ok(())
    }
}

fn avg_bytes_per_sec_adpcm(
    header_len: usize,
    channels: u16,
    samples_per_sec: u32,
    block_align: u16,
) -> u32 {
    // Every data byte after the headers carries two 4-bit samples.
    let header_len = header_len * usize::from(channels);
    let block_align = usize::from(block_align);

    if channels == 0 || block_align <= header_len {
        return 0;
    }

    let frames_per_block = (block_align - header_len) * 2 / usize::from(channels);

    ((u64::from(samples_per_sec) * block_align as u64) / frames_per_block as u64) as u32
}
