// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rdpdsp_core::errors::{Result, invalid_argument_error};
use rdpdsp_core::format::AudioFormat;

/// `Nibble` represents the lower or upper 4 bits of a byte
#[derive(Copy, Clone, Debug)]
pub(crate) enum Nibble {
    Upper,
    Lower,
}

impl Nibble {
    pub fn get_nibble(&self, byte: u8) -> u8 {
        match self {
            Nibble::Upper => byte >> 4,
            Nibble::Lower => byte & 0x0F,
        }
    }
}

/// Sign extends a 4-bit two's complement value.
pub(crate) fn signed_nibble(nibble: u8) -> i32 {
    if (nibble & 0x08) != 0 { i32::from(nibble) - 0x10 } else { i32::from(nibble) }
}

/// The shape of an ADPCM stream as the block loops need it.
pub(crate) struct BlockLayout {
    pub channels: usize,
    pub block_align: usize,
    pub header_len: usize,
}

impl BlockLayout {
    pub fn new(format: &AudioFormat, header_len_per_channel: usize) -> Result<Self> {
        format.validate()?;

        let channels = usize::from(format.channels);
        let block_align = usize::from(format.block_align);
        let header_len = header_len_per_channel * channels;

        // Only reachable for tags whose validation does not check the block size.
        if block_align <= header_len {
            return invalid_argument_error("adpcm: block align too small");
        }

        Ok(BlockLayout { channels, block_align, header_len })
    }

    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }

    /// Returns true if `offset` bytes into the call's stream a new block starts.
    #[inline(always)]
    pub fn is_block_start(&self, offset: usize) -> bool {
        offset % self.block_align == 0
    }
}
