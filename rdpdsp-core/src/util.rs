// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `util` module provides a repository of small helpers used by more than one codec.

pub mod clamp {
    //! Utilities for saturating arithmetic results to a sample range.

    /// Clamps the given value to the [-32_768, 32_767] range.
    #[inline]
    pub fn clamp_i16(val: i32) -> i16 {
        // Offsetting by 0x8000 maps the i16 range to [0, 65_535]. Any bit above the 16th then
        // means the value is out of range, and the sign bit selects which limit to saturate to.
        if val.wrapping_add(0x8000) & !0xffff == 0 {
            val as i16
        }
        else {
            0x7fff ^ val.wrapping_shr(31) as i16
        }
    }

}

pub mod pcm {
    //! Utilities for viewing interleaved 16-bit little-endian PCM.

    /// Returns an iterator over the 16-bit little-endian samples in `buf`. A trailing odd byte is
    /// ignored.
    #[inline]
    pub fn samples_i16(buf: &[u8]) -> impl Iterator<Item = i16> + '_ {
        buf.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

}
