// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IMA ADPCM and Microsoft ADPCM, encode and decode.
//!
//! Both codecs pack 4-bit codes two to a byte and frame them in blocks of `block_align` bytes.
//! Each block starts with a header that reseeds the adaptive state of every channel. The state
//! is carried across calls in [`ImaAdpcmState`] or [`MsAdpcmState`], so consecutive packets of
//! one stream must be passed to the same state object.
//!
//! Every call treats the start of its input (decode) or output (encode) as a block boundary.

mod codec_ima;
mod codec_ms;
mod common;

pub use codec_ima::{ImaAdpcmState, ImaChannelState};
pub use codec_ms::{MsAdpcmState, MsChannelState};
