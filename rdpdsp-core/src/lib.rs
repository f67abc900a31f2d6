// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared structs, traits, and algorithms used by every rdpdsp crate.

pub mod codecs;
pub mod common;
pub mod dsp;
pub mod errors;
pub mod format;
pub mod io;
pub mod util;
