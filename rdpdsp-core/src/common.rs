// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `common` module defines common enums, structs, types, etc.

/// Describes the relative preference of a registered codec provider if multiple registered
/// providers support the same format tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    /// Prefer over others.
    Preferred,
    /// Standard tier: neither preferred nor a fallback. rdpdsp's first-party providers are
    /// registered at this level.
    Standard,
    /// Use as a fallback if nothing else is available.
    Fallback,
}
