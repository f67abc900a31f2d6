// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by rdpdsp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument was unusable in the current state, for example an encode request made on a
    /// decoding context, or a format with a sample rate of zero.
    InvalidArgument(&'static str),
    /// The format tag, channel count, or sample width is not supported in the requested direction.
    Unsupported(&'static str),
    /// A buffer could not grow to the requested capacity (in bytes), either because the allocator
    /// refused or because the buffer's configured limit was reached.
    AllocationFailure(usize),
    /// An external codec provider failed to encode or decode, or rejected its configuration.
    ProviderError(&'static str),
    /// The input was truncated or contained values outside the range the wire format permits.
    MalformedInput(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidArgument(msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Error::Unsupported(feature) => {
                write!(f, "unsupported format: {}", feature)
            }
            Error::AllocationFailure(len) => {
                write!(f, "allocation failure: could not grow buffer to {} bytes", len)
            }
            Error::ProviderError(msg) => {
                write!(f, "codec provider error: {}", msg)
            }
            Error::MalformedInput(msg) => {
                write!(f, "malformed input: {}", msg)
            }
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create an invalid argument error.
pub fn invalid_argument_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::InvalidArgument(desc))
}

/// Convenience function to create an unsupported format error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create an allocation failure error.
pub fn alloc_error<T>(len: usize) -> Result<T> {
    Err(Error::AllocationFailure(len))
}

/// Convenience function to create a codec provider error.
pub fn provider_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ProviderError(desc))
}

/// Convenience function to create a malformed input error.
pub fn malformed_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::MalformedInput(desc))
}
