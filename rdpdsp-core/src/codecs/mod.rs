// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `codecs` module defines the interface between a DSP context and the codec providers that
//! implement wire encodings the context does not handle itself.
//!
//! # Nomenclature
//!
//! * A built-in format is one a context encodes and decodes on its own: linear PCM, IMA ADPCM,
//!   and MS ADPCM.
//! * A provider is an [`ExternalCodec`] implementation for any other format tag. Providers are
//!   looked up at runtime in a [`registry::CodecRegistry`], so a provider that is not registered
//!   makes its tags unsupported rather than failing.

use crate::errors::Result;
use crate::format::AudioFormat;
use crate::io::ByteBuffer;

pub mod registry;

/// The direction a DSP context converts in. Fixed for the lifetime of a context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// PCM in, wire format out.
    Encoder,
    /// Wire format in, PCM out.
    Decoder,
}

impl Mode {
    /// Returns true if the mode is `Mode::Encoder`.
    pub fn is_encoder(&self) -> bool {
        *self == Mode::Encoder
    }
}

/// Basic information about a codec.
#[derive(Copy, Clone, Debug)]
pub struct CodecInfo {
    /// A short ASCII-only string identifying the codec.
    pub short_name: &'static str,
    /// A longer, more descriptive, string identifying the codec.
    pub long_name: &'static str,
}

/// `DspOptions` is a common set of options for DSP contexts and the providers they instantiate.
#[derive(Copy, Clone, Debug)]
pub struct DspOptions {
    /// Initial capacity, in bytes, of each of a context's scratch buffers.
    pub scratch_capacity: usize,
    /// If set, scratch buffers may never grow beyond this many bytes. Exceeding it fails the call
    /// with an allocation failure.
    pub max_buffer_len: Option<usize>,
}

impl Default for DspOptions {
    fn default() -> Self {
        DspOptions { scratch_capacity: 4096, max_buffer_len: None }
    }
}

/// An `ExternalCodec` converts between 16-bit PCM and a wire format a DSP context does not
/// implement itself.
///
/// One instance is owned by one context. Instances are created through a
/// [`registry::CodecRegistry`] and are never shared between threads while in use.
pub trait ExternalCodec: Send + Sync {
    /// Gets basic information about the codec.
    fn codec_info(&self) -> &CodecInfo;

    /// Reset any format-dependent setup so the next call reinitializes against `format`.
    ///
    /// Called when the context's target format is replaced with another format of the same tag.
    fn reset(&mut self, format: &AudioFormat) -> Result<()>;

    /// Encode `pcm`, which is described by `format`'s channel layout and sample rate, and append
    /// the result to `out`. `scratch` is the context's work buffer and holds nothing on entry.
    fn encode(
        &mut self,
        format: &AudioFormat,
        pcm: &[u8],
        scratch: &mut ByteBuffer,
        out: &mut ByteBuffer,
    ) -> Result<()>;

    /// Decode `data`, which is encoded as described by `format`, and append the PCM to `out`.
    /// `scratch` is the context's work buffer and holds nothing on entry.
    fn decode(
        &mut self,
        format: &AudioFormat,
        data: &[u8],
        scratch: &mut ByteBuffer,
        out: &mut ByteBuffer,
    ) -> Result<()>;
}
