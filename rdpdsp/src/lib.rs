// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # rdpdsp
//!
//! rdpdsp is the audio transcoding core of a remote desktop audio redirection channel. It
//! converts between linear PCM and the compressed encodings carried on the wire, and resamples
//! captured PCM to the rate negotiated for the stream.
//!
//! # Support
//!
//! The following formats are always supported, in both directions.
//!
//! | Format         | Tag      |
//! |----------------|----------|
//! | PCM            | `0x0001` |
//! | MS ADPCM       | `0x0002` |
//! | IMA/DVI ADPCM  | `0x0011` |
//!
//! Other formats are handled by codec providers registered in a
//! [`CodecRegistry`][core::codecs::registry::CodecRegistry]. The following providers are
//! available.
//!
//! | Provider       | Tags               | Feature Flag | Default |
//! |----------------|--------------------|--------------|---------|
//! | G.711          | `0x0006`, `0x0007` | `g711`       | Yes     |
//!
//! # Usage
//!
//! 1.  Create a [`DspContext`] for the direction of the stream, either with
//!     [`DspContext::new`] to use the [`default`] registry, or with
//!     [`DspContext::new_with_registry`] to use your own.
//! 2.  Set the wire format with [`DspContext::reset_format`]. Use [`supports_format`] first if
//!     the format comes from the remote peer.
//! 3.  Pass each packet to [`DspContext::encode`] or [`DspContext::decode`] together with the
//!     format of the data being passed in. The result is appended to a
//!     [`ByteBuffer`][core::io::ByteBuffer].
//!
//! A context carries the adaptive state of the stream from one packet to the next, so each
//! stream direction needs its own context. A context is `Send` but calls on one context must not
//! overlap.
//!
//! # Adding support for new formats
//!
//! Implement the [`ExternalCodec`][core::codecs::ExternalCodec] and
//! [`RegisterableProvider`][core::codecs::registry::RegisterableProvider] traits and register the
//! provider with a registry.

mod context;

pub use context::{CodecState, DspContext};

pub mod default {
    //! The `default` module provides a registry with all the providers enabled by `feature`
    //! flags pre-registered. Using the `default` module is completely optional and incurs no
    //! overhead unless actually used.

    pub mod providers {
        //! The `providers` module re-exports all enabled codec providers.

        #[cfg(feature = "g711")]
        pub use rdpdsp_codec_g711::G711Provider;
    }

    use lazy_static::lazy_static;

    use rdpdsp_core::codecs::registry::CodecRegistry;

    lazy_static! {
        static ref CODEC_REGISTRY: CodecRegistry = {
            let mut registry = CodecRegistry::new();
            register_enabled_providers(&mut registry);
            registry
        };
    }

    /// Gets the default `CodecRegistry`. This registry pre-registers all the providers selected
    /// by the `feature` flags in the includer's `Cargo.toml`. If `features` is not set, the
    /// default set of providers is registered.
    ///
    /// This function is lazy and does not instantiate the `CodecRegistry` until the first call to
    /// this function.
    pub fn get_registry() -> &'static CodecRegistry {
        &CODEC_REGISTRY
    }

    /// Registers all the providers selected by the `feature` flags in the includer's
    /// `Cargo.toml` on the provided `CodecRegistry`.
    ///
    /// Use this function to easily populate a custom registry with all enabled providers.
    pub fn register_enabled_providers(registry: &mut CodecRegistry) {
        #[cfg(feature = "g711")]
        registry.register_provider::<providers::G711Provider>();

        #[cfg(not(feature = "g711"))]
        let _ = registry;
    }
}

/// Returns true if the format can be encoded (`for_encode`) or decoded with the default
/// registry.
///
/// The answer never depends on a context, and agrees with [`DspContext::reset_format`]: a
/// context of the matching mode accepts the format exactly when this returns true.
pub fn supports_format(format: &core::format::AudioFormat, for_encode: bool) -> bool {
    let mode = if for_encode { core::codecs::Mode::Encoder } else { core::codecs::Mode::Decoder };

    default::get_registry().supports_format(format, mode)
}

pub use rdpdsp_core as core;
