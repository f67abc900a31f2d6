// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry for codec providers to support lookup and instantiation of external codecs
//! dynamically at runtime.

use std::collections::HashMap;
use std::default::Default;

use log::debug;

use crate::codecs::{CodecInfo, DspOptions, ExternalCodec, Mode};
use crate::common::Tier;
use crate::errors::{Result, unsupported_error};
use crate::format::well_known::{FORMAT_TAG_ADPCM_IMA, FORMAT_TAG_ADPCM_MS, FORMAT_TAG_PCM};
use crate::format::{AudioFormat, FormatTag};

/// Description of a format supported by a provider, and the directions it supports it in.
#[derive(Copy, Clone, Debug)]
pub struct SupportedFormat {
    pub tag: FormatTag,
    pub info: CodecInfo,
    /// The provider can encode PCM into this format.
    pub encode: bool,
    /// The provider can decode this format into PCM.
    pub decode: bool,
}

impl SupportedFormat {
    /// Returns true if the format is supported in the given direction.
    pub fn supports(&self, mode: Mode) -> bool {
        match mode {
            Mode::Encoder => self.encode,
            Mode::Decoder => self.decode,
        }
    }
}

/// To support registration in a codec registry, an `ExternalCodec` must implement the
/// `RegisterableProvider` trait.
pub trait RegisterableProvider: ExternalCodec {
    fn try_registry_new(
        format: &AudioFormat,
        mode: Mode,
        opts: &DspOptions,
    ) -> Result<Box<dyn ExternalCodec>>
    where
        Self: Sized;

    /// Get a list of formats supported by this provider.
    fn supported_formats() -> &'static [SupportedFormat];
}

/// `ExternalCodec` factory function. Creates a boxed `ExternalCodec`.
pub type ProviderFactoryFn =
    fn(&AudioFormat, Mode, &DspOptions) -> Result<Box<dyn ExternalCodec>>;

/// Registration details of a provider for a particular format.
pub struct RegisteredProvider {
    /// Format details.
    pub format: SupportedFormat,
    /// Factory function to instantiate the provider.
    pub factory: ProviderFactoryFn,
}

#[derive(Default)]
struct InnerRegistry {
    preferred: HashMap<FormatTag, RegisteredProvider>,
    standard: HashMap<FormatTag, RegisteredProvider>,
    fallback: HashMap<FormatTag, RegisteredProvider>,
}

impl InnerRegistry {
    fn tiers(&self) -> [&HashMap<FormatTag, RegisteredProvider>; 3] {
        [&self.preferred, &self.standard, &self.fallback]
    }

    fn get(&self, tag: FormatTag) -> Option<&RegisteredProvider> {
        self.tiers().into_iter().find_map(|tier| tier.get(&tag))
    }

    fn get_for_mode(&self, tag: FormatTag, mode: Mode) -> Option<&RegisteredProvider> {
        self.tiers()
            .into_iter()
            .filter_map(|tier| tier.get(&tag))
            .find(|reg| reg.format.supports(mode))
    }

    fn get_at_tier(&self, tier: Tier, tag: FormatTag) -> Option<&RegisteredProvider> {
        match tier {
            Tier::Preferred => self.preferred.get(&tag),
            Tier::Standard => self.standard.get(&tag),
            Tier::Fallback => self.fallback.get(&tag),
        }
    }

    fn register_at_tier(
        &mut self,
        tier: Tier,
        tag: FormatTag,
        reg: RegisteredProvider,
    ) -> Option<RegisteredProvider> {
        match tier {
            Tier::Preferred => self.preferred.insert(tag, reg),
            Tier::Standard => self.standard.insert(tag, reg),
            Tier::Fallback => self.fallback.insert(tag, reg),
        }
    }
}

/// Returns true if the format tag is one a DSP context implements without a provider.
pub fn is_builtin_format(tag: FormatTag) -> bool {
    matches!(tag, FORMAT_TAG_PCM | FORMAT_TAG_ADPCM_IMA | FORMAT_TAG_ADPCM_MS)
}

/// A `CodecRegistry` allows the registration of codec providers, answers capability queries, and
/// provides a method to instantiate an `ExternalCodec` given an `AudioFormat`.
#[derive(Default)]
pub struct CodecRegistry {
    providers: InnerRegistry,
}

impl CodecRegistry {
    /// Instantiate a new, empty, `CodecRegistry`.
    pub fn new() -> Self {
        CodecRegistry { providers: Default::default() }
    }

    /// Get the registration information of the most preferred provider for the specified format
    /// tag, regardless of direction.
    pub fn get_provider(&self, tag: FormatTag) -> Option<&RegisteredProvider> {
        self.providers.get(tag)
    }

    /// Get the registration information of the provider at the specified tier for the specified
    /// format tag.
    pub fn get_provider_at_tier(&self, tier: Tier, tag: FormatTag) -> Option<&RegisteredProvider> {
        self.providers.get_at_tier(tier, tag)
    }

    /// Registers all formats supported by the provider at the standard tier.
    ///
    /// If a supported format was previously registered by another provider at the same tier, it
    /// will be replaced within the registry.
    pub fn register_provider<P: RegisterableProvider>(&mut self) {
        self.register_provider_at_tier::<P>(Tier::Standard);
    }

    /// Registers all formats supported by the provider at a specific tier.
    ///
    /// If a supported format was previously registered by another provider at the same tier, it
    /// will be replaced within the registry.
    pub fn register_provider_at_tier<P: RegisterableProvider>(&mut self, tier: Tier) {
        for format in P::supported_formats() {
            let reg = RegisteredProvider {
                format: *format,
                factory: |format, mode, opts| P::try_registry_new(format, mode, opts),
            };

            if self.providers.register_at_tier(tier, format.tag, reg).is_some() {
                debug!("replaced provider for format {} at tier {:?}", format.tag, tier);
            }
        }
    }

    /// Returns true if a context in the given mode can process the format.
    ///
    /// Built-in formats are supported whenever the channel layout is mono or stereo, and PCM
    /// samples are 8 or 16 bits wide. Any other format is supported if a registered provider
    /// supports it in the requested direction.
    pub fn supports_format(&self, format: &AudioFormat, mode: Mode) -> bool {
        if !format.is_stereo_capable() {
            return false;
        }

        if format.is_pcm() && !(format.bits_per_sample == 8 || format.bits_per_sample == 16) {
            return false;
        }

        is_builtin_format(format.tag) || self.providers.get_for_mode(format.tag, mode).is_some()
    }

    /// Instantiate a provider for the specified format and direction.
    ///
    /// The most preferred provider that supports the format in the requested direction is
    /// instantiated. If none is registered, or the provider rejects the format, an error is
    /// returned.
    pub fn make_codec(
        &self,
        format: &AudioFormat,
        mode: Mode,
        opts: &DspOptions,
    ) -> Result<Box<dyn ExternalCodec>> {
        if let Some(reg) = self.providers.get_for_mode(format.tag, mode) {
            debug!(
                "instantiating provider '{}' for format {} ({:?})",
                reg.format.info.short_name, format.tag, mode
            );
            Ok((reg.factory)(format, mode, opts)?)
        }
        else {
            unsupported_error("core (codec): no provider for format")
        }
    }
}

/// Convenience macro for declaring a `SupportedFormat`.
#[macro_export]
macro_rules! support_format {
    ($tag:expr, $short_name:expr, $long_name:expr, $encode:expr, $decode:expr) => {
        rdpdsp_core::codecs::registry::SupportedFormat {
            tag: $tag,
            info: rdpdsp_core::codecs::CodecInfo { short_name: $short_name, long_name: $long_name },
            encode: $encode,
            decode: $decode,
        }
    };
}
