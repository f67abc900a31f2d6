// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use log::{debug, warn};

use rdpdsp_codec_adpcm::{ImaAdpcmState, MsAdpcmState};
use rdpdsp_core::codecs::registry::CodecRegistry;
use rdpdsp_core::codecs::{DspOptions, ExternalCodec, Mode};
use rdpdsp_core::dsp::resample::resample;
use rdpdsp_core::errors::{Result, invalid_argument_error, unsupported_error};
use rdpdsp_core::format::well_known::{FORMAT_TAG_ADPCM_IMA, FORMAT_TAG_ADPCM_MS, FORMAT_TAG_PCM};
use rdpdsp_core::format::{AudioFormat, FormatTag};
use rdpdsp_core::io::ByteBuffer;

/// The codec a context dispatches to, with the state it carries between calls.
pub enum CodecState {
    /// No target format has been set.
    Unset,
    /// Linear PCM. Data is copied verbatim.
    Pcm,
    /// IMA ADPCM with its per-channel step state.
    Ima(ImaAdpcmState),
    /// MS ADPCM with its per-channel predictor state.
    Ms(MsAdpcmState),
    /// A format handled by a registered provider.
    External { tag: FormatTag, codec: Box<dyn ExternalCodec> },
}

impl fmt::Debug for CodecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecState::Unset => write!(f, "Unset"),
            CodecState::Pcm => write!(f, "Pcm"),
            CodecState::Ima(state) => f.debug_tuple("Ima").field(state).finish(),
            CodecState::Ms(state) => f.debug_tuple("Ms").field(state).finish(),
            CodecState::External { tag, codec } => f
                .debug_struct("External")
                .field("tag", tag)
                .field("codec", &codec.codec_info().short_name)
                .finish(),
        }
    }
}

/// A `DspContext` converts one direction of one audio stream.
///
/// The direction is fixed when the context is created. The wire format is set, and may later be
/// replaced, with [`DspContext::reset_format`]. Adaptive codec state is kept across calls, so
/// every packet of the stream must go through the same context, in order.
///
/// On error the output buffer may hold a partial result that should be discarded. The context
/// stays usable, although ADPCM state may have advanced up to the point of failure.
pub struct DspContext<'r> {
    mode: Mode,
    format: Option<AudioFormat>,
    state: CodecState,
    registry: &'r CodecRegistry,
    options: DspOptions,
    work: ByteBuffer,
    resampled: ByteBuffer,
}

impl DspContext<'static> {
    /// Create a context that looks up providers in the default registry, using default options.
    pub fn new(mode: Mode) -> Result<Self> {
        DspContext::new_with_registry(mode, crate::default::get_registry(), Default::default())
    }
}

impl<'r> DspContext<'r> {
    /// Create a context that looks up providers in `registry`.
    pub fn new_with_registry(
        mode: Mode,
        registry: &'r CodecRegistry,
        options: DspOptions,
    ) -> Result<Self> {
        let DspOptions { scratch_capacity, max_buffer_len } = options;

        let work = ByteBuffer::with_capacity(scratch_capacity, max_buffer_len)?;
        let resampled = ByteBuffer::with_capacity(scratch_capacity, max_buffer_len)?;

        Ok(DspContext {
            mode,
            format: None,
            state: CodecState::Unset,
            registry,
            options,
            work,
            resampled,
        })
    }

    /// Gets the direction of the context.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Gets the current wire format, if one was set.
    pub fn format(&self) -> Option<&AudioFormat> {
        self.format.as_ref()
    }

    /// Gets the codec state.
    pub fn state(&self) -> &CodecState {
        &self.state
    }

    /// Returns true if this context can be reset to `format`.
    pub fn supports_format(&self, format: &AudioFormat) -> bool {
        self.registry.supports_format(format, self.mode)
    }

    /// Replace the wire format of the stream.
    ///
    /// ADPCM history is kept when the new format uses the same ADPCM algorithm as the old one,
    /// and starts fresh otherwise. The next block header reseeds it in either case. A provider
    /// for the same format tag is reset, otherwise a new provider is instantiated.
    pub fn reset_format(&mut self, format: &AudioFormat) -> Result<()> {
        format.validate()?;

        if !self.supports_format(format) {
            return unsupported_error("dsp: format is not supported in this direction");
        }

        let state = std::mem::replace(&mut self.state, CodecState::Unset);

        let result = self.next_state(state, format);

        match result {
            Ok(state) => {
                debug!(
                    "dsp: {:?} format reset to {} ({} ch, {} Hz, block align {})",
                    self.mode,
                    format.tag,
                    format.channels,
                    format.samples_per_sec,
                    format.block_align
                );

                self.state = state;
                self.format = Some(*format);
                Ok(())
            }
            Err(err) => {
                // The previous codec is gone, so the previous format is no longer usable either.
                self.format = None;
                Err(err)
            }
        }
    }

    fn next_state(&self, state: CodecState, format: &AudioFormat) -> Result<CodecState> {
        let next = match (state, format.tag) {
            (_, FORMAT_TAG_PCM) => CodecState::Pcm,
            (CodecState::Ima(history), FORMAT_TAG_ADPCM_IMA) => CodecState::Ima(history),
            (_, FORMAT_TAG_ADPCM_IMA) => {
                debug!("dsp: new ima adpcm state");
                CodecState::Ima(ImaAdpcmState::new())
            }
            (CodecState::Ms(history), FORMAT_TAG_ADPCM_MS) => CodecState::Ms(history),
            (_, FORMAT_TAG_ADPCM_MS) => {
                debug!("dsp: new ms adpcm state");
                CodecState::Ms(MsAdpcmState::new())
            }
            (CodecState::External { tag, mut codec }, new_tag) if tag == new_tag => {
                codec.reset(format)?;
                CodecState::External { tag, codec }
            }
            (state, tag) => {
                if let CodecState::External { tag: old_tag, codec } = &state {
                    warn!(
                        "dsp: replacing provider '{}' for format {} with a provider for format {}",
                        codec.codec_info().short_name,
                        old_tag,
                        tag
                    );
                }

                let codec = self.registry.make_codec(format, self.mode, &self.options)?;
                CodecState::External { tag, codec }
            }
        };

        Ok(next)
    }

    /// Encode the PCM in `data`, described by `src_format`, and append the result to `out`.
    ///
    /// The PCM is first resampled to the rate and channel count of the wire format if they
    /// differ. Compressed formats require 16-bit PCM.
    pub fn encode(
        &mut self,
        src_format: &AudioFormat,
        data: &[u8],
        out: &mut ByteBuffer,
    ) -> Result<()> {
        if !self.mode.is_encoder() {
            return invalid_argument_error("dsp: encode called on a decoding context");
        }

        let target = match self.format {
            Some(format) => format,
            None => return invalid_argument_error("dsp: no format set"),
        };

        if !src_format.is_pcm() {
            return unsupported_error("dsp: encoder input must be pcm");
        }

        src_format.validate()?;

        if target.is_pcm() {
            if src_format.bits_per_sample != target.bits_per_sample {
                return unsupported_error("dsp: pcm sample width conversion is not supported");
            }
        }
        else if src_format.bits_per_sample != 16 {
            return unsupported_error("dsp: encoder input must be 16-bit pcm");
        }

        let DspContext { state, work, resampled, .. } = self;

        work.clear();
        resampled.clear();

        let pcm = if src_format.samples_per_sec != target.samples_per_sec
            || src_format.channels != target.channels
        {
            resample(data, src_format, target.samples_per_sec, target.channels, resampled)?;
            resampled.as_slice()
        }
        else {
            data
        };

        match state {
            CodecState::Pcm => {
                out.ensure_remaining(pcm.len())?;
                out.write_buf(pcm)
            }
            CodecState::Ima(ima) => ima.encode(&target, pcm, out),
            CodecState::Ms(ms) => ms.encode(&target, pcm, out),
            CodecState::External { codec, .. } => codec.encode(&target, pcm, work, out),
            CodecState::Unset => invalid_argument_error("dsp: no format set"),
        }
    }

    /// Decode the data in `data`, described by `src_format`, and append the PCM to `out`.
    ///
    /// The PCM has the channel count and sample rate of the wire format. Samples are 16 bits wide,
    /// except when the wire format is itself 8-bit PCM.
    pub fn decode(
        &mut self,
        src_format: &AudioFormat,
        data: &[u8],
        out: &mut ByteBuffer,
    ) -> Result<()> {
        if self.mode.is_encoder() {
            return invalid_argument_error("dsp: decode called on an encoding context");
        }

        let target = match self.format {
            Some(format) => format,
            None => return invalid_argument_error("dsp: no format set"),
        };

        if src_format.tag != target.tag {
            return invalid_argument_error("dsp: source format does not match the context format");
        }

        let DspContext { state, work, resampled, .. } = self;

        work.clear();
        resampled.clear();

        match state {
            CodecState::Pcm => {
                out.ensure_remaining(data.len())?;
                out.write_buf(data)
            }
            CodecState::Ima(ima) => ima.decode(&target, data, out),
            CodecState::Ms(ms) => ms.decode(&target, data, out),
            CodecState::External { codec, .. } => codec.decode(&target, data, work, out),
            CodecState::Unset => invalid_argument_error("dsp: no format set"),
        }
    }
}
