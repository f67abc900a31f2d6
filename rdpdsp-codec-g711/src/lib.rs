// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ITU-T G.711 A-law and mu-law codec provider.
//!
//! Each 16-bit PCM sample is companded to one byte. The codec is stateless, so packets may be
//! split anywhere on a sample boundary.

use log::debug;

use rdpdsp_core::support_format;

use rdpdsp_core::codecs::registry::{RegisterableProvider, SupportedFormat};
use rdpdsp_core::codecs::{CodecInfo, DspOptions, ExternalCodec, Mode};
use rdpdsp_core::errors::{Result, malformed_error, provider_error, unsupported_error};
use rdpdsp_core::format::AudioFormat;
use rdpdsp_core::format::well_known::{FORMAT_TAG_ALAW, FORMAT_TAG_MULAW};
use rdpdsp_core::io::ByteBuffer;
use rdpdsp_core::util::pcm::samples_i16;

// The companding functions are adaptations of alaw2linear, ulaw2linear, linear2alaw, and
// linear2ulaw from g711.c by SUN Microsystems (unrestricted use license).
const XLAW_SIGN_BIT: u8 = 0x80;
const XLAW_QUANT_MASK: u8 = 0x0f;
const XLAW_SEG_MASK: u8 = 0x70;
const XLAW_SEG_SHIFT: u32 = 4;

const MULAW_BIAS: i16 = 0x84;
const MULAW_CLIP: i32 = 8159;

/// Segment end points of the 13-bit A-law magnitude.
const ALAW_SEG_END: [i32; 8] = [0x1f, 0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff];

/// Segment end points of the biased 14-bit mu-law magnitude.
const MULAW_SEG_END: [i32; 8] = [0x3f, 0x7f, 0xff, 0x1ff, 0x3ff, 0x7ff, 0xfff, 0x1fff];

fn segment(value: i32, seg_end: &[i32; 8]) -> Option<u8> {
    seg_end.iter().position(|&end| value <= end).map(|seg| seg as u8)
}

fn alaw_to_linear(mut a_val: u8) -> i16 {
    a_val ^= 0x55;

    let mut t = i16::from((a_val & XLAW_QUANT_MASK) << 4);
    let seg = (a_val & XLAW_SEG_MASK) >> XLAW_SEG_SHIFT;

    match seg {
        0 => t += 0x8,
        1 => t += 0x108,
        _ => t = (t + 0x108) << (seg - 1),
    }

    if a_val & XLAW_SIGN_BIT == XLAW_SIGN_BIT { t } else { -t }
}

fn mulaw_to_linear(mut mu_val: u8) -> i16 {
    // Complement to obtain normal u-law value.
    mu_val = !mu_val;

    // Extract and bias the quantization bits. Then shift up by the segment number and subtract out
    // the bias.
    let mut t = i16::from((mu_val & XLAW_QUANT_MASK) << 3) + MULAW_BIAS;
    t <<= (mu_val & XLAW_SEG_MASK) >> XLAW_SEG_SHIFT;

    if mu_val & XLAW_SIGN_BIT == XLAW_SIGN_BIT { MULAW_BIAS - t } else { t - MULAW_BIAS }
}

fn linear_to_alaw(pcm: i16) -> u8 {
    let mut pcm = i32::from(pcm) >> 3;

    let mask = if pcm >= 0 {
        0xd5
    }
    else {
        pcm = -pcm - 1;
        0x55
    };

    match segment(pcm, &ALAW_SEG_END) {
        Some(seg) => {
            let shift = if seg < 2 { 1 } else { u32::from(seg) };
            let quant = ((pcm >> shift) as u8) & XLAW_QUANT_MASK;
            ((seg << XLAW_SEG_SHIFT) | quant) ^ mask
        }
        None => 0x7f ^ mask,
    }
}

fn linear_to_mulaw(pcm: i16) -> u8 {
    let mut pcm = i32::from(pcm) >> 2;

    let mask = if pcm < 0 {
        pcm = -pcm;
        0x7f
    }
    else {
        0xff
    };

    let pcm = pcm.min(MULAW_CLIP) + i32::from(MULAW_BIAS >> 2);

    match segment(pcm, &MULAW_SEG_END) {
        Some(seg) => {
            let quant = ((pcm >> (u32::from(seg) + 1)) as u8) & XLAW_QUANT_MASK;
            ((seg << XLAW_SEG_SHIFT) | quant) ^ mask
        }
        None => 0x7f ^ mask,
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Law {
    ALaw,
    MuLaw,
}

impl Law {
    fn encode(&self, pcm: i16) -> u8 {
        match self {
            Law::ALaw => linear_to_alaw(pcm),
            Law::MuLaw => linear_to_mulaw(pcm),
        }
    }

    fn decode(&self, code: u8) -> i16 {
        match self {
            Law::ALaw => alaw_to_linear(code),
            Law::MuLaw => mulaw_to_linear(code),
        }
    }
}

const SUPPORTED_FORMATS: &[SupportedFormat] = &[
    support_format!(FORMAT_TAG_ALAW, "alaw", "ITU-T G.711 A-law", true, true),
    support_format!(FORMAT_TAG_MULAW, "mulaw", "ITU-T G.711 mu-law", true, true),
];

/// G.711 codec provider.
pub struct G711Provider {
    law: Law,
    info: &'static CodecInfo,
}

impl G711Provider {
    fn try_new(format: &AudioFormat) -> Result<Self> {
        let (law, info) = match format.tag {
            FORMAT_TAG_ALAW => (Law::ALaw, &SUPPORTED_FORMATS[0].info),
            FORMAT_TAG_MULAW => (Law::MuLaw, &SUPPORTED_FORMATS[1].info),
            _ => return unsupported_error("g711: invalid format tag"),
        };

        check_format(format)?;

        Ok(G711Provider { law, info })
    }
}

fn check_format(format: &AudioFormat) -> Result<()> {
    if !format.is_stereo_capable() {
        return unsupported_error("g711: only mono and stereo are supported");
    }

    if format.bits_per_sample != 8 {
        return provider_error("g711: coded samples must be 8 bits wide");
    }

    Ok(())
}

impl ExternalCodec for G711Provider {
    fn codec_info(&self) -> &CodecInfo {
        self.info
    }

    fn reset(&mut self, format: &AudioFormat) -> Result<()> {
        check_format(format)
    }

    fn encode(
        &mut self,
        format: &AudioFormat,
        pcm: &[u8],
        _scratch: &mut ByteBuffer,
        out: &mut ByteBuffer,
    ) -> Result<()> {
        check_format(format)?;

        if pcm.len() % 2 != 0 {
            return malformed_error("g711: pcm input is not a whole number of samples");
        }

        out.ensure_remaining(pcm.len() / 2)?;

        for sample in samples_i16(pcm) {
            out.write_u8(self.law.encode(sample))?;
        }

        Ok(())
    }

    fn decode(
        &mut self,
        format: &AudioFormat,
        data: &[u8],
        _scratch: &mut ByteBuffer,
        out: &mut ByteBuffer,
    ) -> Result<()> {
        check_format(format)?;

        let pcm = out.extend_zeroed(2 * data.len())?;

        for (&code, sample) in data.iter().zip(pcm.chunks_exact_mut(2)) {
            sample.copy_from_slice(&self.law.decode(code).to_le_bytes());
        }

        Ok(())
    }
}

impl RegisterableProvider for G711Provider {
    fn try_registry_new(
        format: &AudioFormat,
        mode: Mode,
        _opts: &DspOptions,
    ) -> Result<Box<dyn ExternalCodec>> {
        let provider = G711Provider::try_new(format)?;

        debug!(
            "g711: new {} {:?} for {} channel(s)",
            provider.info.short_name, mode, format.channels
        );

        Ok(Box::new(provider))
    }

    fn supported_formats() -> &'static [SupportedFormat] {
        SUPPORTED_FORMATS
    }
}
