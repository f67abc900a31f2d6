// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `resample` module implements a nearest-neighbour sample rate converter.
//!
//! Every output frame is a copy of the source frame closest to it in time. There is no
//! interpolation and no anti-aliasing filter. The output matches other implementations of the
//! audio redirection channel frame for frame.

use crate::errors::{Result, alloc_error, invalid_argument_error, unsupported_error};
use crate::format::AudioFormat;
use crate::io::ByteBuffer;

/// Returns the number of frames `resample` produces for `src_frames` frames of input.
///
/// The count is rounded to the nearest frame so that long streams do not drift. A source rate of
/// zero yields zero frames.
pub fn resampled_frames(src_frames: u64, src_rate: u32, dst_rate: u32) -> u64 {
    if src_rate == 0 {
        return 0;
    }

    let src_rate = u64::from(src_rate);

    src_frames.saturating_mul(u64::from(dst_rate)).saturating_add(src_rate / 2 + src_rate % 2)
        / src_rate
}

/// Resample the interleaved PCM in `src` to `dst_rate` and `dst_channels`, appending the result
/// to `out`.
///
/// The sample width is kept. When the channel counts differ, each output frame is built by
/// repeating the bytes of the chosen source frame, so mono to stereo duplicates the sample and
/// stereo to mono keeps the first channel. A trailing partial frame in `src` is ignored.
pub fn resample(
    src: &[u8],
    src_format: &AudioFormat,
    dst_rate: u32,
    dst_channels: u16,
    out: &mut ByteBuffer,
) -> Result<()> {
    if !src_format.is_pcm() {
        return unsupported_error("core (resample): source must be pcm");
    }

    if src_format.samples_per_sec == 0 || dst_rate == 0 {
        return invalid_argument_error("core (resample): sample rate must be positive");
    }

    if !src_format.is_stereo_capable() || !(dst_channels == 1 || dst_channels == 2) {
        return unsupported_error("core (resample): only mono and stereo are supported");
    }

    let sample_bytes = src_format.bytes_per_sample();
    let src_frame_bytes = src_format.bytes_per_frame();
    let dst_frame_bytes = sample_bytes * usize::from(dst_channels);

    let src_frames = src.len() / src_frame_bytes;

    if src_frames == 0 {
        return Ok(());
    }

    let dst_frames = resampled_frames(src_frames as u64, src_format.samples_per_sec, dst_rate);

    let dst_len = usize::try_from(dst_frames).ok().and_then(|n| n.checked_mul(dst_frame_bytes));

    let dst = match dst_len {
        Some(len) => out.extend_zeroed(len)?,
        None => return alloc_error(usize::MAX),
    };

    let src_rate = u64::from(src_format.samples_per_sec);
    let dst_rate = u64::from(dst_rate);
    let last = (src_frames - 1) as u64;

    for (i, dst_frame) in dst.chunks_exact_mut(dst_frame_bytes).enumerate() {
        // Position of the output frame on the source time axis, scaled by the output rate.
        let t = i as u64 * src_rate;

        let n1 = (t / dst_rate).min(last);
        let n2 = if n1 * dst_rate == t || n1 == last { n1 } else { n1 + 1 };

        // Pick the later frame only if it is strictly closer.
        let d1 = t as i64 - (n1 * dst_rate) as i64;
        let d2 = (n2 * dst_rate) as i64 - t as i64;

        let n = (if d1 > d2 { n2 } else { n1 }) as usize;

        let src_frame = &src[n * src_frame_bytes..(n + 1) * src_frame_bytes];

        for (j, byte) in dst_frame.iter_mut().enumerate() {
            *byte = src_frame[j % src_frame_bytes];
        }
    }

    Ok(())
}
