// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{Result, alloc_error};

/// A `ByteBuffer` is an append-only byte vector with fallible growth.
///
/// Growth is refused with [`Error::AllocationFailure`](crate::errors::Error::AllocationFailure)
/// when the allocator fails or when the buffer would exceed its optional limit. A failed
/// operation leaves the contents untouched, so the buffer stays usable.
#[derive(Clone, Debug, Default)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl ByteBuffer {
    /// Instantiate an empty, unlimited buffer.
    pub fn new() -> Self {
        ByteBuffer { buf: Vec::new(), limit: None }
    }

    /// Instantiate an empty buffer that may never hold more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        ByteBuffer { buf: Vec::new(), limit: Some(limit) }
    }

    /// Instantiate a buffer with room for `capacity` bytes and an optional limit.
    pub fn with_capacity(capacity: usize, limit: Option<usize>) -> Result<Self> {
        let mut buf = ByteBuffer { buf: Vec::new(), limit };
        buf.ensure_capacity(capacity)?;
        Ok(buf)
    }

    /// The maximum length of the buffer, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The number of bytes the buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Make sure the buffer can hold at least `total` bytes without reallocating.
    pub fn ensure_capacity(&mut self, total: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            if total > limit {
                return alloc_error(total);
            }
        }

        if total > self.buf.capacity() {
            let additional = total - self.buf.len();

            if self.buf.try_reserve(additional).is_err() {
                return alloc_error(total);
            }
        }

        Ok(())
    }

    /// Make sure `additional` more bytes can be written without reallocating.
    pub fn ensure_remaining(&mut self, additional: usize) -> Result<()> {
        match self.buf.len().checked_add(additional) {
            Some(total) => self.ensure_capacity(total),
            None => alloc_error(usize::MAX),
        }
    }

    /// Append a byte slice.
    pub fn write_buf(&mut self, buf: &[u8]) -> Result<()> {
        self.ensure_remaining(buf.len())?;
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    /// Append a single byte.
    #[inline(always)]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.ensure_remaining(1)?;
        self.buf.push(value);
        Ok(())
    }

    /// Append an unsigned 16-bit integer in little-endian byte order.
    #[inline(always)]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    /// Append a signed 16-bit integer in little-endian byte order.
    #[inline(always)]
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_buf(&value.to_le_bytes())
    }

    /// Append `len` zero bytes and return them for the caller to fill in.
    pub fn extend_zeroed(&mut self, len: usize) -> Result<&mut [u8]> {
        self.ensure_remaining(len)?;

        let start = self.buf.len();
        self.buf.resize(start + len, 0);

        Ok(&mut self.buf[start..])
    }

    /// Discard the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Gets an immutable slice of the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the buffer, returning the written bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}
