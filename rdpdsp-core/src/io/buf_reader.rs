// rdpdsp
// Copyright (c) 2024 The rdpdsp Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{Result, malformed_error};

use super::ReadBytes;

#[inline(always)]
fn underrun_error<T>() -> Result<T> {
    malformed_error("buffer underrun")
}

/// A `BufReader` reads bytes from a borrowed byte buffer.
pub struct BufReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufReader<'a> {
    /// Instantiate a new `BufReader` with a given byte buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        BufReader { buf, pos: 0 }
    }

    /// Returns a reference to the next `len` bytes in the buffer and advances the stream.
    pub fn read_buf_bytes_ref(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes_available() < len {
            return underrun_error();
        }
        self.pos += len;
        Ok(&self.buf[self.pos - len..self.pos])
    }

    /// Returns the number of bytes not yet read.
    #[inline(always)]
    pub fn bytes_available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns true if every byte has been read.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }
}

impl ReadBytes for BufReader<'_> {
    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8> {
        if self.bytes_available() < 1 {
            return underrun_error();
        }

        self.pos += 1;
        Ok(self.buf[self.pos - 1])
    }

    #[inline(always)]
    fn read_double_bytes(&mut self) -> Result<[u8; 2]> {
        if self.bytes_available() < 2 {
            return underrun_error();
        }

        let mut bytes: [u8; 2] = [0u8; 2];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;

        Ok(bytes)
    }

    fn ignore_bytes(&mut self, count: usize) -> Result<()> {
        if self.bytes_available() < count {
            return underrun_error();
        }

        self.pos += count;
        Ok(())
    }

    #[inline(always)]
    fn pos(&self) -> usize {
        self.pos
    }
}
