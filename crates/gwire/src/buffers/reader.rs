// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Segment-spanning reader.
//!
//! Input arrives as an ordered sequence of byte segments. Reads that fit
//! inside the current segment borrow from it directly; reads spanning a
//! boundary fall back to copying into a temporary. The reader tracks an
//! absolute position across segments for error reporting.

use super::varint;
use crate::error::{CodecError, Result};
use std::borrow::Cow;

pub struct Reader<'a> {
    segments: &'a [&'a [u8]],
    segment: usize,
    offset: usize,
    position: usize,
    // Mirror of the writer's per-level field-id accumulators.
    field_ids: Vec<u32>,
}

impl<'a> Reader<'a> {
    pub fn new(segments: &'a [&'a [u8]]) -> Self {
        Self {
            segments,
            segment: 0,
            offset: 0,
            position: 0,
            field_ids: vec![0],
        }
    }

    /// Absolute position across all segments, in bytes consumed.
    pub fn position(&self) -> usize {
        self.position
    }

    fn remaining_in_segment(&self) -> usize {
        self.segments
            .get(self.segment)
            .map_or(0, |seg| seg.len() - self.offset)
    }

    /// Bytes left across the current and all later segments.
    fn remaining(&self) -> usize {
        self.segments
            .get(self.segment..)
            .map_or(0, |rest| rest.iter().map(|seg| seg.len()).sum::<usize>())
            - self.offset
    }

    /// Advance past exhausted segments; false when input is fully consumed.
    fn advance_segment(&mut self) -> bool {
        while let Some(seg) = self.segments.get(self.segment) {
            if self.offset < seg.len() {
                return true;
            }
            self.segment += 1;
            self.offset = 0;
        }
        false
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        if !self.advance_segment() {
            return Err(CodecError::Truncated {
                position: self.position,
            });
        }
        let byte = self.segments[self.segment][self.offset];
        self.offset += 1;
        self.position += 1;
        Ok(byte)
    }

    /// Fill `out` exactly, spanning segments as needed.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if !self.advance_segment() {
                return Err(CodecError::Truncated {
                    position: self.position,
                });
            }
            let seg = self.segments[self.segment];
            let n = (seg.len() - self.offset).min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&seg[self.offset..self.offset + n]);
            self.offset += n;
            self.position += n;
            filled += n;
        }
        Ok(())
    }

    /// Fixed-width read with a single-segment fast path.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        if self.remaining_in_segment() >= N {
            let seg = self.segments[self.segment];
            out.copy_from_slice(&seg[self.offset..self.offset + N]);
            self.offset += N;
            self.position += N;
        } else {
            self.read_exact(&mut out)?;
        }
        Ok(out)
    }

    /// Variable-length read; borrows when one segment covers it.
    pub fn read_bytes(&mut self, len: usize) -> Result<Cow<'a, [u8]>> {
        if self.remaining_in_segment() >= len {
            let seg = self.segments[self.segment];
            let slice = &seg[self.offset..self.offset + len];
            self.offset += len;
            self.position += len;
            Ok(Cow::Borrowed(slice))
        } else {
            // The length came off the wire; check it against real input
            // before sizing a buffer from it.
            if self.remaining() < len {
                return Err(CodecError::Truncated {
                    position: self.position,
                });
            }
            let mut buf = vec![0u8; len];
            self.read_exact(&mut buf)?;
            Ok(Cow::Owned(buf))
        }
    }

    /// Discard `len` bytes.
    pub fn skip(&mut self, mut len: usize) -> Result<()> {
        while len > 0 {
            if !self.advance_segment() {
                return Err(CodecError::Truncated {
                    position: self.position,
                });
            }
            let n = self.remaining_in_segment().min(len);
            self.offset += n;
            self.position += n;
            len -= n;
        }
        Ok(())
    }

    pub fn read_varint_u64(&mut self) -> Result<u64> {
        let start = self.position;
        let first = self.read_u8()?;
        let mut buf = [0u8; varint::MAX_VARINT_LEN];
        buf[0] = first;
        let len = if first != 0 {
            first.trailing_zeros() as usize + 1
        } else {
            let second = self.read_u8()?;
            buf[1] = second;
            varint::encoded_len(0, second)
                .ok_or(CodecError::MalformedVarint { position: start })?
        };
        let have = if first != 0 { 1 } else { 2 };
        if len > have {
            self.read_exact(&mut buf[have..len])?;
        }
        varint::decode_u64(&buf, len).ok_or(CodecError::MalformedVarint { position: start })
    }

    pub fn read_varint_u32(&mut self) -> Result<u32> {
        let start = self.position;
        let wide = self.read_varint_u64()?;
        u32::try_from(wide).map_err(|_| CodecError::MalformedVarint { position: start })
    }

    pub(crate) fn accumulate_field_id(&mut self, delta: u32) -> Result<u32> {
        let position = self.position;
        let last = self
            .field_ids
            .last_mut()
            .unwrap_or_else(|| unreachable!("root level always present"));
        *last = last
            .checked_add(delta)
            .ok_or(CodecError::MalformedVarint { position })?;
        Ok(*last)
    }

    pub(crate) fn push_level(&mut self) {
        self.field_ids.push(0);
    }

    /// True outside any TagDelimited body. An end-of-object marker here is
    /// a malformed stream, not an unbalance bug.
    pub(crate) fn at_root_level(&self) -> bool {
        self.field_ids.len() == 1
    }

    pub(crate) fn pop_level(&mut self) {
        debug_assert!(self.field_ids.len() > 1, "unbalanced end of object");
        self.field_ids.pop();
    }

    pub(crate) fn reset_level(&mut self) {
        if let Some(last) = self.field_ids.last_mut() {
            *last = 0;
        }
    }
}
