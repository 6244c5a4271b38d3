// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Splitting writer over an [`OutputSink`].
//!
//! All writes funnel through [`Writer::write_bytes`], which copies as much
//! as fits the current window, commits, requests a fresh window and
//! continues. Fixed-width values serialize through a stack buffer first, so
//! a sink handing out one-byte windows still produces correct output.

use super::sink::OutputSink;
use super::varint::{self, MAX_VARINT_LEN};
use crate::error::Result;

pub struct Writer<'a> {
    sink: &'a mut dyn OutputSink,
    // Last absolute field id per TagDelimited nesting level; index 0 is the
    // root level. Deltas in field headers are relative to these.
    field_ids: Vec<u32>,
}

impl<'a> Writer<'a> {
    pub fn new(sink: &'a mut dyn OutputSink) -> Self {
        Self {
            sink,
            field_ids: vec![0],
        }
    }

    pub fn write_bytes(&mut self, mut src: &[u8]) -> Result<()> {
        while !src.is_empty() {
            let window = self.sink.request(1)?;
            let n = window.len().min(src.len());
            window[..n].copy_from_slice(&src[..n]);
            self.sink.commit(n);
            src = &src[n..];
        }
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        let window = self.sink.request(1)?;
        window[0] = byte;
        self.sink.commit(1);
        Ok(())
    }

    #[inline]
    pub fn write_varint_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = varint::encode_u64(value, &mut buf);
        self.write_bytes(&buf[..len])
    }

    #[inline]
    pub fn write_varint_u32(&mut self, value: u32) -> Result<()> {
        self.write_varint_u64(u64::from(value))
    }

    #[inline]
    pub fn write_fixed32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    pub fn write_fixed64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    pub fn write_fixed128(&mut self, value: u128) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Compute the delta for `field_id` at the current nesting level and
    /// advance the accumulator. Fields must be written in nondecreasing id
    /// order within a level; partial serializers uphold this.
    pub(crate) fn field_delta(&mut self, field_id: u32) -> u32 {
        let last = self
            .field_ids
            .last_mut()
            .unwrap_or_else(|| unreachable!("root level always present"));
        debug_assert!(field_id >= *last, "field ids must be nondecreasing");
        let delta = field_id.saturating_sub(*last);
        *last = field_id;
        delta
    }

    /// Enter a nested TagDelimited body: fresh field-id accumulator.
    pub(crate) fn push_level(&mut self) {
        self.field_ids.push(0);
    }

    pub(crate) fn pop_level(&mut self) {
        debug_assert!(self.field_ids.len() > 1, "unbalanced end of object");
        self.field_ids.pop();
    }

    /// EndBaseFields resets the accumulator of the current level.
    pub(crate) fn reset_level(&mut self) {
        if let Some(last) = self.field_ids.last_mut() {
            *last = 0;
        }
    }
}
