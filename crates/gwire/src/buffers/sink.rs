// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable output sink abstraction.
//!
//! A sink hands out contiguous writable windows and is told afterwards how
//! many bytes were actually written. The [`Writer`](super::Writer) never
//! assumes a window larger than one byte, so a sink may bound its windows
//! arbitrarily; writes that do not fit are split across a commit/re-request
//! boundary.

use crate::error::{CodecError, Result};

/// Destination for encoded bytes.
pub trait OutputSink {
    /// Expose a writable window of at least `min` bytes.
    ///
    /// The returned slice may be larger than `min`. A sink that cannot
    /// satisfy the request fails with [`CodecError::Capacity`]; that is a
    /// sink defect, not a recoverable condition.
    fn request(&mut self, min: usize) -> Result<&mut [u8]>;

    /// Mark the first `len` bytes of the last requested window as written.
    fn commit(&mut self, len: usize);
}

/// Growable heap-backed sink. The default choice.
#[derive(Default)]
pub struct VecSink {
    buf: Vec<u8>,
    len: usize,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            len: 0,
        }
    }

    /// Bytes committed so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl OutputSink for VecSink {
    fn request(&mut self, min: usize) -> Result<&mut [u8]> {
        let needed = self.len + min;
        if self.buf.len() < needed {
            // Amortized growth; windows always reach the end of the buffer.
            let target = core::cmp::max(needed, (self.buf.len() * 2).max(64));
            self.buf.resize(target, 0);
        }
        Ok(&mut self.buf[self.len..])
    }

    fn commit(&mut self, len: usize) {
        debug_assert!(self.len + len <= self.buf.len());
        self.len += len;
    }
}

/// Sink that caps every window at `window` bytes.
///
/// Exists to exercise the writer's split path with adversarially small
/// windows; production code has no reason to use it.
pub struct WindowSink {
    inner: VecSink,
    window: usize,
}

impl WindowSink {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "window must be at least one byte");
        Self {
            inner: VecSink::new(),
            window,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_bytes()
    }
}

impl OutputSink for WindowSink {
    fn request(&mut self, min: usize) -> Result<&mut [u8]> {
        if min > self.window {
            return Err(CodecError::Capacity {
                requested: min,
                available: self.window,
            });
        }
        let window = self.window;
        let full = self.inner.request(min)?;
        let cap = full.len().min(window);
        Ok(&mut full[..cap])
    }

    fn commit(&mut self, len: usize) {
        self.inner.commit(len);
    }
}

/// Sink over a caller-owned fixed buffer. Overflow is a capacity error.
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl OutputSink for SliceSink<'_> {
    fn request(&mut self, min: usize) -> Result<&mut [u8]> {
        let available = self.buf.len() - self.len;
        if min > available {
            return Err(CodecError::Capacity {
                requested: min,
                available,
            });
        }
        Ok(&mut self.buf[self.len..])
    }

    fn commit(&mut self, len: usize) {
        debug_assert!(self.len + len <= self.buf.len());
        self.len += len;
    }
}
