// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte I/O primitives: output sink abstraction, splitting writer,
//! segment-spanning reader and the varint/zig-zag numeric codecs.
//!
//! Nothing in this module knows about object structure; the wire format is
//! layered on top in [`crate::wire`].

pub mod reader;
pub mod sink;
pub mod varint;
pub mod writer;

pub use reader::Reader;
pub use sink::{OutputSink, SliceSink, VecSink, WindowSink};
pub use writer::Writer;
