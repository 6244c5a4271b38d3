// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # gwire - Graph-aware binary serialization engine
//!
//! A compact, self-describing binary serialization engine in pure Rust:
//! varint-packed field headers, segment-spanning zero-copy reads,
//! reference-tracked object graphs (shared instances and cycles survive a
//! roundtrip), and version-tolerant decoding that skips unknown fields
//! with full reference-id bookkeeping.
//!
//! ## Quick Start
//!
//! ```rust
//! use gwire::{Result, Serializer};
//!
//! fn main() -> Result<()> {
//!     let serializer = Serializer::new();
//!
//!     let bytes = serializer.serialize_to_vec(&vec![Some(42u64), None])?;
//!     let back: Vec<Option<u64>> = serializer.deserialize(&[&bytes])?;
//!     assert_eq!(back, vec![Some(42), None]);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                          Serializer Facade                         |
//! |        serialize / deserialize  |  pooled SerializerSession        |
//! +--------------------------------------------------------------------+
//! |                           Codec Layer                              |
//! |  CodecRegistry | StructCodec | SharedCodec | PolymorphicCodec      |
//! +--------------------------------------------------------------------+
//! |                           Wire Format                              |
//! |  field headers | type identity (well-known / hash+name) | skip     |
//! +--------------------------------------------------------------------+
//! |                            Buffers                                 |
//! |  Writer over OutputSink windows | Reader over byte segments        |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Serializer`] | Entry point: registry plus session pool |
//! | [`CodecRegistry`] | Lazy, cached codec resolution by `TypeId` |
//! | [`Wireable`] | Implemented by types that can build their own codec |
//! | [`SharedWireable`] | Same, for graph nodes behind `Rc<RefCell<_>>` |
//! | [`SerializerSession`] | Per-operation reference and type tables |
//! | [`OutputSink`] | Caller-controlled destination for written bytes |

pub mod buffers;
pub mod codecs;
pub mod error;
pub mod serializer;
pub mod session;
pub mod types;
pub mod wire;

pub use buffers::{OutputSink, Reader, SliceSink, VecSink, WindowSink, Writer};
pub use codecs::{
    read_section, Activator, AnyValue, Bytes, Codec, CodecAdapter, CodecHandle, CodecRegistry,
    DefaultActivator, GeneralizedCodecProvider, PartialSerializer, PolymorphicCodec, SectionEnd,
    SharedCodec, SharedWireable, StructCodec, TypeQuery, UntypedCodec, Wireable,
};
pub use error::{CodecError, Result};
pub use serializer::Serializer;
pub use session::{PooledSession, SerializerSession, SessionPool};
pub use types::{TypeHandle, TypeHash};
pub use wire::{FieldHeader, SchemaInfo, WireItem, WireType};
