// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Top-level serialization entry points.
//!
//! A [`Serializer`] owns a codec registry and a session pool. The plain
//! `serialize`/`deserialize` calls borrow a pooled session per operation;
//! the `_with` variants take a caller-managed session for callers batching
//! several operations under one logical request, where object references
//! must reset between operations but the type table carries over.

use crate::buffers::{OutputSink, Reader, VecSink, Writer};
use crate::codecs::{CodecRegistry, Wireable};
use crate::error::{CodecError, Result};
use crate::session::{SerializerSession, SessionPool};
use crate::wire::{self, WireItem};
use std::sync::Arc;

pub struct Serializer {
    registry: Arc<CodecRegistry>,
    pool: SessionPool,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(CodecRegistry::new()))
    }

    pub fn with_registry(registry: Arc<CodecRegistry>) -> Self {
        Self {
            registry,
            pool: SessionPool::new(),
        }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn serialize<T: Wireable>(&self, value: &T, sink: &mut dyn OutputSink) -> Result<()> {
        let mut session = self.pool.acquire();
        self.serialize_with(value, sink, &mut session)
    }

    pub fn serialize_with<T: Wireable>(
        &self,
        value: &T,
        sink: &mut dyn OutputSink,
        session: &mut SerializerSession,
    ) -> Result<()> {
        let codec = self.registry.resolve::<T>()?;
        let mut writer = Writer::new(sink);
        codec.write(&mut writer, session, 0, value)
    }

    pub fn serialize_to_vec<T: Wireable>(&self, value: &T) -> Result<Vec<u8>> {
        let mut sink = VecSink::new();
        self.serialize(value, &mut sink)?;
        Ok(sink.into_bytes())
    }

    /// Decode one value from an ordered sequence of byte segments.
    pub fn deserialize<T: Wireable>(&self, segments: &[&[u8]]) -> Result<T> {
        let mut session = self.pool.acquire();
        self.deserialize_with(segments, &mut session)
    }

    pub fn deserialize_with<T: Wireable>(
        &self,
        segments: &[&[u8]],
        session: &mut SerializerSession,
    ) -> Result<T> {
        let codec = self.registry.resolve::<T>()?;
        let mut reader = Reader::new(segments);
        match wire::read_item(&mut reader, session)? {
            WireItem::Field(header) => codec.read(&mut reader, session, &header),
            // A section marker cannot open a stream.
            WireItem::EndObject | WireItem::EndBaseFields => Err(CodecError::InvalidHeader {
                position: 0,
                byte: wire::END_BASE_FIELDS_TAG,
            }),
        }
    }
}
