// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-operation mutable state.
//!
//! A session owns the object reference tables and the type reference table
//! used during one encode or decode. Sessions are not thread-shared; they
//! are pooled and reused. A partial reset clears object references between
//! independent operations sharing one logical request; a full reset also
//! clears the type table and runs when a session returns to its pool.

pub mod pool;
pub mod references;
pub mod types;

pub use pool::{PooledSession, SessionPool};
pub use references::{ReaderReferences, WriterReferences};
pub use types::ReferencedTypes;

pub struct SerializerSession {
    pub writer_refs: WriterReferences,
    pub reader_refs: ReaderReferences,
    pub referenced_types: ReferencedTypes,
}

impl SerializerSession {
    pub fn new() -> Self {
        Self {
            writer_refs: WriterReferences::new(),
            reader_refs: ReaderReferences::new(),
            referenced_types: ReferencedTypes::new(),
        }
    }

    /// Cheap reset between independent operations in one logical request.
    pub fn partial_reset(&mut self) {
        self.writer_refs.reset();
        self.reader_refs.reset();
    }

    /// Everything cleared; run when the session returns to its pool.
    pub fn full_reset(&mut self) {
        self.partial_reset();
        self.referenced_types.reset();
    }
}

impl Default for SerializerSession {
    fn default() -> Self {
        Self::new()
    }
}
