// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-session table of runtime type identities.
//!
//! The first occurrence of a non-well-known type within one operation is
//! encoded in full (hash + name) and recorded here; later occurrences
//! reference it by index. Cleared only on full reset, so the handful of
//! operations sharing one logical request reuse the table.

use crate::error::{CodecError, Result};
use crate::types::{TypeHandle, TypeHash};
use std::collections::HashMap;

#[derive(Default)]
pub struct ReferencedTypes {
    by_hash: HashMap<TypeHash, u32>,
    handles: Vec<TypeHandle>,
}

impl ReferencedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index previously assigned to this type in the current operation.
    pub fn index_of(&self, hash: TypeHash) -> Option<u32> {
        self.by_hash.get(&hash).copied()
    }

    /// Record a first occurrence; returns its index.
    pub fn record(&mut self, handle: TypeHandle) -> u32 {
        let index = self.handles.len() as u32;
        self.by_hash.insert(handle.hash(), index);
        self.handles.push(handle);
        index
    }

    pub fn get(&self, index: u32) -> Result<&TypeHandle> {
        self.handles
            .get(index as usize)
            .ok_or(CodecError::UnknownTypeReference { index })
    }

    pub fn reset(&mut self) {
        self.by_hash.clear();
        self.handles.clear();
    }
}
