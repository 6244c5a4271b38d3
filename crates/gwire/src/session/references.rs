// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object reference tables.
//!
//! Every field written or read consumes exactly one reference id in strict
//! encounter order, so writer and reader numbering stay in lock-step even
//! though only reference-typed fields are recorded for lookup. Id 0 is
//! reserved for the null/absent encoding and is never assigned.

use crate::error::{CodecError, Result};
use std::any::Any;
use std::collections::HashMap;

/// First id handed out; 0 encodes null.
const FIRST_ID: u32 = 1;

/// Write-side table: object identity (allocation address) to assigned id.
pub struct WriterReferences {
    ids: HashMap<usize, u32>,
    next: u32,
}

impl WriterReferences {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: FIRST_ID,
        }
    }

    /// Advance the counter for a value-typed field. The returned id is not
    /// resolvable; it exists to keep numbering symmetric with the reader.
    pub fn mark_value_field(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id previously assigned to this object instance, if any. Identity
    /// comparison: the key is the shared allocation's address.
    pub fn check(&self, address: usize) -> Option<u32> {
        self.ids.get(&address).copied()
    }

    /// Assign the next id to a first-encountered object. Recording happens
    /// before the object's fields are encoded, so recursive references to
    /// it resolve to this id.
    pub fn record(&mut self, address: usize) -> u32 {
        let id = self.mark_value_field();
        self.ids.insert(address, id);
        id
    }

    pub fn reset(&mut self) {
        self.ids.clear();
        self.next = FIRST_ID;
    }
}

impl Default for WriterReferences {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-side table: id to placeholder instance.
///
/// Placeholders are boxed clones of the shared handle (for example an
/// `Rc<RefCell<T>>`), recorded immediately after allocation and before
/// population, which is what makes cyclic graphs decodable.
pub struct ReaderReferences {
    objects: HashMap<u32, Box<dyn Any>>,
    next: u32,
}

impl ReaderReferences {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next: FIRST_ID,
        }
    }

    /// Consume the next id for the field currently being read.
    pub fn next_field_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Record a still-being-populated instance under `id`.
    pub fn record_placeholder(&mut self, id: u32, placeholder: Box<dyn Any>) -> Result<()> {
        if self.objects.insert(id, placeholder).is_some() {
            return Err(CodecError::DuplicateReference { id });
        }
        Ok(())
    }

    /// Resolve a back-reference to a previously recorded instance.
    ///
    /// Distinguishes three failure shapes: an id from the future (the
    /// writer never emits forward references), an id consumed by a
    /// value-typed field (never resolvable, checked here), and a recorded
    /// instance of the wrong type.
    pub fn resolve<R: Clone + 'static>(&self, id: u32) -> Result<R> {
        if id < FIRST_ID || id >= self.next {
            return Err(CodecError::UnresolvedReference { id });
        }
        match self.objects.get(&id) {
            Some(boxed) => boxed
                .downcast_ref::<R>()
                .cloned()
                .ok_or(CodecError::CodecTypeMismatch {
                    expected: std::any::type_name::<R>(),
                }),
            None => Err(CodecError::ValueFieldReference { id }),
        }
    }

    pub fn reset(&mut self) {
        self.objects.clear();
        self.next = FIRST_ID;
    }
}

impl Default for ReaderReferences {
    fn default() -> Self {
        Self::new()
    }
}
