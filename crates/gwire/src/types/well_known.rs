// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed table of well-known built-in types.
//!
//! These get a one-varint type identity code instead of the hash + name
//! encoding. The table is part of the wire contract: ids are positional and
//! must never be reordered.

use super::type_codec::{TypeHandle, TypeHash};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Names in wire-id order. Appending is fine; reordering breaks the format.
const WELL_KNOWN_NAMES: &[&str] = &[
    "bool", "u8", "i8", "u16", "i16", "u32", "i32", "u64", "i64", "u128", "i128", "f32", "f64",
    "char", "str", "bytes", "unit", "duration",
];

pub struct WellKnownTypes {
    handles: Vec<TypeHandle>,
    by_hash: HashMap<TypeHash, u32>,
}

impl WellKnownTypes {
    fn build() -> Self {
        let handles: Vec<TypeHandle> = WELL_KNOWN_NAMES
            .iter()
            .map(|name| TypeHandle::new(*name))
            .collect();
        let by_hash = handles
            .iter()
            .enumerate()
            .map(|(id, handle)| (handle.hash(), id as u32))
            .collect();
        Self { handles, by_hash }
    }

    pub fn handle(&self, id: u32) -> Option<&TypeHandle> {
        self.handles.get(id as usize)
    }

    pub fn id_of(&self, hash: TypeHash) -> Option<u32> {
        self.by_hash.get(&hash).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

pub fn well_known() -> &'static WellKnownTypes {
    static TABLE: OnceLock<WellKnownTypes> = OnceLock::new();
    TABLE.get_or_init(WellKnownTypes::build)
}
