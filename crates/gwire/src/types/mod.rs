// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type identity: well-known type table and the hash + name codec.

pub mod type_codec;
pub mod well_known;

pub use type_codec::{decode_handle, encode_handle, name_cache, TypeHandle, TypeHash, TypeNameCache};
pub use well_known::{well_known, WellKnownTypes};
