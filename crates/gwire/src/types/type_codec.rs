// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type identity: handles, name hashing and the wire codec.
//!
//! A type's identity travels as either a one-varint well-known id (fixed
//! table, see [`super::well_known`]) or as an 8-byte hash of the formatted
//! UTF-8 name followed by the name itself. Both peers cache decoded names
//! bidirectionally so repeated identities cost a table lookup, not a
//! re-validation.

use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use lru::LruCache;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Truncated MD5 of a type's formatted name.
///
/// Eight bytes is enough to make accidental collisions across the types of
/// one process negligible; the full name always follows on the wire, so a
/// collision degrades to a decode-time mismatch error, never a silent
/// confusion.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHash([u8; 8]);

impl TypeHash {
    pub const SIZE: usize = 8;

    pub fn compute(name: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identity of a runtime type as seen on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: Arc<str>,
    hash: TypeHash,
}

impl TypeHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let hash = TypeHash::compute(&name);
        Self { name, hash }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({}:{})", self.name, self.hash)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Encode a handle as hash + length-prefixed UTF-8 name.
pub fn encode_handle(w: &mut Writer<'_>, handle: &TypeHandle) -> Result<()> {
    w.write_bytes(handle.hash.as_bytes())?;
    let name = handle.name.as_bytes();
    w.write_varint_u32(name.len() as u32)?;
    w.write_bytes(name)
}

/// Decode a handle, consuming hash and name and verifying they agree.
///
/// Known hashes short-circuit through the process-wide name cache; the name
/// bytes are still consumed (they are on the wire either way) but skipped
/// without validation.
pub fn decode_handle(r: &mut Reader<'_>) -> Result<TypeHandle> {
    let hash = TypeHash::from_bytes(r.read_array::<{ TypeHash::SIZE }>()?);
    let len = r.read_varint_u32()? as usize;

    if let Some(handle) = name_cache().get(hash) {
        r.skip(len)?;
        return Ok(handle);
    }

    let position = r.position();
    let bytes = r.read_bytes(len)?;
    let name = match bytes {
        Cow::Borrowed(slice) => std::str::from_utf8(slice)
            .map_err(|_| CodecError::InvalidUtf8 { position })?
            .to_owned(),
        Cow::Owned(vec) => {
            String::from_utf8(vec).map_err(|_| CodecError::InvalidUtf8 { position })?
        }
    };
    if TypeHash::compute(&name) != hash {
        return Err(CodecError::TypeHashMismatch { name });
    }
    let handle = TypeHandle { name: name.into(), hash };
    name_cache().insert(handle.clone());
    Ok(handle)
}

/// Process-wide LRU cache of decoded type names, keyed by hash.
pub struct TypeNameCache {
    inner: RwLock<LruCache<TypeHash, TypeHandle>>,
    stats: RwLock<CacheStats>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl TypeNameCache {
    pub fn new(capacity: usize) -> Self {
        #[allow(clippy::expect_used)] // capacity is a crate-internal constant > 0
        Self {
            inner: RwLock::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("capacity > 0"),
            )),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn get(&self, hash: TypeHash) -> Option<TypeHandle> {
        let found = self.inner.write().get(&hash).cloned();
        let mut stats = self.stats.write();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    pub fn insert(&self, handle: TypeHandle) {
        self.inner.write().put(handle.hash(), handle);
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }
}

const NAME_CACHE_CAPACITY: usize = 256;

pub fn name_cache() -> &'static TypeNameCache {
    use std::sync::OnceLock;
    static CACHE: OnceLock<TypeNameCache> = OnceLock::new();
    CACHE.get_or_init(|| TypeNameCache::new(NAME_CACHE_CAPACITY))
}
