// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide codec resolution.
//!
//! The registry maps a target `TypeId` to its codec, building lazily on
//! first use. Resolution order: an explicitly registered codec, then the
//! type's intrinsic [`Wireable::build_codec`], then the generalized
//! providers in registration order. Outcomes are cached either way; a
//! failed resolution stays failed for the life of the registry.
//!
//! Builds run under a reentrant lock so concurrent first resolutions are
//! deterministic and recursive resolution of a cyclic type graph cannot
//! deadlock: a type already being built on the current thread resolves to
//! a deferred codec backed by the same slot, which becomes live when the
//! outer build completes.

use super::containers::{BoxCodec, Bytes, BytesCodec, MapCodec, OptionCodec, VecCodec};
use super::scalars::{
    BoolCodec, CharCodec, DurationCodec, F32Codec, F64Codec, I128Codec, StringCodec, U128Codec,
    UnitCodec, VarIntCodec, VarUintCodec,
};
use super::{Codec, CodecAdapter, CodecHandle, UntypedCodec};
use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::wire::{FieldHeader, WireType};
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// A type that can produce its own codec.
///
/// Scalars and the standard containers carry intrinsic impls; user structs
/// implement this by assembling a [`super::StructCodec`] or
/// [`super::SharedCodec`] from their field codecs, resolving those through
/// the registry they are handed.
pub trait Wireable: Sized + 'static {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>>;
}

/// Counterpart of [`Wireable`] for graph nodes serialized behind
/// `Rc<RefCell<_>>`.
///
/// Coherence forbids downstream crates from implementing `Wireable`
/// directly on `Rc<RefCell<Node>>`, since every type in that impl header
/// is foreign. Implementing this trait on the node type itself routes
/// through the blanket impl below instead. The built codec's target is
/// still the shared handle, so a [`super::SharedCodec`] is the usual
/// body.
pub trait SharedWireable: Sized + 'static {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>>;
}

impl<T: SharedWireable> Wireable for Rc<RefCell<T>> {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
        <T as SharedWireable>::build_codec(registry)
    }
}

/// What a generalized provider gets asked about.
#[derive(Debug, Clone, Copy)]
pub struct TypeQuery {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Last-resort codec source for open-ended type families.
pub trait GeneralizedCodecProvider: Send + Sync + 'static {
    fn handles(&self, query: &TypeQuery) -> bool;
    fn create(&self, query: &TypeQuery, registry: &CodecRegistry)
        -> Result<Arc<dyn UntypedCodec>>;
}

struct CodecSlot {
    built: OnceLock<Result<Arc<dyn UntypedCodec>>>,
}

impl CodecSlot {
    fn new() -> Self {
        Self {
            built: OnceLock::new(),
        }
    }
}

/// Stands in for a codec whose build is still in progress further up the
/// current call stack. Every operation forwards to the shared slot, which
/// is populated by the time any serialization runs.
struct DeferredCodec {
    slot: Arc<CodecSlot>,
}

impl DeferredCodec {
    fn resolved(&self) -> Result<&Arc<dyn UntypedCodec>> {
        match self.slot.built.get() {
            Some(Ok(codec)) => Ok(codec),
            Some(Err(err)) => Err(err.clone()),
            None => Err(CodecError::NoCodec {
                type_name: String::from("<unresolved cyclic codec>"),
            }),
        }
    }
}

impl UntypedCodec for DeferredCodec {
    fn wire_type(&self) -> WireType {
        // Only object-shaped types can participate in a cycle, so this is
        // the right answer while the slot is still pending.
        match self.slot.built.get() {
            Some(Ok(codec)) => codec.wire_type(),
            _ => WireType::TagDelimited,
        }
    }

    fn write_any(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &dyn Any,
    ) -> Result<()> {
        self.resolved()?.write_any(w, session, field_id, value)
    }

    fn read_any(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
        out: &mut dyn Any,
    ) -> Result<()> {
        self.resolved()?.read_any(r, session, header, out)
    }

    fn read_reference_any(
        &self,
        session: &mut SerializerSession,
        id: u32,
        out: &mut dyn Any,
    ) -> Result<()> {
        self.resolved()?.read_reference_any(session, id, out)
    }

    fn accepts_null(&self) -> bool {
        match self.slot.built.get() {
            Some(Ok(codec)) => codec.accepts_null(),
            _ => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryStats {
    /// Resolutions served from an already-built slot without locking.
    pub fast_hits: u64,
    /// Codec builds attempted (including ones that failed).
    pub builds: u64,
}

pub struct CodecRegistry {
    slots: DashMap<TypeId, Arc<CodecSlot>>,
    providers: RwLock<Vec<Arc<dyn GeneralizedCodecProvider>>>,
    // Reentrant so a build can resolve its own field types; the RefCell
    // tracks which types this thread is currently building.
    build_lock: ReentrantMutex<RefCell<HashSet<TypeId>>>,
    fast_hits: AtomicU64,
    builds: AtomicU64,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            providers: RwLock::new(Vec::new()),
            build_lock: ReentrantMutex::new(RefCell::new(HashSet::new())),
            fast_hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    fn slot(&self, type_id: TypeId) -> Arc<CodecSlot> {
        self.slots
            .entry(type_id)
            .or_insert_with(|| Arc::new(CodecSlot::new()))
            .clone()
    }

    /// Pre-register a codec for `T`, bypassing intrinsic resolution.
    /// A no-op (with a warning) if `T` already resolved.
    pub fn register<T: 'static>(&self, codec: Arc<dyn UntypedCodec>) {
        let slot = self.slot(TypeId::of::<T>());
        if slot.built.set(Ok(codec)).is_err() {
            log::warn!(
                "codec for {} already resolved; registration ignored",
                std::any::type_name::<T>()
            );
        }
    }

    /// Convenience wrapper for [`Self::register`] over a typed codec.
    pub fn register_codec<C>(&self, codec: C)
    where
        C: Codec + Send + Sync,
    {
        self.register::<C::Target>(Arc::new(CodecAdapter::new(codec)));
    }

    pub fn register_provider(&self, provider: Arc<dyn GeneralizedCodecProvider>) {
        self.providers.write().push(provider);
    }

    /// Resolve the codec for `T`, building it on first use.
    pub fn resolve<T: Wireable>(&self) -> Result<CodecHandle<T>> {
        self.resolve_untyped::<T>().map(CodecHandle::new)
    }

    fn resolve_untyped<T: Wireable>(&self) -> Result<Arc<dyn UntypedCodec>> {
        let type_id = TypeId::of::<T>();
        if let Some(slot) = self.slots.get(&type_id) {
            if let Some(result) = slot.built.get() {
                self.fast_hits.fetch_add(1, Ordering::Relaxed);
                return result.clone();
            }
        }

        let building = self.build_lock.lock();
        let slot = self.slot(type_id);
        if let Some(result) = slot.built.get() {
            return result.clone();
        }
        if !building.borrow_mut().insert(type_id) {
            log::trace!(
                "deferring codec for cyclic {}",
                std::any::type_name::<T>()
            );
            return Ok(Arc::new(DeferredCodec { slot }));
        }

        log::trace!("building codec for {}", std::any::type_name::<T>());
        self.builds.fetch_add(1, Ordering::Relaxed);
        let built = match T::build_codec(self) {
            Err(CodecError::NoCodec { .. }) => self.from_providers::<T>(),
            other => other,
        };
        building.borrow_mut().remove(&type_id);
        slot.built.get_or_init(|| built).clone()
    }

    /// Resolve a codec for a type without an intrinsic build: explicitly
    /// registered codecs and generalized providers only.
    pub fn get<T: 'static>(&self) -> Result<CodecHandle<T>> {
        let type_id = TypeId::of::<T>();
        if let Some(slot) = self.slots.get(&type_id) {
            if let Some(result) = slot.built.get() {
                self.fast_hits.fetch_add(1, Ordering::Relaxed);
                return result.clone().map(CodecHandle::new);
            }
        }
        let _building = self.build_lock.lock();
        let slot = self.slot(type_id);
        if let Some(result) = slot.built.get() {
            return result.clone().map(CodecHandle::new);
        }
        self.builds.fetch_add(1, Ordering::Relaxed);
        let built = self.from_providers::<T>();
        slot.built.get_or_init(|| built).clone().map(CodecHandle::new)
    }

    fn from_providers<T: 'static>(&self) -> Result<Arc<dyn UntypedCodec>> {
        let query = TypeQuery {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        };
        let providers = self.providers.read();
        for provider in providers.iter() {
            if provider.handles(&query) {
                return provider.create(&query, self);
            }
        }
        Err(CodecError::NoCodec {
            type_name: query.type_name.to_owned(),
        })
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            fast_hits: self.fast_hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }
}

macro_rules! impl_wireable_scalar {
    ($($ty:ty => $codec:expr),* $(,)?) => {$(
        impl Wireable for $ty {
            fn build_codec(_registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
                Ok(Arc::new(CodecAdapter::new($codec)))
            }
        }
    )*};
}

impl_wireable_scalar!(
    bool => BoolCodec,
    u8 => VarUintCodec::<u8>::default(),
    u16 => VarUintCodec::<u16>::default(),
    u32 => VarUintCodec::<u32>::default(),
    u64 => VarUintCodec::<u64>::default(),
    i8 => VarIntCodec::<i8>::default(),
    i16 => VarIntCodec::<i16>::default(),
    i32 => VarIntCodec::<i32>::default(),
    i64 => VarIntCodec::<i64>::default(),
    u128 => U128Codec,
    i128 => I128Codec,
    f32 => F32Codec,
    f64 => F64Codec,
    char => CharCodec,
    () => UnitCodec,
    String => StringCodec,
    Duration => DurationCodec,
    Bytes => BytesCodec,
);

impl<T: Wireable> Wireable for Vec<T> {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
        let item = registry.resolve::<T>()?;
        Ok(Arc::new(CodecAdapter::new(VecCodec::new(item))))
    }
}

impl<T: Wireable> Wireable for Option<T> {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
        let inner = registry.resolve::<T>()?;
        Ok(Arc::new(CodecAdapter::new(OptionCodec::new(inner))))
    }
}

impl<T: Wireable> Wireable for Box<T> {
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
        let inner = registry.resolve::<T>()?;
        Ok(Arc::new(CodecAdapter::new(BoxCodec::new(inner))))
    }
}

impl<K, V> Wireable for HashMap<K, V>
where
    K: Wireable + Eq + Hash,
    V: Wireable,
{
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn UntypedCodec>> {
        let key = registry.resolve::<K>()?;
        let value = registry.resolve::<V>()?;
        Ok(Arc::new(CodecAdapter::new(MapCodec::new(key, value))))
    }
}
