// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trait-object codec with per-variant registration.
//!
//! Each concrete implementor registers under a stable wire name. Writing
//! resolves the runtime type, emits the type identity in the field header
//! and delegates to the variant's field logic; reading looks the identity
//! up and allocates the matching concrete type behind the trait object.
//! Instances are reference-tracked exactly like [`super::SharedCodec`]
//! targets, so shared and cyclic trait-object graphs survive a roundtrip.

use super::{Activator, Codec, PartialSerializer};
use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::types::{TypeHandle, TypeHash};
use crate::wire::{self, FieldHeader, SchemaInfo, WireType};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Concrete-type escape hatch for trait objects.
///
/// Make this a supertrait of any trait serialized polymorphically; the
/// blanket impl covers every concrete implementor.
pub trait AnyValue: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AnyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

type WriteFn = Box<
    dyn Fn(&mut Writer<'_>, &mut SerializerSession, &dyn Any) -> Result<()> + Send + Sync,
>;
type ReadFn<D> = Box<
    dyn Fn(&mut Reader<'_>, &mut SerializerSession, u32) -> Result<Rc<RefCell<D>>> + Send + Sync,
>;

struct PolyEntry<D: ?Sized> {
    handle: TypeHandle,
    write: WriteFn,
    read: ReadFn<D>,
}

pub struct PolymorphicCodec<D: ?Sized + AnyValue> {
    entries: Vec<PolyEntry<D>>,
    by_type: HashMap<TypeId, usize>,
    by_hash: HashMap<TypeHash, usize>,
}

impl<D: ?Sized + AnyValue> Default for PolymorphicCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ?Sized + AnyValue> PolymorphicCodec<D> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_type: HashMap::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Register one concrete implementor under its wire name.
    ///
    /// `upcast` coerces the freshly decoded concrete instance into the
    /// trait object; supply it as `|rc| rc`, the coercion happens at the
    /// call site.
    pub fn register<C, P, A>(
        &mut self,
        name: &str,
        partial: P,
        activator: A,
        upcast: fn(Rc<RefCell<C>>) -> Rc<RefCell<D>>,
    ) where
        C: Any,
        P: PartialSerializer<Value = C>,
        A: Activator<C>,
    {
        let handle = TypeHandle::new(name);
        let partial = Arc::new(partial);
        let write_partial = Arc::clone(&partial);
        let write: WriteFn = Box::new(move |w, session, value| {
            let concrete = value
                .downcast_ref::<C>()
                .ok_or(CodecError::CodecTypeMismatch {
                    expected: std::any::type_name::<C>(),
                })?;
            write_partial.write_fields(w, session, concrete)
        });
        let read: ReadFn<D> = Box::new(move |r, session, id| {
            let concrete = Rc::new(RefCell::new(activator.create()));
            let shared = upcast(Rc::clone(&concrete));
            session
                .reader_refs
                .record_placeholder(id, Box::new(shared.clone()))?;
            r.push_level();
            {
                let mut guard = concrete.borrow_mut();
                partial.read_fields(r, session, &mut guard)?;
            }
            Ok(shared)
        });

        let index = self.entries.len();
        self.by_type.insert(TypeId::of::<C>(), index);
        self.by_hash.insert(handle.hash(), index);
        self.entries.push(PolyEntry {
            handle,
            write,
            read,
        });
    }
}

impl<D: ?Sized + AnyValue> Codec for PolymorphicCodec<D> {
    type Target = Rc<RefCell<D>>;

    fn wire_type(&self) -> WireType {
        WireType::TagDelimited
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Self::Target,
    ) -> Result<()> {
        let address = Rc::as_ptr(value) as *const () as usize;
        if let Some(id) = session.writer_refs.check(address) {
            session.writer_refs.mark_value_field();
            w.write_expected_header(field_id, WireType::Reference)?;
            return w.write_varint_u64(u64::from(id));
        }

        // The guard has to outlive the `as_any` borrow it hands out.
        let guard = value.borrow();
        let type_id = (*guard).as_any().type_id();
        let entry = self
            .by_type
            .get(&type_id)
            .map(|index| &self.entries[*index])
            .ok_or_else(|| CodecError::UnknownPolymorphicType {
                name: format!("{:?}", type_id),
            })?;

        session.writer_refs.record(address);
        wire::write_typed_header(w, session, field_id, WireType::TagDelimited, &entry.handle)?;
        w.start_fields();
        (entry.write)(w, session, (*guard).as_any())?;
        drop(guard);
        w.end_object()
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Self::Target> {
        match header.wire_type {
            WireType::Reference => {
                session.reader_refs.next_field_id();
                let id = r.read_varint_u32()?;
                if id == 0 {
                    return Err(CodecError::UnresolvedReference { id });
                }
                self.read_reference(session, id)
            }
            WireType::TagDelimited => {
                let handle = match &header.schema {
                    SchemaInfo::Typed(handle) => handle,
                    // A polymorphic field always travels with its identity.
                    SchemaInfo::Expected => {
                        return Err(CodecError::UnknownPolymorphicType {
                            name: String::from("<unannotated>"),
                        })
                    }
                };
                let entry = self
                    .by_hash
                    .get(&handle.hash())
                    .map(|index| &self.entries[*index])
                    .ok_or_else(|| CodecError::UnknownPolymorphicType {
                        name: handle.name().to_owned(),
                    })?;
                let id = session.reader_refs.next_field_id();
                (entry.read)(r, session, id)
            }
            _ => Err(CodecError::UnexpectedWireType {
                expected: WireType::TagDelimited,
                found: header.wire_type,
                position: r.position(),
            }),
        }
    }

    fn read_reference(&self, session: &mut SerializerSession, id: u32) -> Result<Self::Target> {
        session.reader_refs.resolve::<Self::Target>(id)
    }
}
