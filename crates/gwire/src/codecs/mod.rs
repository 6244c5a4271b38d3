// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec traits and the object-safety bridge.
//!
//! A [`Codec`] is the typed interface a value serializes through. The
//! registry stores codecs type-erased behind [`UntypedCodec`], with
//! [`CodecAdapter`] bridging the two; user code gets them back as
//! [`CodecHandle`]s, which restore the typed surface without exposing the
//! `dyn Any` plumbing.
//!
//! Every field written or read consumes exactly one reference id, whether
//! or not the field is reference-typed. Codec implementations own that
//! bookkeeping: value codecs call `mark_value_field`/`next_field_id`,
//! reference codecs record and resolve through the session tables.

pub mod containers;
pub mod polymorphic;
pub mod registry;
pub mod scalars;
pub mod shared;

use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::wire::{self, skip::skip_field, FieldHeader, WireItem, WireType};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

pub use containers::{BoxCodec, Bytes, BytesCodec, MapCodec, OptionCodec, VecCodec};
pub use polymorphic::{AnyValue, PolymorphicCodec};
pub use registry::{CodecRegistry, GeneralizedCodecProvider, SharedWireable, TypeQuery, Wireable};
pub use scalars::{
    BoolCodec, CharCodec, DurationCodec, F32Codec, F64Codec, I128Codec, StringCodec, U128Codec,
    UnitCodec, VarIntCodec, VarUintCodec,
};
pub use shared::SharedCodec;

/// Typed serializer for one target type.
pub trait Codec: 'static {
    type Target: 'static;

    /// Wire type of a freshly written value. Reference codecs may still
    /// emit `Reference` headers for repeat encounters.
    fn wire_type(&self) -> WireType;

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Self::Target,
    ) -> Result<()>;

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Self::Target>;

    /// Resolve a nonzero back-reference whose varint id was already
    /// consumed by an enclosing codec. Only reference codecs can; a
    /// back-reference into a value-typed field is a stream defect.
    fn read_reference(&self, _session: &mut SerializerSession, id: u32) -> Result<Self::Target> {
        Err(CodecError::ValueFieldReference { id })
    }

    /// True when this codec claims the null reference sentinel for one of
    /// its own values. An enclosing [`OptionCodec`] then frames present
    /// values in a section so absence stays unambiguous at every layer.
    fn accepts_null(&self) -> bool {
        false
    }
}

/// Type-erased codec as stored in the registry.
///
/// `read_any` writes the decoded value into `out`, which must be a
/// `&mut Option<Target>`; this keeps the erased path allocation-free.
pub trait UntypedCodec: Send + Sync + 'static {
    fn wire_type(&self) -> WireType;

    fn write_any(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &dyn Any,
    ) -> Result<()>;

    fn read_any(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
        out: &mut dyn Any,
    ) -> Result<()>;

    fn read_reference_any(
        &self,
        session: &mut SerializerSession,
        id: u32,
        out: &mut dyn Any,
    ) -> Result<()>;

    /// See [`Codec::accepts_null`].
    fn accepts_null(&self) -> bool {
        false
    }
}

/// Bridges a typed [`Codec`] into the registry's erased storage.
pub struct CodecAdapter<C> {
    codec: C,
}

impl<C> CodecAdapter<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }
}

fn out_slot<T: 'static>(out: &mut dyn Any) -> Result<&mut Option<T>> {
    out.downcast_mut::<Option<T>>()
        .ok_or(CodecError::CodecTypeMismatch {
            expected: std::any::type_name::<T>(),
        })
}

impl<C> UntypedCodec for CodecAdapter<C>
where
    C: Codec + Send + Sync,
{
    fn wire_type(&self) -> WireType {
        self.codec.wire_type()
    }

    fn write_any(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &dyn Any,
    ) -> Result<()> {
        let value =
            value
                .downcast_ref::<C::Target>()
                .ok_or(CodecError::CodecTypeMismatch {
                    expected: std::any::type_name::<C::Target>(),
                })?;
        self.codec.write(w, session, field_id, value)
    }

    fn read_any(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
        out: &mut dyn Any,
    ) -> Result<()> {
        let slot = out_slot::<C::Target>(out)?;
        *slot = Some(self.codec.read(r, session, header)?);
        Ok(())
    }

    fn read_reference_any(
        &self,
        session: &mut SerializerSession,
        id: u32,
        out: &mut dyn Any,
    ) -> Result<()> {
        let slot = out_slot::<C::Target>(out)?;
        *slot = Some(self.codec.read_reference(session, id)?);
        Ok(())
    }

    fn accepts_null(&self) -> bool {
        self.codec.accepts_null()
    }
}

/// Shared, typed view over a registry-owned codec.
pub struct CodecHandle<T: 'static> {
    inner: Arc<dyn UntypedCodec>,
    _target: PhantomData<fn() -> T>,
}

impl<T: 'static> CodecHandle<T> {
    pub fn new(inner: Arc<dyn UntypedCodec>) -> Self {
        Self {
            inner,
            _target: PhantomData,
        }
    }

    pub fn untyped(&self) -> &Arc<dyn UntypedCodec> {
        &self.inner
    }

    pub fn wire_type(&self) -> WireType {
        self.inner.wire_type()
    }

    pub fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &T,
    ) -> Result<()> {
        self.inner.write_any(w, session, field_id, value)
    }

    pub fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<T> {
        let mut slot: Option<T> = None;
        self.inner.read_any(r, session, header, &mut slot)?;
        slot.ok_or(CodecError::CodecTypeMismatch {
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn read_reference(&self, session: &mut SerializerSession, id: u32) -> Result<T> {
        let mut slot: Option<T> = None;
        self.inner.read_reference_any(session, id, &mut slot)?;
        slot.ok_or(CodecError::CodecTypeMismatch {
            expected: std::any::type_name::<T>(),
        })
    }

    pub fn accepts_null(&self) -> bool {
        self.inner.accepts_null()
    }
}

impl<T: 'static> Clone for CodecHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _target: PhantomData,
        }
    }
}

/// Creates the uninitialized instance a decode populates.
pub trait Activator<T>: Send + Sync + 'static {
    fn create(&self) -> T;
}

/// Activator for `Default` types.
#[derive(Default, Clone, Copy)]
pub struct DefaultActivator;

impl<T: Default> Activator<T> for DefaultActivator {
    fn create(&self) -> T {
        T::default()
    }
}

/// Field-level serialization logic of one struct, without the framing.
///
/// `write_fields` must emit fields in nondecreasing field-id order and no
/// terminator; `read_fields` consumes fields up to and including the body
/// terminator (via [`read_section`]), tolerating unknown fields.
pub trait PartialSerializer: Send + Sync + 'static {
    type Value: 'static;

    fn write_fields(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        value: &Self::Value,
    ) -> Result<()>;

    fn read_fields(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        value: &mut Self::Value,
    ) -> Result<()>;
}

/// Which marker ended a field section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEnd {
    Object,
    BaseFields,
}

/// Drive one field section: known fields go to `on_field` (return `true`
/// when consumed), unknown fields are skipped with full id bookkeeping.
pub fn read_section<F>(
    r: &mut Reader<'_>,
    session: &mut SerializerSession,
    mut on_field: F,
) -> Result<SectionEnd>
where
    F: FnMut(&mut Reader<'_>, &mut SerializerSession, &FieldHeader) -> Result<bool>,
{
    loop {
        match wire::read_item(r, session)? {
            WireItem::Field(header) => {
                if !on_field(r, session, &header)? {
                    skip_field(r, session, &header)?;
                }
            }
            WireItem::EndObject => return Ok(SectionEnd::Object),
            WireItem::EndBaseFields => return Ok(SectionEnd::BaseFields),
        }
    }
}

/// Value-semantics struct codec: frames a [`PartialSerializer`] as a
/// TagDelimited body. Instances are never referenceable; a back-reference
/// to one of these fields fails decoding.
pub struct StructCodec<P, A = DefaultActivator> {
    partial: P,
    activator: A,
}

impl<P> StructCodec<P, DefaultActivator> {
    pub fn new(partial: P) -> Self {
        Self {
            partial,
            activator: DefaultActivator,
        }
    }
}

impl<P, A> StructCodec<P, A> {
    pub fn with_activator(partial: P, activator: A) -> Self {
        Self { partial, activator }
    }
}

impl<P, A> Codec for StructCodec<P, A>
where
    P: PartialSerializer,
    A: Activator<P::Value>,
{
    type Target = P::Value;

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
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::TagDelimited)?;
        w.start_fields();
        self.partial.write_fields(w, session, value)?;
        w.end_object()
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Self::Target> {
        wire::expect_wire(header, WireType::TagDelimited, r)?;
        session.reader_refs.next_field_id();
        let mut value = self.activator.create();
        r.push_level();
        self.partial.read_fields(r, session, &mut value)?;
        Ok(value)
    }
}
