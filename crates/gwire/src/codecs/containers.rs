// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs composed over an element codec: sequences, maps, options and
//! boxes.
//!
//! Collections frame their contents as a TagDelimited body and rely on the
//! end marker instead of a length prefix, so elements stream out without a
//! size pass. Elements within a body reuse field id 0 (zero delta, one tag
//! byte each); map entries are nested bodies with key at id 0 and value at
//! id 1.

use super::{read_section, Codec, CodecHandle, SectionEnd};
use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::wire::{self, FieldHeader, WireType};
use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::Hash;

pub struct VecCodec<T: 'static> {
    item: CodecHandle<T>,
}

impl<T: 'static> VecCodec<T> {
    pub fn new(item: CodecHandle<T>) -> Self {
        Self { item }
    }
}

impl<T: 'static> Codec for VecCodec<T> {
    type Target = Vec<T>;

    fn wire_type(&self) -> WireType {
        WireType::TagDelimited
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Vec<T>,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::TagDelimited)?;
        w.start_fields();
        for item in value {
            self.item.write(w, session, 0, item)?;
        }
        w.end_object()
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Vec<T>> {
        wire::expect_wire(header, WireType::TagDelimited, r)?;
        session.reader_refs.next_field_id();
        let mut out = Vec::new();
        r.push_level();
        loop {
            match read_section(r, session, |r, session, item_header| {
                if item_header.field_id == 0 {
                    out.push(self.item.read(r, session, item_header)?);
                    Ok(true)
                } else {
                    Ok(false)
                }
            })? {
                SectionEnd::Object => return Ok(out),
                SectionEnd::BaseFields => {}
            }
        }
    }
}

/// Absent values are a reference to the reserved null id 0; present values
/// use the element codec's own encoding in place. When the element codec
/// also claims the null sentinel (nested options), a present value is
/// framed as a one-field body instead, so each layer's absence stays
/// distinguishable.
pub struct OptionCodec<T: 'static> {
    inner: CodecHandle<T>,
}

impl<T: 'static> OptionCodec<T> {
    pub fn new(inner: CodecHandle<T>) -> Self {
        Self { inner }
    }
}

impl<T: 'static> Codec for OptionCodec<T> {
    type Target = Option<T>;

    fn wire_type(&self) -> WireType {
        WireType::Reference
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Option<T>,
    ) -> Result<()> {
        match value {
            Some(inner) if self.inner.accepts_null() => {
                session.writer_refs.mark_value_field();
                w.write_expected_header(field_id, WireType::TagDelimited)?;
                w.start_fields();
                self.inner.write(w, session, 0, inner)?;
                w.end_object()
            }
            Some(inner) => self.inner.write(w, session, field_id, inner),
            None => {
                session.writer_refs.mark_value_field();
                w.write_expected_header(field_id, WireType::Reference)?;
                w.write_varint_u64(0)
            }
        }
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Option<T>> {
        if header.wire_type == WireType::Reference {
            session.reader_refs.next_field_id();
            let id = r.read_varint_u32()?;
            if id == 0 {
                return Ok(None);
            }
            // A nonzero back-reference belongs to the element codec; only
            // reference codecs accept one.
            return self.inner.read_reference(session, id).map(Some);
        }
        if self.inner.accepts_null() {
            wire::expect_wire(header, WireType::TagDelimited, r)?;
            session.reader_refs.next_field_id();
            let mut out = None;
            r.push_level();
            loop {
                match read_section(r, session, |r, session, inner_header| {
                    if inner_header.field_id == 0 {
                        out = Some(self.inner.read(r, session, inner_header)?);
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                })? {
                    SectionEnd::Object => break,
                    SectionEnd::BaseFields => {}
                }
            }
            return out.map(Some).ok_or(CodecError::MissingField { field_id: 0 });
        }
        self.inner.read(r, session, header).map(Some)
    }

    fn accepts_null(&self) -> bool {
        true
    }
}

/// Transparent indirection: frames nothing, consumes no extra id.
pub struct BoxCodec<T: 'static> {
    inner: CodecHandle<T>,
}

impl<T: 'static> BoxCodec<T> {
    pub fn new(inner: CodecHandle<T>) -> Self {
        Self { inner }
    }
}

impl<T: 'static> Codec for BoxCodec<T> {
    type Target = Box<T>;

    fn wire_type(&self) -> WireType {
        self.inner.wire_type()
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Box<T>,
    ) -> Result<()> {
        self.inner.write(w, session, field_id, value.as_ref())
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Box<T>> {
        self.inner.read(r, session, header).map(Box::new)
    }

    fn read_reference(&self, session: &mut SerializerSession, id: u32) -> Result<Box<T>> {
        self.inner.read_reference(session, id).map(Box::new)
    }

    fn accepts_null(&self) -> bool {
        self.inner.accepts_null()
    }
}

pub struct MapCodec<K: 'static, V: 'static> {
    key: CodecHandle<K>,
    value: CodecHandle<V>,
}

impl<K: 'static, V: 'static> MapCodec<K, V> {
    pub fn new(key: CodecHandle<K>, value: CodecHandle<V>) -> Self {
        Self { key, value }
    }
}

impl<K, V> Codec for MapCodec<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    type Target = HashMap<K, V>;

    fn wire_type(&self) -> WireType {
        WireType::TagDelimited
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &HashMap<K, V>,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::TagDelimited)?;
        w.start_fields();
        for (k, v) in value {
            session.writer_refs.mark_value_field();
            w.write_expected_header(0, WireType::TagDelimited)?;
            w.start_fields();
            self.key.write(w, session, 0, k)?;
            self.value.write(w, session, 1, v)?;
            w.end_object()?;
        }
        w.end_object()
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<HashMap<K, V>> {
        wire::expect_wire(header, WireType::TagDelimited, r)?;
        session.reader_refs.next_field_id();
        let mut out = HashMap::new();
        r.push_level();
        loop {
            match read_section(r, session, |r, session, entry_header| {
                if entry_header.field_id != 0 {
                    return Ok(false);
                }
                let (k, v) = self.read_entry(r, session, entry_header)?;
                out.insert(k, v);
                Ok(true)
            })? {
                SectionEnd::Object => return Ok(out),
                SectionEnd::BaseFields => {}
            }
        }
    }
}

impl<K, V> MapCodec<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    fn read_entry(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<(K, V)> {
        wire::expect_wire(header, WireType::TagDelimited, r)?;
        session.reader_refs.next_field_id();
        let mut key = None;
        let mut value = None;
        r.push_level();
        loop {
            match read_section(r, session, |r, session, field| match field.field_id {
                0 => {
                    key = Some(self.key.read(r, session, field)?);
                    Ok(true)
                }
                1 => {
                    value = Some(self.value.read(r, session, field)?);
                    Ok(true)
                }
                _ => Ok(false),
            })? {
                SectionEnd::Object => break,
                SectionEnd::BaseFields => {}
            }
        }
        let key = key.ok_or(CodecError::MissingField { field_id: 0 })?;
        let value = value.ok_or(CodecError::MissingField { field_id: 1 })?;
        Ok((key, value))
    }
}

/// Opaque binary blob, serialized as one LengthPrefixed payload instead of
/// element-wise.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Default, Clone, Copy)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    type Target = Bytes;

    fn wire_type(&self) -> WireType {
        WireType::LengthPrefixed
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Bytes,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::LengthPrefixed)?;
        w.write_varint_u32(value.0.len() as u32)?;
        w.write_bytes(&value.0)
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Bytes> {
        wire::expect_wire(header, WireType::LengthPrefixed, r)?;
        session.reader_refs.next_field_id();
        let len = r.read_varint_u32()? as usize;
        match r.read_bytes(len)? {
            Cow::Borrowed(slice) => Ok(Bytes(slice.to_vec())),
            Cow::Owned(vec) => Ok(Bytes(vec)),
        }
    }
}
