// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-header ("tag") encoding.
//!
//! Every value on the wire is a (header, payload) pair. The tag byte packs
//! three fields:
//!
//! ```text
//!   bit 7 6 5 | 4 3    | 2 1 0
//!       wire  | schema | field-id delta
//! ```
//!
//! - **wire** selects the physical encoding of the payload.
//! - **schema** records whether the runtime type matches the statically
//!   expected type (`Expected`), or how the actual type identity follows
//!   (well-known id, full hash + name encoding, or an index into the
//!   session's type reference table).
//! - **delta** is the field id relative to the previous field at the same
//!   nesting level; 0..=6 inline, 7 means `7 + varint` follows.
//!
//! Wire type 7 (`Extended`) escapes into a sub-space of rarely used
//! headers; its low five bits select the marker. `EndObject` terminates a
//! TagDelimited body, `EndBaseFields` separates one inheritance level from
//! the next and resets the delta accumulator.

pub mod skip;

use crate::buffers::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::types::{self, well_known, TypeHandle};

/// Physical encoding category of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    VarInt = 0,
    TagDelimited = 1,
    LengthPrefixed = 2,
    Fixed32 = 3,
    Fixed64 = 4,
    Fixed128 = 5,
    Reference = 6,
    Extended = 7,
}

impl WireType {
    pub const fn from_bits(bits: u8) -> WireType {
        match bits & 0x7 {
            0 => WireType::VarInt,
            1 => WireType::TagDelimited,
            2 => WireType::LengthPrefixed,
            3 => WireType::Fixed32,
            4 => WireType::Fixed64,
            5 => WireType::Fixed128,
            6 => WireType::Reference,
            _ => WireType::Extended,
        }
    }
}

/// How the actual runtime type follows the tag byte, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum SchemaBits {
    Expected = 0,
    WellKnown = 1,
    Encoded = 2,
    Referenced = 3,
}

/// Decoded type information carried by a field header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaInfo {
    /// Runtime type equals the statically expected type.
    Expected,
    /// Runtime type differs; its identity was resolved from the wire.
    Typed(TypeHandle),
}

/// A decoded field header. Constructed immediately before a value is read
/// and discarded right after; never persisted beyond a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHeader {
    pub wire_type: WireType,
    pub field_id: u32,
    pub schema: SchemaInfo,
}

/// One step through a TagDelimited body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireItem {
    Field(FieldHeader),
    EndObject,
    EndBaseFields,
}

const EXTENDED_END_OBJECT: u8 = 0x01;
const EXTENDED_END_BASE_FIELDS: u8 = 0x02;
const DELTA_INLINE_MAX: u32 = 6;
const DELTA_EXTENDED: u8 = 7;

#[inline]
const fn pack(wire: WireType, schema: SchemaBits, delta_bits: u8) -> u8 {
    ((wire as u8) << 5) | ((schema as u8) << 3) | delta_bits
}

pub(crate) const END_OBJECT_TAG: u8 =
    pack(WireType::Extended, SchemaBits::Expected, EXTENDED_END_OBJECT);
pub(crate) const END_BASE_FIELDS_TAG: u8 =
    pack(WireType::Extended, SchemaBits::Expected, EXTENDED_END_BASE_FIELDS);

impl Writer<'_> {
    /// Header for a field whose runtime type matches the expected type.
    pub fn write_expected_header(&mut self, field_id: u32, wire: WireType) -> Result<()> {
        self.write_header_bits(field_id, wire, SchemaBits::Expected)
    }

    fn write_header_bits(
        &mut self,
        field_id: u32,
        wire: WireType,
        schema: SchemaBits,
    ) -> Result<()> {
        debug_assert!(wire != WireType::Extended, "markers use their own path");
        let delta = self.field_delta(field_id);
        if delta <= DELTA_INLINE_MAX {
            self.write_u8(pack(wire, schema, delta as u8))
        } else {
            self.write_u8(pack(wire, schema, DELTA_EXTENDED))?;
            self.write_varint_u32(delta - u32::from(DELTA_EXTENDED))
        }
    }

    /// Begin the field sequence of a TagDelimited body.
    pub fn start_fields(&mut self) {
        self.push_level();
    }

    /// Terminate a TagDelimited body.
    pub fn end_object(&mut self) -> Result<()> {
        self.pop_level();
        self.write_u8(END_OBJECT_TAG)
    }

    /// Separate a base type's fields from the enclosing type's own fields.
    /// Also resets the field-id delta accumulator to zero.
    pub fn end_base_fields(&mut self) -> Result<()> {
        self.reset_level();
        self.write_u8(END_BASE_FIELDS_TAG)
    }
}

/// Header for a field whose runtime type must travel with it.
///
/// Picks the cheapest identity encoding: a well-known id, an index into
/// the session's type table for a repeat, or the full hash + name form
/// (recorded in the table for later repeats).
pub fn write_typed_header(
    w: &mut Writer<'_>,
    session: &mut SerializerSession,
    field_id: u32,
    wire: WireType,
    handle: &TypeHandle,
) -> Result<()> {
    if let Some(id) = well_known().id_of(handle.hash()) {
        w.write_header_bits(field_id, wire, SchemaBits::WellKnown)?;
        return w.write_varint_u32(id);
    }
    if let Some(index) = session.referenced_types.index_of(handle.hash()) {
        w.write_header_bits(field_id, wire, SchemaBits::Referenced)?;
        return w.write_varint_u32(index);
    }
    w.write_header_bits(field_id, wire, SchemaBits::Encoded)?;
    types::encode_handle(w, handle)?;
    session.referenced_types.record(handle.clone());
    Ok(())
}

/// Read the next header or marker of the current TagDelimited body.
pub fn read_item(r: &mut Reader<'_>, session: &mut SerializerSession) -> Result<WireItem> {
    let position = r.position();
    let byte = r.read_u8()?;
    let wire = WireType::from_bits(byte >> 5);

    if wire == WireType::Extended {
        return match byte & 0x1F {
            EXTENDED_END_OBJECT => {
                if r.at_root_level() {
                    return Err(CodecError::InvalidHeader { position, byte });
                }
                r.pop_level();
                Ok(WireItem::EndObject)
            }
            EXTENDED_END_BASE_FIELDS => {
                r.reset_level();
                Ok(WireItem::EndBaseFields)
            }
            _ => Err(CodecError::InvalidHeader { position, byte }),
        };
    }

    let delta_bits = byte & 0x7;
    let delta = if delta_bits == DELTA_EXTENDED {
        let extra = r.read_varint_u32()?;
        u32::from(DELTA_EXTENDED)
            .checked_add(extra)
            .ok_or(CodecError::MalformedVarint {
                position: r.position(),
            })?
    } else {
        u32::from(delta_bits)
    };
    let field_id = r.accumulate_field_id(delta)?;

    let schema = match (byte >> 3) & 0x3 {
        0 => SchemaInfo::Expected,
        1 => {
            let id = r.read_varint_u32()?;
            let handle = well_known()
                .handle(id)
                .ok_or(CodecError::UnknownWellKnown { id })?
                .clone();
            SchemaInfo::Typed(handle)
        }
        2 => {
            let handle = types::decode_handle(r)?;
            session.referenced_types.record(handle.clone());
            SchemaInfo::Typed(handle)
        }
        _ => {
            let index = r.read_varint_u32()?;
            let handle = session.referenced_types.get(index)?.clone();
            SchemaInfo::Typed(handle)
        }
    };

    Ok(WireItem::Field(FieldHeader {
        wire_type: wire,
        field_id,
        schema,
    }))
}

/// Fail unless the header carries the wire type a decode path expects.
pub fn expect_wire(header: &FieldHeader, expected: WireType, r: &Reader<'_>) -> Result<()> {
    if header.wire_type == expected {
        Ok(())
    } else {
        Err(CodecError::UnexpectedWireType {
            expected,
            found: header.wire_type,
            position: r.position(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::VecSink;

    fn read_all(bytes: &[u8], session: &mut SerializerSession) -> Vec<WireItem> {
        let segments: [&[u8]; 1] = [bytes];
        let mut reader = Reader::new(&segments);
        let mut items = Vec::new();
        while reader.position() < bytes.len() {
            items.push(read_item(&mut reader, session).expect("read item"));
        }
        items
    }

    #[test]
    fn test_expected_header_roundtrip_inline_delta() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(0, WireType::VarInt)
                .expect("write");
            writer
                .write_expected_header(3, WireType::Fixed64)
                .expect("write");
            writer
                .write_expected_header(6, WireType::LengthPrefixed)
                .expect("write");
        }
        let mut session = SerializerSession::new();
        let items = read_all(sink.as_bytes(), &mut session);
        let ids: Vec<u32> = items
            .iter()
            .map(|item| match item {
                WireItem::Field(h) => h.field_id,
                other => panic!("unexpected item {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec![0, 3, 6]);
    }

    #[test]
    fn test_expected_header_extended_delta() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(1000, WireType::VarInt)
                .expect("write");
            writer
                .write_expected_header(1001, WireType::VarInt)
                .expect("write");
        }
        let mut session = SerializerSession::new();
        let items = read_all(sink.as_bytes(), &mut session);
        match (&items[0], &items[1]) {
            (WireItem::Field(a), WireItem::Field(b)) => {
                assert_eq!(a.field_id, 1000);
                assert_eq!(b.field_id, 1001);
            }
            other => panic!("unexpected items {:?}", other),
        }
    }

    #[test]
    fn test_extended_delta_overflow_is_rejected() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            // Extended delta whose varint pushes the delta past u32.
            writer.write_u8(0x07).expect("write");
            writer.write_varint_u32(u32::MAX).expect("write");
        }
        let mut session = SerializerSession::new();
        let bytes = sink.as_bytes();
        let segments: [&[u8]; 1] = [bytes];
        let mut reader = Reader::new(&segments);
        match read_item(&mut reader, &mut session) {
            Err(CodecError::MalformedVarint { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_accumulated_field_id_overflow_is_rejected() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            // First header lands near the top of the id space; the next
            // inline delta would wrap the accumulator.
            writer.write_u8(0x07).expect("write");
            writer.write_varint_u32(u32::MAX - 10).expect("write");
            writer.write_u8(0x06).expect("write");
        }
        let mut session = SerializerSession::new();
        let bytes = sink.as_bytes();
        let segments: [&[u8]; 1] = [bytes];
        let mut reader = Reader::new(&segments);
        match read_item(&mut reader, &mut session).expect("first header") {
            WireItem::Field(h) => assert_eq!(h.field_id, u32::MAX - 3),
            other => panic!("unexpected item {:?}", other),
        }
        match read_item(&mut reader, &mut session) {
            Err(CodecError::MalformedVarint { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_markers_and_level_reset() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(0, WireType::TagDelimited)
                .expect("write");
            writer.start_fields();
            writer
                .write_expected_header(4, WireType::VarInt)
                .expect("write");
            writer.end_base_fields().expect("write");
            // Delta accumulator reset: id 2 is representable again.
            writer
                .write_expected_header(2, WireType::VarInt)
                .expect("write");
            writer.end_object().expect("write");
        }

        let mut session = SerializerSession::new();
        let bytes = sink.as_bytes();
        let segments: [&[u8]; 1] = [bytes];
        let mut reader = Reader::new(&segments);
        match read_item(&mut reader, &mut session).expect("read") {
            WireItem::Field(h) => assert_eq!(h.wire_type, WireType::TagDelimited),
            other => panic!("unexpected item {:?}", other),
        }
        reader.push_level();
        let mut items = Vec::new();
        loop {
            let item = read_item(&mut reader, &mut session).expect("read");
            let done = item == WireItem::EndObject;
            items.push(item);
            if done {
                break;
            }
        }
        assert_eq!(items.len(), 4);
        match &items[0] {
            WireItem::Field(h) => assert_eq!(h.field_id, 4),
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(items[1], WireItem::EndBaseFields);
        match &items[2] {
            WireItem::Field(h) => assert_eq!(h.field_id, 2),
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(reader.position(), bytes.len());
    }

    #[test]
    fn test_typed_header_uses_table_on_repeat() {
        let handle = TypeHandle::new("tests.Repeated");
        let mut sink = VecSink::new();
        let mut write_session = SerializerSession::new();
        {
            let mut writer = Writer::new(&mut sink);
            write_typed_header(
                &mut writer,
                &mut write_session,
                0,
                WireType::TagDelimited,
                &handle,
            )
            .expect("write");
            write_typed_header(
                &mut writer,
                &mut write_session,
                1,
                WireType::TagDelimited,
                &handle,
            )
            .expect("write");
        }

        let mut read_session = SerializerSession::new();
        let items = read_all(sink.as_bytes(), &mut read_session);
        for item in &items {
            match item {
                WireItem::Field(h) => assert_eq!(h.schema, SchemaInfo::Typed(handle.clone())),
                other => panic!("unexpected item {:?}", other),
            }
        }
        // The repeat is an index reference: two bytes (tag + index varint).
        let first_len = 1 + 8 + 1 + "tests.Repeated".len();
        assert_eq!(sink.as_bytes().len(), first_len + 2);
    }

    #[test]
    fn test_typed_header_well_known() {
        let handle = TypeHandle::new("u32");
        let mut sink = VecSink::new();
        let mut session = SerializerSession::new();
        {
            let mut writer = Writer::new(&mut sink);
            write_typed_header(&mut writer, &mut session, 0, WireType::VarInt, &handle)
                .expect("write");
        }
        // Tag byte plus a one-byte well-known id.
        assert_eq!(sink.as_bytes().len(), 2);
        let mut read_session = SerializerSession::new();
        let items = read_all(sink.as_bytes(), &mut read_session);
        match &items[0] {
            WireItem::Field(h) => match &h.schema {
                SchemaInfo::Typed(t) => assert_eq!(t.name(), "u32"),
                other => panic!("unexpected schema {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_unknown_extended_marker_is_error() {
        let bytes = [pack(WireType::Extended, SchemaBits::Expected, 0x1C)];
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut session = SerializerSession::new();
        match read_item(&mut reader, &mut session).unwrap_err() {
            CodecError::InvalidHeader { position, byte } => {
                assert_eq!(position, 0);
                assert_eq!(byte, bytes[0]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
