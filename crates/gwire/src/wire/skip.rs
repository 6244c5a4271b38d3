// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Skipping unknown fields.
//!
//! Forward compatibility hinges on two properties: every payload length is
//! derivable from header plus payload alone, and a skipped field still
//! consumes its reference ids. Skipping therefore walks nested bodies and
//! advances the reader's id counter exactly as decoding would, keeping the
//! remaining reference ids of the stream resolvable.

use super::{read_item, FieldHeader, WireItem, WireType};
use crate::buffers::Reader;
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;

/// Skip the payload of a field that was not recognized.
///
/// The header has already been consumed; this consumes the payload and one
/// reference id (plus one per nested field for TagDelimited bodies).
pub fn skip_field(
    r: &mut Reader<'_>,
    session: &mut SerializerSession,
    header: &FieldHeader,
) -> Result<()> {
    session.reader_refs.next_field_id();
    skip_payload(r, session, header.wire_type)
}

fn skip_payload(
    r: &mut Reader<'_>,
    session: &mut SerializerSession,
    wire: WireType,
) -> Result<()> {
    match wire {
        WireType::VarInt | WireType::Reference => {
            r.read_varint_u64()?;
            Ok(())
        }
        WireType::Fixed32 => r.skip(4),
        WireType::Fixed64 => r.skip(8),
        WireType::Fixed128 => r.skip(16),
        WireType::LengthPrefixed => {
            let len = r.read_varint_u32()? as usize;
            r.skip(len)
        }
        WireType::TagDelimited => {
            r.push_level();
            loop {
                match read_item(r, session)? {
                    WireItem::Field(nested) => skip_field(r, session, &nested)?,
                    WireItem::EndBaseFields => {}
                    WireItem::EndObject => return Ok(()),
                }
            }
        }
        // read_item never yields a field header with the Extended wire type.
        WireType::Extended => Err(CodecError::InvalidHeader {
            position: r.position(),
            byte: (WireType::Extended as u8) << 5,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{VecSink, Writer};

    #[test]
    fn test_skip_every_wire_type() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(0, WireType::VarInt)
                .expect("write");
            writer.write_varint_u64(300).expect("write");
            writer
                .write_expected_header(1, WireType::Fixed32)
                .expect("write");
            writer.write_fixed32(0xAABB_CCDD).expect("write");
            writer
                .write_expected_header(2, WireType::Fixed64)
                .expect("write");
            writer.write_fixed64(99).expect("write");
            writer
                .write_expected_header(3, WireType::Fixed128)
                .expect("write");
            writer.write_fixed128(1).expect("write");
            writer
                .write_expected_header(4, WireType::LengthPrefixed)
                .expect("write");
            writer.write_varint_u32(3).expect("write");
            writer.write_bytes(b"abc").expect("write");
            writer
                .write_expected_header(5, WireType::Reference)
                .expect("write");
            writer.write_varint_u64(0).expect("write");
            // Trailing sentinel so the test can prove skipping stopped
            // exactly at the payload boundary.
            writer
                .write_expected_header(6, WireType::VarInt)
                .expect("write");
            writer.write_varint_u64(42).expect("write");
        }

        let bytes = sink.into_bytes();
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut session = SerializerSession::new();
        for expected_id in 0..=5 {
            match read_item(&mut reader, &mut session).expect("header") {
                WireItem::Field(header) => {
                    assert_eq!(header.field_id, expected_id);
                    skip_field(&mut reader, &mut session, &header).expect("skip");
                }
                other => panic!("unexpected item {:?}", other),
            }
        }
        match read_item(&mut reader, &mut session).expect("sentinel header") {
            WireItem::Field(header) => {
                assert_eq!(header.field_id, 6);
                assert_eq!(reader.read_varint_u64().expect("sentinel"), 42);
            }
            other => panic!("unexpected item {:?}", other),
        }
        // Six skipped fields consumed six reference ids.
        assert_eq!(session.reader_refs.next_field_id(), 7);
    }

    #[test]
    fn test_skip_nested_object_consumes_nested_ids() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(0, WireType::TagDelimited)
                .expect("write");
            writer.start_fields();
            writer
                .write_expected_header(0, WireType::VarInt)
                .expect("write");
            writer.write_varint_u64(1).expect("write");
            writer
                .write_expected_header(1, WireType::TagDelimited)
                .expect("write");
            writer.start_fields();
            writer
                .write_expected_header(0, WireType::VarInt)
                .expect("write");
            writer.write_varint_u64(2).expect("write");
            writer.end_object().expect("write");
            writer.end_object().expect("write");
        }

        let bytes = sink.into_bytes();
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut session = SerializerSession::new();
        match read_item(&mut reader, &mut session).expect("header") {
            WireItem::Field(header) => {
                assert_eq!(header.wire_type, WireType::TagDelimited);
                skip_field(&mut reader, &mut session, &header).expect("skip");
            }
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(reader.position(), bytes.len());
        // Outer object, two inner fields, one nested object, its field.
        assert_eq!(session.reader_refs.next_field_id(), 5);
    }

    #[test]
    fn test_skip_truncated_payload_reports_error() {
        let mut sink = VecSink::new();
        {
            let mut writer = Writer::new(&mut sink);
            writer
                .write_expected_header(0, WireType::LengthPrefixed)
                .expect("write");
            writer.write_varint_u32(16).expect("write");
            writer.write_bytes(b"short").expect("write");
        }
        let bytes = sink.into_bytes();
        let segments: [&[u8]; 1] = [&bytes];
        let mut reader = Reader::new(&segments);
        let mut session = SerializerSession::new();
        match read_item(&mut reader, &mut session).expect("header") {
            WireItem::Field(header) => {
                match skip_field(&mut reader, &mut session, &header).unwrap_err() {
                    CodecError::Truncated { .. } => {}
                    other => panic!("unexpected error {:?}", other),
                }
            }
            other => panic!("unexpected item {:?}", other),
        }
    }
}
