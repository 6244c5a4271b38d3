// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs for the built-in scalar types.
//!
//! Unsigned integers travel as plain varints, signed ones as zig-zag
//! varints, floats and the 128-bit integers as fixed-width little-endian.
//! All scalars are value fields: they consume one reference id and can
//! never be the target of a back-reference.

use super::Codec;
use crate::buffers::{varint, Reader, Writer};
use crate::error::{CodecError, Result};
use crate::session::SerializerSession;
use crate::wire::{self, FieldHeader, WireType};
use std::borrow::Cow;
use std::marker::PhantomData;
use std::time::Duration;

/// Varint codec for the unsigned integer widths.
pub struct VarUintCodec<T>(PhantomData<fn() -> T>);

/// Zig-zag varint codec for the signed integer widths.
pub struct VarIntCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for VarUintCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for VarIntCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

macro_rules! impl_var_uint {
    ($($ty:ty),* $(,)?) => {$(
        impl Codec for VarUintCodec<$ty> {
            type Target = $ty;

            fn wire_type(&self) -> WireType {
                WireType::VarInt
            }

            fn write(
                &self,
                w: &mut Writer<'_>,
                session: &mut SerializerSession,
                field_id: u32,
                value: &$ty,
            ) -> Result<()> {
                session.writer_refs.mark_value_field();
                w.write_expected_header(field_id, WireType::VarInt)?;
                w.write_varint_u64(u64::from(*value))
            }

            fn read(
                &self,
                r: &mut Reader<'_>,
                session: &mut SerializerSession,
                header: &FieldHeader,
            ) -> Result<$ty> {
                wire::expect_wire(header, WireType::VarInt, r)?;
                session.reader_refs.next_field_id();
                let position = r.position();
                let wide = r.read_varint_u64()?;
                <$ty>::try_from(wide).map_err(|_| CodecError::MalformedVarint { position })
            }
        }
    )*};
}

macro_rules! impl_var_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Codec for VarIntCodec<$ty> {
            type Target = $ty;

            fn wire_type(&self) -> WireType {
                WireType::VarInt
            }

            fn write(
                &self,
                w: &mut Writer<'_>,
                session: &mut SerializerSession,
                field_id: u32,
                value: &$ty,
            ) -> Result<()> {
                session.writer_refs.mark_value_field();
                w.write_expected_header(field_id, WireType::VarInt)?;
                w.write_varint_u64(varint::zigzag_i64(i64::from(*value)))
            }

            fn read(
                &self,
                r: &mut Reader<'_>,
                session: &mut SerializerSession,
                header: &FieldHeader,
            ) -> Result<$ty> {
                wire::expect_wire(header, WireType::VarInt, r)?;
                session.reader_refs.next_field_id();
                let position = r.position();
                let wide = varint::unzigzag_i64(r.read_varint_u64()?);
                <$ty>::try_from(wide).map_err(|_| CodecError::MalformedVarint { position })
            }
        }
    )*};
}

impl_var_uint!(u8, u16, u32, u64);
impl_var_int!(i8, i16, i32, i64);

#[derive(Default, Clone, Copy)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Target = bool;

    fn wire_type(&self) -> WireType {
        WireType::VarInt
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &bool,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::VarInt)?;
        w.write_varint_u64(u64::from(*value))
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<bool> {
        wire::expect_wire(header, WireType::VarInt, r)?;
        session.reader_refs.next_field_id();
        let position = r.position();
        match r.read_varint_u64()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::MalformedVarint { position }),
        }
    }
}

#[derive(Default, Clone, Copy)]
pub struct CharCodec;

impl Codec for CharCodec {
    type Target = char;

    fn wire_type(&self) -> WireType {
        WireType::VarInt
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &char,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::VarInt)?;
        w.write_varint_u64(u64::from(u32::from(*value)))
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<char> {
        wire::expect_wire(header, WireType::VarInt, r)?;
        session.reader_refs.next_field_id();
        let position = r.position();
        let value = u32::try_from(r.read_varint_u64()?)
            .map_err(|_| CodecError::MalformedVarint { position })?;
        char::from_u32(value).ok_or(CodecError::InvalidChar { value })
    }
}

#[derive(Default, Clone, Copy)]
pub struct F32Codec;

impl Codec for F32Codec {
    type Target = f32;

    fn wire_type(&self) -> WireType {
        WireType::Fixed32
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &f32,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::Fixed32)?;
        w.write_fixed32(value.to_bits())
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<f32> {
        wire::expect_wire(header, WireType::Fixed32, r)?;
        session.reader_refs.next_field_id();
        Ok(f32::from_bits(u32::from_le_bytes(r.read_array::<4>()?)))
    }
}

#[derive(Default, Clone, Copy)]
pub struct F64Codec;

impl Codec for F64Codec {
    type Target = f64;

    fn wire_type(&self) -> WireType {
        WireType::Fixed64
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &f64,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::Fixed64)?;
        w.write_fixed64(value.to_bits())
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<f64> {
        wire::expect_wire(header, WireType::Fixed64, r)?;
        session.reader_refs.next_field_id();
        Ok(f64::from_bits(u64::from_le_bytes(r.read_array::<8>()?)))
    }
}

#[derive(Default, Clone, Copy)]
pub struct U128Codec;

impl Codec for U128Codec {
    type Target = u128;

    fn wire_type(&self) -> WireType {
        WireType::Fixed128
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &u128,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::Fixed128)?;
        w.write_fixed128(*value)
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<u128> {
        wire::expect_wire(header, WireType::Fixed128, r)?;
        session.reader_refs.next_field_id();
        Ok(u128::from_le_bytes(r.read_array::<16>()?))
    }
}

#[derive(Default, Clone, Copy)]
pub struct I128Codec;

impl Codec for I128Codec {
    type Target = i128;

    fn wire_type(&self) -> WireType {
        WireType::Fixed128
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &i128,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::Fixed128)?;
        w.write_fixed128(*value as u128)
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<i128> {
        wire::expect_wire(header, WireType::Fixed128, r)?;
        session.reader_refs.next_field_id();
        Ok(i128::from_le_bytes(r.read_array::<16>()?))
    }
}

#[derive(Default, Clone, Copy)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Target = String;

    fn wire_type(&self) -> WireType {
        WireType::LengthPrefixed
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &String,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::LengthPrefixed)?;
        w.write_varint_u32(value.len() as u32)?;
        w.write_bytes(value.as_bytes())
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<String> {
        wire::expect_wire(header, WireType::LengthPrefixed, r)?;
        session.reader_refs.next_field_id();
        let len = r.read_varint_u32()? as usize;
        let position = r.position();
        match r.read_bytes(len)? {
            Cow::Borrowed(slice) => std::str::from_utf8(slice)
                .map(str::to_owned)
                .map_err(|_| CodecError::InvalidUtf8 { position }),
            Cow::Owned(vec) => {
                String::from_utf8(vec).map_err(|_| CodecError::InvalidUtf8 { position })
            }
        }
    }
}

#[derive(Default, Clone, Copy)]
pub struct UnitCodec;

impl Codec for UnitCodec {
    type Target = ();

    fn wire_type(&self) -> WireType {
        WireType::VarInt
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        _value: &(),
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::VarInt)?;
        w.write_varint_u64(0)
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<()> {
        wire::expect_wire(header, WireType::VarInt, r)?;
        session.reader_refs.next_field_id();
        r.read_varint_u64()?;
        Ok(())
    }
}

/// `Duration` as Fixed128: seconds in the low 64 bits, subsecond
/// nanoseconds in the next 32. Lossless for the full `Duration` range.
#[derive(Default, Clone, Copy)]
pub struct DurationCodec;

impl Codec for DurationCodec {
    type Target = Duration;

    fn wire_type(&self) -> WireType {
        WireType::Fixed128
    }

    fn write(
        &self,
        w: &mut Writer<'_>,
        session: &mut SerializerSession,
        field_id: u32,
        value: &Duration,
    ) -> Result<()> {
        session.writer_refs.mark_value_field();
        w.write_expected_header(field_id, WireType::Fixed128)?;
        let packed = u128::from(value.as_secs()) | (u128::from(value.subsec_nanos()) << 64);
        w.write_fixed128(packed)
    }

    fn read(
        &self,
        r: &mut Reader<'_>,
        session: &mut SerializerSession,
        header: &FieldHeader,
    ) -> Result<Duration> {
        wire::expect_wire(header, WireType::Fixed128, r)?;
        session.reader_refs.next_field_id();
        let position = r.position();
        let packed = u128::from_le_bytes(r.read_array::<16>()?);
        let secs = packed as u64;
        let nanos = (packed >> 64) as u64;
        if (packed >> 96) != 0 || nanos >= 1_000_000_000 {
            return Err(CodecError::MalformedFixed { position });
        }
        Ok(Duration::new(secs, nanos as u32))
    }
}
