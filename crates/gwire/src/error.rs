// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the serialization engine.
//!
//! Three families, all fatal to the current operation and reported
//! synchronously to the caller:
//!
//! - **Format** -- malformed or truncated input, unresolved or duplicate
//!   references, wire-type mismatches. Raised on decode only.
//! - **Resolution** -- no codec could be found or adapted for a requested
//!   type. Raised on first use and cached (a registration bug, not a
//!   transient condition).
//! - **Capacity** -- an output sink could not satisfy a window request.
//!   Signals a sink implementation defect.
//!
//! Unknown fields are explicitly *not* an error; they are skipped by wire
//! type to preserve forward compatibility.

use crate::wire::WireType;
use std::fmt;

/// Error raised by encode/decode operations and codec resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the value was complete.
    Truncated { position: usize },
    /// A tag byte that does not decode to a known header.
    InvalidHeader { position: usize, byte: u8 },
    /// A varint whose length prefix or magnitude is out of range.
    MalformedVarint { position: usize },
    /// A fixed-width payload whose bit pattern is not a valid value.
    MalformedFixed { position: usize },
    /// The decode path expected one wire type and found another.
    UnexpectedWireType {
        expected: WireType,
        found: WireType,
        position: usize,
    },
    /// A back-reference to an id that has not been defined yet.
    UnresolvedReference { id: u32 },
    /// A back-reference to an id that was consumed by a value-typed field.
    ///
    /// Value-typed fields advance the reference counter for numbering
    /// symmetry but are never resolvable targets; pointing at one is a
    /// checked decode error rather than undefined behavior.
    ValueFieldReference { id: u32 },
    /// Two objects were recorded under the same reference id.
    DuplicateReference { id: u32 },
    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8 { position: usize },
    /// A varint char value outside the Unicode scalar range.
    InvalidChar { value: u32 },
    /// An encoded type name whose hash does not match its bytes.
    TypeHashMismatch { name: String },
    /// A well-known type id outside the fixed table.
    UnknownWellKnown { id: u32 },
    /// A session type-reference index that was never recorded.
    UnknownTypeReference { index: u32 },
    /// A map entry missing its key or value field.
    MissingField { field_id: u32 },

    /// No codec is registered or constructible for the requested type.
    NoCodec { type_name: String },
    /// An adapted codec was handed a value of the wrong runtime type.
    CodecTypeMismatch { expected: &'static str },
    /// A polymorphic field carried a type identity with no registration.
    UnknownPolymorphicType { name: String },

    /// The output sink could not produce a window of the requested size.
    Capacity { requested: usize, available: usize },
}

impl CodecError {
    /// True for malformed-input errors (family a).
    pub fn is_format(&self) -> bool {
        !self.is_resolution() && !self.is_capacity()
    }

    /// True for codec-resolution errors (family b).
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            CodecError::NoCodec { .. }
                | CodecError::CodecTypeMismatch { .. }
                | CodecError::UnknownPolymorphicType { .. }
        )
    }

    /// True for sink-capacity errors (family c).
    pub fn is_capacity(&self) -> bool {
        matches!(self, CodecError::Capacity { .. })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated { position } => {
                write!(f, "input truncated at position {}", position)
            }
            CodecError::InvalidHeader { position, byte } => {
                write!(f, "invalid header byte {:#04x} at position {}", byte, position)
            }
            CodecError::MalformedVarint { position } => {
                write!(f, "malformed varint at position {}", position)
            }
            CodecError::MalformedFixed { position } => {
                write!(f, "malformed fixed-width payload at position {}", position)
            }
            CodecError::UnexpectedWireType {
                expected,
                found,
                position,
            } => write!(
                f,
                "expected wire type {:?}, found {:?} at position {}",
                expected, found, position
            ),
            CodecError::UnresolvedReference { id } => {
                write!(f, "unresolved reference id {}", id)
            }
            CodecError::ValueFieldReference { id } => {
                write!(f, "reference id {} points at a value-typed field", id)
            }
            CodecError::DuplicateReference { id } => {
                write!(f, "duplicate definition for reference id {}", id)
            }
            CodecError::InvalidUtf8 { position } => {
                write!(f, "invalid UTF-8 in string at position {}", position)
            }
            CodecError::InvalidChar { value } => {
                write!(f, "value {:#x} is not a Unicode scalar", value)
            }
            CodecError::TypeHashMismatch { name } => {
                write!(f, "type hash mismatch for encoded name {:?}", name)
            }
            CodecError::UnknownWellKnown { id } => {
                write!(f, "unknown well-known type id {}", id)
            }
            CodecError::UnknownTypeReference { index } => {
                write!(f, "type reference index {} was never recorded", index)
            }
            CodecError::MissingField { field_id } => {
                write!(f, "required field {} missing from composite", field_id)
            }
            CodecError::NoCodec { type_name } => {
                write!(f, "no codec available for type {}", type_name)
            }
            CodecError::CodecTypeMismatch { expected } => {
                write!(f, "codec adapted for {} received a different type", expected)
            }
            CodecError::UnknownPolymorphicType { name } => {
                write!(f, "no polymorphic registration for type {:?}", name)
            }
            CodecError::Capacity {
                requested,
                available,
            } => write!(
                f,
                "sink cannot provide a {}-byte window ({} available)",
                requested, available
            ),
        }
    }
}

impl std::error::Error for CodecError {}

pub type Result<T> = core::result::Result<T, CodecError>;
