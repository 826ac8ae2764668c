// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Field-level type metadata.
//!
//! [`TypeInfo`] describes one field of a discovered structure: its semantic
//! kind, array-ness, sizing and naming. A field is exactly one of
//! {scalar, struct}; array-ness is orthogonal and only 1-D dynamic arrays
//! (length-prefixed by a leading 32-bit count) are supported by the codec.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ScalarKind
// =============================================================================

/// Semantic kind of a scalar (non-struct) field.
///
/// Mirrors the OPC UA built-in types the discovery layer can map, plus the
/// fixed-length string variant some vendors declare. Not every kind is
/// supported by the codec, see [`ScalarKind::is_codec_supported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Boolean, one byte on the wire.
    Boolean,

    /// Signed 8-bit integer.
    SByte,

    /// Unsigned 8-bit integer.
    Byte,

    /// Signed 16-bit integer.
    Int16,

    /// Unsigned 16-bit integer.
    UInt16,

    /// Signed 32-bit integer.
    Int32,

    /// Unsigned 32-bit integer.
    UInt32,

    /// Signed 64-bit integer.
    Int64,

    /// Unsigned 64-bit integer.
    UInt64,

    /// 32-bit IEEE 754 float.
    Float,

    /// 64-bit IEEE 754 double.
    Double,

    /// String with a leading 32-bit byte count, no terminator.
    String,

    /// Fixed-length string padded to its declared size.
    FixedString,

    /// Date and time (64-bit tick count).
    DateTime,

    /// 16-byte GUID.
    Guid,

    /// Byte string with a leading 32-bit byte count.
    ByteString,
}

impl ScalarKind {
    /// Returns the fixed wire size in bytes, or `None` for variable-length
    /// kinds.
    pub const fn wire_size(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::SByte | Self::Byte => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float => Some(4),
            Self::Int64 | Self::UInt64 | Self::Double | Self::DateTime => Some(8),
            Self::Guid => Some(16),
            Self::String | Self::FixedString | Self::ByteString => None,
        }
    }

    /// Returns `true` if the codec implements this kind.
    ///
    /// The unsupported kinds are discoverable (so layouts containing them can
    /// still be introspected) but encoding or decoding one fails, identically
    /// on both directions.
    pub const fn is_codec_supported(&self) -> bool {
        !matches!(
            self,
            Self::FixedString | Self::DateTime | Self::Guid | Self::Int64 | Self::UInt64
        )
    }

    /// Stable numeric code used in type-definition introspection output.
    pub const fn code(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::Byte => 2,
            Self::SByte => 3,
            Self::UInt16 => 4,
            Self::Int16 => 5,
            Self::UInt32 => 6,
            Self::Int32 => 7,
            Self::UInt64 => 8,
            Self::Int64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::FixedString => 13,
            Self::DateTime => 14,
            Self::Guid => 15,
            Self::ByteString => 16,
        }
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::FixedString => "FixedString",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// StructKind
// =============================================================================

/// Wire variant of a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    /// All fields always present, no header.
    Fixed,

    /// Prefixed by a 32-bit bitmask whose low N bits each flag one field
    /// present on the wire.
    OptionalFields,
}

impl StructKind {
    /// Stable numeric code used in type-definition introspection output.
    pub const fn code(&self) -> u32 {
        match self {
            Self::Fixed => 1,
            Self::OptionalFields => 2,
        }
    }
}

// =============================================================================
// TypeKind
// =============================================================================

/// Classification of a field: scalar, struct, or not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Unpopulated or failed-to-resolve field. Invalid for codec use.
    #[default]
    Undefined,

    /// A primitive value.
    Scalar(ScalarKind),

    /// A nested structure.
    Struct(StructKind),
}

impl TypeKind {
    /// Returns `true` if the kind has been resolved.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// Returns `true` if this is a structure.
    #[inline]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    /// Returns the scalar kind, if any.
    #[inline]
    pub const fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(k) => Some(*k),
            _ => None,
        }
    }
}

// =============================================================================
// TypeInfo
// =============================================================================

/// Metadata for one field of a structure layout.
///
/// Built by type discovery and read by the codec. Lifecycle: constructed once
/// per connection, read-only afterward, replaced wholesale on reconnect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Semantic kind of the field.
    pub kind: TypeKind,

    /// Field name (for the root node: the variable's configured name).
    pub item_name: String,

    /// Declared type name (for the root node: the structure's OPC UA type
    /// name as reported by its default encoding id).
    pub type_name: String,

    /// `true` if the field is a 1-D dynamic array on the wire.
    pub is_array: bool,

    /// Declared value rank (1 = one dimension; the codec supports only 1).
    pub value_rank: i32,

    /// Declared per-dimension maximum sizes, when the server reports them.
    /// The first entry is the ceiling for encoded element counts.
    pub array_dimensions: Vec<u32>,

    /// Fixed wire size in bytes, 0 for variable-length kinds.
    pub data_size: u32,

    /// Byte offset reserved ahead of the fields. Non-zero only for
    /// structures with optional fields, where it covers the 4-byte presence
    /// bitmask.
    pub offset: u32,

    /// `true` if the server marked this field optional.
    pub is_optional: bool,
}

impl TypeInfo {
    /// Creates a scalar field description.
    ///
    /// The wire size is derived from the kind; variable-length kinds record
    /// a size of 0.
    pub fn scalar(kind: ScalarKind, item_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Scalar(kind),
            item_name: item_name.into(),
            type_name: type_name.into(),
            data_size: kind.wire_size().unwrap_or(0) as u32,
            ..Default::default()
        }
    }

    /// Creates a fixed structure description (no presence header).
    pub fn struct_fixed(item_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Struct(StructKind::Fixed),
            item_name: item_name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Creates a structure-with-optional-fields description.
    ///
    /// Reserves the leading 4-byte presence bitmask in [`TypeInfo::offset`].
    pub fn struct_with_optional_fields(
        item_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: TypeKind::Struct(StructKind::OptionalFields),
            item_name: item_name.into(),
            type_name: type_name.into(),
            offset: 4,
            ..Default::default()
        }
    }

    /// Marks the field as a 1-D dynamic array.
    pub fn into_array(mut self, value_rank: i32, dimensions: Vec<u32>) -> Self {
        self.is_array = true;
        self.value_rank = value_rank;
        self.array_dimensions = dimensions;
        self
    }

    /// Returns `true` if the field kind has been resolved.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind.is_valid()
    }

    /// Raw type id for introspection output.
    ///
    /// Bit 0 flags arrays, bit 1 flags structs, the remaining bits carry the
    /// kind code.
    pub fn type_id(&self) -> u32 {
        let code = match self.kind {
            TypeKind::Undefined => 0,
            TypeKind::Scalar(k) => k.code(),
            TypeKind::Struct(k) => k.code(),
        };
        (code << 2) | (u32::from(self.kind.is_struct()) << 1) | u32::from(self.is_array)
    }

    /// Raw flags for introspection output.
    ///
    /// Bit 0: field is optional; bit 1: the layout reserves a leading header
    /// (presence bitmask).
    pub fn flags(&self) -> u32 {
        u32::from(self.is_optional)
            | (u32::from(matches!(self.kind, TypeKind::Struct(StructKind::OptionalFields))) << 1)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sizes() {
        assert_eq!(ScalarKind::Boolean.wire_size(), Some(1));
        assert_eq!(ScalarKind::UInt16.wire_size(), Some(2));
        assert_eq!(ScalarKind::Float.wire_size(), Some(4));
        assert_eq!(ScalarKind::Double.wire_size(), Some(8));
        assert_eq!(ScalarKind::Guid.wire_size(), Some(16));
        assert_eq!(ScalarKind::String.wire_size(), None);
    }

    #[test]
    fn test_codec_support() {
        assert!(ScalarKind::UInt32.is_codec_supported());
        assert!(ScalarKind::ByteString.is_codec_supported());
        assert!(!ScalarKind::Int64.is_codec_supported());
        assert!(!ScalarKind::UInt64.is_codec_supported());
        assert!(!ScalarKind::Guid.is_codec_supported());
        assert!(!ScalarKind::DateTime.is_codec_supported());
        assert!(!ScalarKind::FixedString.is_codec_supported());
    }

    #[test]
    fn test_scalar_info() {
        let info = TypeInfo::scalar(ScalarKind::Int32, "counter", "Int32");
        assert!(info.is_valid());
        assert_eq!(info.data_size, 4);
        assert!(!info.is_array);
        assert_eq!(info.type_id() & 0b11, 0);
    }

    #[test]
    fn test_struct_info() {
        let fixed = TypeInfo::struct_fixed("machine", "MachineType");
        assert_eq!(fixed.offset, 0);
        assert_eq!(fixed.flags(), 0);
        assert_eq!(fixed.type_id() & 0b10, 0b10);

        let opt = TypeInfo::struct_with_optional_fields("machine", "MachineType");
        assert_eq!(opt.offset, 4);
        assert_eq!(opt.flags(), 0b10);
    }

    #[test]
    fn test_array_info() {
        let info = TypeInfo::scalar(ScalarKind::Byte, "payload", "Byte").into_array(1, vec![10]);
        assert!(info.is_array);
        assert_eq!(info.array_dimensions, vec![10]);
        assert_eq!(info.type_id() & 0b01, 0b01);
    }

    #[test]
    fn test_default_is_invalid() {
        let info = TypeInfo::default();
        assert!(!info.is_valid());
        assert_eq!(info.type_id(), 0);
    }
}
