// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Tree-driven encoding of extension-object bodies.
//!
//! The layout tree is trusted; the caller-provided value is not. Missing or
//! mistyped fields encode as kind-appropriate defaults (zero, false, empty
//! string) instead of failing the whole encode.

use uabridge_core::Value;

use crate::error::{CodecError, CodecResult};
use crate::node::TypeNode;
use crate::symbol::{ScalarKind, StructKind, TypeInfo, TypeKind};

/// Encodes a structured value into a raw extension-object body.
///
/// Arrays are capped at the declared maximum dimension: only
/// `min(declared_max, actual_len)` elements are written, and that same value
/// is written as the leading 32-bit count (the server-side maximum is a
/// ceiling, not a fixed size).
///
/// For structures with optional fields the presence bitmask is written with
/// every declared field flagged present. At least one vendor implementation
/// disputes the exact bit-count semantics of this header; confirm against the
/// target server before relying on partially-present fields.
///
/// # Errors
///
/// Fails if the tree is invalid or references an unsupported scalar kind,
/// the same kinds that fail decoding.
pub fn encode(node: &TypeNode, value: &Value) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    encode_struct(node, Some(value), &mut out)?;
    Ok(out)
}

fn encode_struct(node: &TypeNode, value: Option<&Value>, out: &mut Vec<u8>) -> CodecResult<()> {
    let info = &node.info;
    if !info.is_valid() {
        return Err(CodecError::NotSerializable(info.item_name.clone()));
    }

    if matches!(info.kind, TypeKind::Struct(StructKind::OptionalFields)) {
        out.extend_from_slice(&presence_mask(node.children.len()).to_le_bytes());
    }

    let fields = value.and_then(Value::as_struct);
    for child in &node.children {
        let ci = &child.info;
        let field_value = fields.and_then(|s| s.get(&ci.item_name));

        if ci.is_array {
            if ci.value_rank > 1 {
                return Err(CodecError::UnsupportedRank {
                    field: ci.item_name.clone(),
                    rank: ci.value_rank,
                });
            }
            let items = field_value.and_then(Value::as_array).unwrap_or(&[]);
            let declared = ci.array_dimensions.first().copied().unwrap_or(u32::MAX) as usize;
            let count = items.len().min(declared);

            out.extend_from_slice(&(count as u32).to_le_bytes());
            for item in &items[..count] {
                encode_field(child, Some(item), out)?;
            }
        } else {
            encode_field(child, field_value, out)?;
        }
    }
    Ok(())
}

fn encode_field(child: &TypeNode, value: Option<&Value>, out: &mut Vec<u8>) -> CodecResult<()> {
    if child.info.kind.is_struct() {
        encode_struct(child, value, out)
    } else {
        encode_scalar(&child.info, value, out)
    }
}

fn encode_scalar(info: &TypeInfo, value: Option<&Value>, out: &mut Vec<u8>) -> CodecResult<()> {
    let kind = match info.kind.as_scalar() {
        Some(kind) => kind,
        None => return Err(CodecError::NotSerializable(info.item_name.clone())),
    };

    let int = || value.and_then(Value::as_i64).unwrap_or(0);
    let float = || value.and_then(Value::as_f64).unwrap_or(0.0);

    match kind {
        ScalarKind::Boolean => out.push(u8::from(value.and_then(Value::as_bool).unwrap_or(false))),
        ScalarKind::SByte => out.push(int() as i8 as u8),
        ScalarKind::Byte => out.push(int() as u8),
        ScalarKind::Int16 => out.extend_from_slice(&(int() as i16).to_le_bytes()),
        ScalarKind::UInt16 => out.extend_from_slice(&(int() as u16).to_le_bytes()),
        ScalarKind::Int32 => out.extend_from_slice(&(int() as i32).to_le_bytes()),
        ScalarKind::UInt32 => out.extend_from_slice(&(int() as u32).to_le_bytes()),
        ScalarKind::Float => out.extend_from_slice(&(float() as f32).to_le_bytes()),
        ScalarKind::Double => out.extend_from_slice(&float().to_le_bytes()),
        ScalarKind::String | ScalarKind::ByteString => {
            let bytes = value.and_then(Value::as_bytes).unwrap_or(&[]);
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }
        unsupported => {
            return Err(CodecError::UnsupportedKind {
                kind: unsupported,
                field: info.item_name.clone(),
            })
        }
    }
    Ok(())
}

/// Presence bitmask with the low `count` bits set.
///
/// 31 or more declared fields saturate to all ones (a single 32-bit header
/// cannot flag more).
fn presence_mask(count: usize) -> u32 {
    if count >= 31 {
        0xFFFF_FFFF
    } else {
        (1u32 << count) - 1
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::symbol::TypeInfo;
    use uabridge_core::StructValue;

    fn scalar_tree(kind: ScalarKind) -> TypeNode {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(TypeInfo::scalar(kind, "v", kind.name()), 0);
        root
    }

    fn single(value: Value) -> Value {
        let mut s = StructValue::new();
        s.insert("v", value);
        Value::Struct(s)
    }

    #[test]
    fn test_scalar_round_trip() {
        let cases = vec![
            (ScalarKind::Boolean, Value::Bool(true)),
            (ScalarKind::SByte, Value::SByte(-12)),
            (ScalarKind::Byte, Value::Byte(200)),
            (ScalarKind::Int16, Value::Int16(-30000)),
            (ScalarKind::UInt16, Value::UInt16(60000)),
            (ScalarKind::Int32, Value::Int32(-123456)),
            (ScalarKind::UInt32, Value::UInt32(3_000_000_000)),
            (ScalarKind::Float, Value::Float(1.25)),
            (ScalarKind::Double, Value::Double(-2.5e10)),
            (ScalarKind::String, Value::String("servus".into())),
            (ScalarKind::ByteString, Value::Bytes(vec![1, 2, 3, 0, 255])),
        ];
        for (kind, value) in cases {
            let tree = scalar_tree(kind);
            let encoded = encode(&tree, &single(value.clone())).unwrap();
            let decoded = decode(&tree, &encoded).unwrap();
            assert_eq!(decoded.field("v"), Some(&value), "kind {}", kind);
        }
    }

    #[test]
    fn test_unsupported_kinds_fail_symmetrically() {
        for kind in [
            ScalarKind::Int64,
            ScalarKind::UInt64,
            ScalarKind::DateTime,
            ScalarKind::Guid,
            ScalarKind::FixedString,
        ] {
            let tree = scalar_tree(kind);
            let enc = encode(&tree, &single(Value::Null)).unwrap_err();
            let dec = decode(&tree, &[0u8; 16]).unwrap_err();
            assert!(matches!(enc, CodecError::UnsupportedKind { .. }), "{}", kind);
            assert!(matches!(dec, CodecError::UnsupportedKind { .. }), "{}", kind);
        }
    }

    #[test]
    fn test_missing_fields_encode_as_defaults() {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(TypeInfo::scalar(ScalarKind::Int32, "a", "Int32"), 0);
        root.add_child(TypeInfo::scalar(ScalarKind::Boolean, "b", "Boolean"), 4);
        root.add_child(TypeInfo::scalar(ScalarKind::String, "c", "String"), 5);

        let encoded = encode(&root, &Value::Struct(StructValue::new())).unwrap();
        // 4 (int32 zero) + 1 (false) + 4 (empty string count)
        assert_eq!(encoded, vec![0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_mistyped_field_is_coerced() {
        let tree = scalar_tree(ScalarKind::UInt16);
        let encoded = encode(&tree, &single(Value::Double(300.0))).unwrap();
        assert_eq!(encoded, 300u16.to_le_bytes());

        // A value the kind cannot represent falls back to the default.
        let encoded = encode(&tree, &single(Value::String("nope".into()))).unwrap();
        assert_eq!(encoded, 0u16.to_le_bytes());
    }

    #[test]
    fn test_array_truncated_to_declared_maximum() {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(
            TypeInfo::scalar(ScalarKind::Byte, "data", "Byte").into_array(1, vec![3]),
            0,
        );

        let mut s = StructValue::new();
        s.insert(
            "data",
            Value::Array(vec![
                Value::Byte(1),
                Value::Byte(2),
                Value::Byte(3),
                Value::Byte(4),
                Value::Byte(5),
            ]),
        );
        let encoded = encode(&root, &Value::Struct(s)).unwrap();
        assert_eq!(encoded, vec![3, 0, 0, 0, 1, 2, 3]);

        let decoded = decode(&root, &encoded).unwrap();
        assert_eq!(
            decoded.field("data").and_then(Value::as_array).map(<[Value]>::len),
            Some(3)
        );
    }

    #[test]
    fn test_struct_array_scenario_eleven_bytes() {
        // int32 + uint8 array (max 10, 3 actual) = 4 + 4 + 3 bytes.
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(TypeInfo::scalar(ScalarKind::Int32, "id", "Int32"), 0);
        root.add_child(
            TypeInfo::scalar(ScalarKind::Byte, "payload", "Byte").into_array(1, vec![10]),
            4,
        );

        let mut s = StructValue::new();
        s.insert("id", Value::Int32(0x0102_0304));
        s.insert(
            "payload",
            Value::Array(vec![Value::Byte(9), Value::Byte(8), Value::Byte(7)]),
        );
        let original = Value::Struct(s);

        let encoded = encode(&root, &original).unwrap();
        assert_eq!(encoded.len(), 11);

        let decoded = decode(&root, &encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_optional_fields_mask() {
        assert_eq!(presence_mask(0), 0);
        assert_eq!(presence_mask(2), 0b11);
        assert_eq!(presence_mask(30), 0x3FFF_FFFF);
        assert_eq!(presence_mask(31), 0xFFFF_FFFF);
        assert_eq!(presence_mask(40), 0xFFFF_FFFF);

        let mut root =
            TypeNode::with_info(TypeInfo::struct_with_optional_fields("root", "RootType"));
        root.add_child(TypeInfo::scalar(ScalarKind::Byte, "a", "Byte"), 4);
        root.add_child(TypeInfo::scalar(ScalarKind::Byte, "b", "Byte"), 5);

        let encoded = encode(&root, &Value::Struct(StructValue::new())).unwrap();
        assert_eq!(&encoded[..4], &0b11u32.to_le_bytes());
        assert_eq!(encoded.len(), 6);
    }

    #[test]
    fn test_nested_struct_round_trip() {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(TypeInfo::scalar(ScalarKind::UInt32, "seq", "UInt32"), 0);
        let inner = root.add_child(TypeInfo::struct_fixed("axis", "AxisType"), 4);
        inner.add_child(TypeInfo::scalar(ScalarKind::Float, "position", "Float"), 4);
        inner.add_child(TypeInfo::scalar(ScalarKind::Boolean, "homed", "Boolean"), 8);

        let mut axis = StructValue::new();
        axis.insert("position", Value::Float(12.5));
        axis.insert("homed", Value::Bool(true));
        let mut s = StructValue::new();
        s.insert("seq", Value::UInt32(77));
        s.insert("axis", Value::Struct(axis));
        let original = Value::Struct(s);

        let encoded = encode(&root, &original).unwrap();
        assert_eq!(encoded.len(), 4 + 4 + 1);
        assert_eq!(decode(&root, &encoded).unwrap(), original);
    }

    #[test]
    fn test_encode_decode_encode_is_stable() {
        // encode(decode(buffer)) reproduces the buffer byte for byte when the
        // buffer itself came from encode with full-length arrays.
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(
            TypeInfo::scalar(ScalarKind::UInt16, "words", "UInt16").into_array(1, vec![2]),
            0,
        );
        root.add_child(TypeInfo::scalar(ScalarKind::String, "label", "String"), 0);

        let mut s = StructValue::new();
        s.insert(
            "words",
            Value::Array(vec![Value::UInt16(10), Value::UInt16(20)]),
        );
        s.insert("label", Value::String("ok".into()));

        let first = encode(&root, &Value::Struct(s)).unwrap();
        let second = encode(&root, &decode(&root, &first).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
