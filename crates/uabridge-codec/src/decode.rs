// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Tree-driven decoding of extension-object bodies.
//!
//! The layout tree is walked depth-first; the cursor advances by exactly the
//! bytes each field consumes. All multi-byte values are little-endian.

use uabridge_core::{StructValue, Value};

use crate::error::{CodecError, CodecResult};
use crate::node::TypeNode;
use crate::symbol::{ScalarKind, StructKind, TypeInfo, TypeKind};

/// Decodes a raw extension-object body into a structured value.
///
/// The tree is the sole source of truth; the caller must supply a buffer at
/// least as large as the initial-read length discovered for the node. A
/// truncated buffer yields [`CodecError::BufferExhausted`].
///
/// For structures with optional fields the 4-byte presence bitmask is
/// skipped without interpreting individual bits; every declared field is
/// assumed present on the wire. Confirm against the target server before
/// relying on partially-present values.
///
/// # Errors
///
/// Fails if the tree is invalid, references an unsupported scalar kind, or
/// the buffer is shorter than the layout requires.
pub fn decode(node: &TypeNode, buf: &[u8]) -> CodecResult<Value> {
    let mut reader = Reader::new(buf);
    let fields = decode_struct(node, &mut reader)?;
    Ok(Value::Struct(fields))
}

fn decode_struct(node: &TypeNode, r: &mut Reader<'_>) -> CodecResult<StructValue> {
    let info = &node.info;
    if !info.is_valid() {
        return Err(CodecError::NotSerializable(info.item_name.clone()));
    }

    if matches!(info.kind, TypeKind::Struct(StructKind::OptionalFields)) {
        // Presence bitmask: skipped, all fields treated as present.
        let _bits = r.read_u32(&info.item_name)?;
    }

    let mut out = StructValue::with_capacity(node.children.len());
    for child in &node.children {
        let ci = &child.info;
        if ci.is_array {
            if ci.value_rank > 1 {
                return Err(CodecError::UnsupportedRank {
                    field: ci.item_name.clone(),
                    rank: ci.value_rank,
                });
            }
            let count = r.read_u32(&ci.item_name)? as usize;
            let mut items = Vec::new();
            for _ in 0..count {
                items.push(decode_field(child, r)?);
            }
            out.insert(&ci.item_name, Value::Array(items));
        } else {
            out.insert(&ci.item_name, decode_field(child, r)?);
        }
    }
    Ok(out)
}

fn decode_field(child: &TypeNode, r: &mut Reader<'_>) -> CodecResult<Value> {
    if child.info.kind.is_struct() {
        Ok(Value::Struct(decode_struct(child, r)?))
    } else {
        decode_scalar(&child.info, r)
    }
}

fn decode_scalar(info: &TypeInfo, r: &mut Reader<'_>) -> CodecResult<Value> {
    let kind = match info.kind.as_scalar() {
        Some(kind) => kind,
        None => return Err(CodecError::NotSerializable(info.item_name.clone())),
    };
    let field = info.item_name.as_str();

    let value = match kind {
        ScalarKind::Boolean => Value::Bool(r.read_u8(field)? != 0),
        ScalarKind::SByte => Value::SByte(r.read_u8(field)? as i8),
        ScalarKind::Byte => Value::Byte(r.read_u8(field)?),
        ScalarKind::Int16 => Value::Int16(i16::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::UInt16 => Value::UInt16(u16::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::Int32 => Value::Int32(i32::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::UInt32 => Value::UInt32(u32::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::Float => Value::Float(f32::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::Double => Value::Double(f64::from_le_bytes(r.take_fixed(field)?)),
        ScalarKind::String => {
            let len = r.read_u32(field)? as usize;
            let bytes = r.take(len, field)?;
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ScalarKind::ByteString => {
            let len = r.read_u32(field)? as usize;
            Value::Bytes(r.take(len, field)?.to_vec())
        }
        unsupported => {
            return Err(CodecError::UnsupportedKind {
                kind: unsupported,
                field: field.to_string(),
            })
        }
    };
    Ok(value)
}

// =============================================================================
// Reader
// =============================================================================

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, field: &str) -> CodecResult<&'a [u8]> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(CodecError::BufferExhausted {
                field: field.to_string(),
                needed: n,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_fixed<const N: usize>(&mut self, field: &str) -> CodecResult<[u8; N]> {
        let slice = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_u8(&mut self, field: &str) -> CodecResult<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn read_u32(&mut self, field: &str) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.take_fixed(field)?))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::TypeInfo;

    fn scalar_tree(kind: ScalarKind) -> TypeNode {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(TypeInfo::scalar(kind, "v", kind.name()), 0);
        root
    }

    #[test]
    fn test_decode_scalars() {
        let tree = scalar_tree(ScalarKind::Int32);
        let decoded = decode(&tree, &(-7i32).to_le_bytes()).unwrap();
        assert_eq!(decoded.field("v"), Some(&Value::Int32(-7)));

        let tree = scalar_tree(ScalarKind::Double);
        let decoded = decode(&tree, &2.5f64.to_le_bytes()).unwrap();
        assert_eq!(decoded.field("v"), Some(&Value::Double(2.5)));
    }

    #[test]
    fn test_decode_string() {
        let tree = scalar_tree(ScalarKind::String);
        let mut buf = 5u32.to_le_bytes().to_vec();
        buf.extend_from_slice(b"hello");
        let decoded = decode(&tree, &buf).unwrap();
        assert_eq!(decoded.field("v"), Some(&Value::String("hello".into())));
    }

    #[test]
    fn test_decode_truncated_buffer() {
        let tree = scalar_tree(ScalarKind::UInt32);
        let err = decode(&tree, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::BufferExhausted { needed: 4, remaining: 2, .. }
        ));
    }

    #[test]
    fn test_decode_unsupported_kind() {
        let tree = scalar_tree(ScalarKind::Guid);
        let err = decode(&tree, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKind { kind: ScalarKind::Guid, .. }));
    }

    #[test]
    fn test_decode_invalid_tree() {
        let tree = TypeNode::new();
        assert!(matches!(decode(&tree, &[]), Err(CodecError::NotSerializable(_))));
    }

    #[test]
    fn test_decode_optional_fields_header_skipped() {
        let mut root =
            TypeNode::with_info(TypeInfo::struct_with_optional_fields("root", "RootType"));
        root.add_child(TypeInfo::scalar(ScalarKind::Byte, "b", "Byte"), 4);

        // Header bits are not interpreted, only skipped.
        let buf = [0xAA, 0xBB, 0xCC, 0xDD, 0x2A];
        let decoded = decode(&root, &buf).unwrap();
        assert_eq!(decoded.field("b"), Some(&Value::Byte(0x2A)));
    }

    #[test]
    fn test_decode_rank_above_one_fails() {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("root", "RootType"));
        root.add_child(
            TypeInfo::scalar(ScalarKind::Byte, "m", "Byte").into_array(2, vec![4, 4]),
            0,
        );
        let err = decode(&root, &0u32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedRank { rank: 2, .. }));
    }
}
