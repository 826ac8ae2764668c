// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Layout introspection.
//!
//! Exposes a discovered structure layout as a structured value, so the
//! embedding scripting layer can enumerate available fields without a live
//! connection. Each field maps to a table carrying `_type`, `_typeid`,
//! `_flags` and `_offset` entries.

use uabridge_core::{StructValue, Value};

use crate::error::{CodecError, CodecResult};
use crate::node::TypeNode;
use crate::symbol::TypeInfo;

/// Returns the shape of a layout tree as a structured value.
///
/// # Errors
///
/// Fails with [`CodecError::NotSerializable`] if the tree was never resolved
/// (raw IO remains available in that case).
///
/// # Examples
///
/// ```
/// use uabridge_codec::{type_definition, ScalarKind, TypeInfo, TypeNode};
/// use uabridge_core::Value;
///
/// let mut root = TypeNode::with_info(TypeInfo::struct_fixed("plc", "PlcType"));
/// root.add_child(TypeInfo::scalar(ScalarKind::Int32, "counter", "Int32"), 0);
///
/// let def = type_definition(&root).unwrap();
/// let counter = def.field("counter").unwrap();
/// assert_eq!(counter.field("_type"), Some(&Value::String("Int32".into())));
/// ```
pub fn type_definition(node: &TypeNode) -> CodecResult<Value> {
    if !node.is_serializable() {
        return Err(CodecError::NotSerializable(node.info.item_name.clone()));
    }
    Ok(Value::Struct(describe(node)))
}

fn describe(node: &TypeNode) -> StructValue {
    let mut out = StructValue::with_capacity(node.children.len() + 4);
    push_meta(&node.info, &mut out);

    for child in &node.children {
        if child.info.kind.is_struct() {
            out.insert(&child.info.item_name, Value::Struct(describe(child)));
        } else {
            let mut field = StructValue::with_capacity(4);
            push_meta(&child.info, &mut field);
            out.insert(&child.info.item_name, Value::Struct(field));
        }
    }
    out
}

fn push_meta(info: &TypeInfo, out: &mut StructValue) {
    if !info.is_valid() {
        return;
    }
    let type_name = if info.type_name.is_empty() {
        // The root usually has no separate type name, it names a type itself.
        &info.item_name
    } else {
        &info.type_name
    };
    out.insert("_type", Value::String(type_name.clone()));
    out.insert("_typeid", Value::UInt32(info.type_id()));
    out.insert("_flags", Value::UInt32(info.flags()));
    out.insert("_offset", Value::UInt32(info.offset));
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ScalarKind;

    #[test]
    fn test_type_definition_shape() {
        let mut root =
            TypeNode::with_info(TypeInfo::struct_with_optional_fields("plc", "PlcType"));
        root.add_child(TypeInfo::scalar(ScalarKind::UInt32, "counter", "DWORD"), 4);
        let sub = root.add_child(TypeInfo::struct_fixed("axis", "AxisType"), 8);
        sub.add_child(TypeInfo::scalar(ScalarKind::Float, "position", "Float"), 8);

        let def = type_definition(&root).unwrap();
        assert_eq!(def.field("_type"), Some(&Value::String("PlcType".into())));
        assert_eq!(def.field("_offset"), Some(&Value::UInt32(4)));

        let counter = def.field("counter").unwrap();
        assert_eq!(counter.field("_type"), Some(&Value::String("DWORD".into())));

        let axis = def.field("axis").unwrap();
        assert!(axis.field("position").is_some());
    }

    #[test]
    fn test_invalid_tree_is_error() {
        let node = TypeNode::new();
        assert!(matches!(
            type_definition(&node),
            Err(CodecError::NotSerializable(_))
        ));
    }
}
