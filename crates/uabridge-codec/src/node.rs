// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The structural type tree and per-connection type cache.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::symbol::TypeInfo;

// =============================================================================
// TypeNode
// =============================================================================

/// One node of a structure layout tree.
///
/// The root node describes the structure itself; children describe its fields
/// in wire order (order is significant). Leaf nodes carry scalar kinds,
/// inner nodes nested structures.
///
/// No validation happens at construction time: a partially-built or empty
/// tree is a legal, non-fatal state that the codec reports as not
/// serializable.
///
/// # Examples
///
/// ```
/// use uabridge_codec::{ScalarKind, TypeInfo, TypeNode};
///
/// let mut root = TypeNode::with_info(TypeInfo::struct_fixed("plc_out", "PlcOutType"));
/// root.add_child(TypeInfo::scalar(ScalarKind::Int32, "counter", "Int32"), 0);
/// root.add_child(TypeInfo::scalar(ScalarKind::Float, "setpoint", "Float"), 4);
///
/// assert_eq!(root.children.len(), 2);
/// assert!(root.is_serializable());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeNode {
    /// This node's field metadata.
    pub info: TypeInfo,

    /// Child fields in wire order.
    pub children: Vec<TypeNode>,
}

impl TypeNode {
    /// Creates an empty, invalid node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node from the given field metadata.
    pub fn with_info(info: TypeInfo) -> Self {
        Self {
            info,
            children: Vec::new(),
        }
    }

    /// Replaces this node's own metadata.
    pub fn set(&mut self, info: TypeInfo) {
        self.info = info;
    }

    /// Appends a child field and returns a reference for recursive
    /// population.
    ///
    /// `offset` is the byte offset of the field within its parent; it is
    /// meaningful only for the presence-bitmask header and kept otherwise as
    /// a diagnostic.
    pub fn add_child(&mut self, mut info: TypeInfo, offset: u32) -> &mut TypeNode {
        if info.offset == 0 {
            info.offset = offset;
        }
        self.children.push(TypeNode::with_info(info));
        self.children.last_mut().expect("child just pushed")
    }

    /// Resets to an empty, invalid node.
    pub fn clear(&mut self) {
        self.info = TypeInfo::default();
        self.children.clear();
    }

    /// Returns `true` if the tree describes a resolved layout the codec can
    /// work against.
    #[inline]
    pub fn is_serializable(&self) -> bool {
        self.info.is_valid()
    }
}

// =============================================================================
// TypeDb
// =============================================================================

/// Per-connection cache of discovered structure layouts, keyed by type name.
///
/// Cleared on every reconnect that reaches the connected transition. Trees
/// are stored behind `Arc` and replaced wholesale, never mutated in place, so
/// caller threads can hold snapshots without locking.
#[derive(Debug, Clone, Default)]
pub struct TypeDb {
    types: HashMap<String, Arc<TypeNode>>,
}

impl TypeDb {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes all cached layouts.
    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Caches a layout under the given type name.
    pub fn insert(&mut self, name: impl Into<String>, node: Arc<TypeNode>) {
        self.types.insert(name.into(), node);
    }

    /// Looks up a cached layout by type name.
    pub fn get(&self, name: &str) -> Option<Arc<TypeNode>> {
        self.types.get(name).cloned()
    }

    /// Returns the number of cached layouts.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// =============================================================================
// Dump
// =============================================================================

/// Renders a layout tree as an indented multi-line string for diagnostics.
pub fn dump(node: &TypeNode) -> String {
    let mut out = String::new();
    dump_node(node, 0, &mut out);
    out
}

fn dump_node(node: &TypeNode, level: usize, out: &mut String) {
    let info = &node.info;
    let _ = writeln!(
        out,
        "{:indent$}[{}] {} ({}){}",
        "",
        level,
        info.item_name,
        info.type_name,
        if info.is_array { " []" } else { "" },
        indent = level * 4
    );
    for child in &node.children {
        if child.info.kind.is_struct() {
            dump_node(child, level + 1, out);
        } else {
            let _ = writeln!(
                out,
                "{:indent$}    {} ({}) len={}{}",
                "",
                child.info.item_name,
                child.info.type_name,
                child.info.data_size,
                if child.info.is_array { " []" } else { "" },
                indent = level * 4
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ScalarKind;

    fn sample_tree() -> TypeNode {
        let mut root = TypeNode::with_info(TypeInfo::struct_fixed("plc", "PlcType"));
        root.add_child(TypeInfo::scalar(ScalarKind::Int32, "counter", "Int32"), 0);
        let sub = root.add_child(TypeInfo::struct_fixed("inner", "InnerType"), 4);
        sub.add_child(TypeInfo::scalar(ScalarKind::Boolean, "flag", "Boolean"), 4);
        root
    }

    #[test]
    fn test_add_child_returns_reference() {
        let tree = sample_tree();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[1].children.len(), 1);
        assert_eq!(tree.children[1].children[0].info.item_name, "flag");
    }

    #[test]
    fn test_clear() {
        let mut tree = sample_tree();
        assert!(tree.is_serializable());

        tree.clear();
        assert!(!tree.is_serializable());
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_type_db() {
        let mut db = TypeDb::new();
        assert!(db.is_empty());

        db.insert("PlcType", Arc::new(sample_tree()));
        assert_eq!(db.len(), 1);
        assert!(db.get("PlcType").is_some());
        assert!(db.get("Other").is_none());

        db.clear();
        assert!(db.is_empty());
    }

    #[test]
    fn test_dump_contains_fields() {
        let text = dump(&sample_tree());
        assert!(text.contains("plc"));
        assert!(text.contains("counter"));
        assert!(text.contains("flag"));
    }
}
