// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime type discovery.
//!
//! After every connect the bridge resolves its two cyclic nodes and rebuilds
//! their structure layouts from the server's type system. Discovery is
//! build-then-publish: a fully constructed [`CyclicNode`] is returned by
//! value and swapped into the published snapshot only on success, so a
//! partially-failed discovery never corrupts a previously-working layout.
//!
//! Any attribute-read failure aborts discovery and surfaces the remote
//! status; the state machine treats that as a connection-level fault.
//! Unknown numeric type codes abort as well; silently guessing a layout
//! would put garbage on the wire.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info, warn};

use uabridge_codec::{ScalarKind, TypeInfo, TypeNode};

use crate::error::DiscoveryError;
use crate::transport::{StructureType, UaTransport};
use crate::types::{AttributeId, NodeId, NodeIdentifier};

/// Maximum nesting depth for recursive structure discovery.
///
/// A self-referential or runaway remote type definition fails discovery at
/// this bound instead of exhausting the stack. The wire format itself caps
/// optional fields at 32 per structure, which makes 32 a natural ceiling.
pub const MAX_NESTING: usize = 32;

// =============================================================================
// CyclicNode
// =============================================================================

/// Per-direction binding of one cyclic node, produced by discovery.
#[derive(Debug, Clone)]
pub struct CyclicNode {
    /// Namespace index the node names live in.
    pub namespace: u16,

    /// Configured node name.
    pub name: String,

    /// Configured fixed encoding node name, if any.
    pub encoding_name: Option<String>,

    /// Resolved variable node id (read/write target).
    pub node_id: NodeId,

    /// Resolved data type node id.
    pub data_type_id: NodeId,

    /// Resolved fixed encoding node id, when an encoding name is configured.
    pub encoding_id: Option<NodeId>,

    /// The encoding id reported by the initial extension-object read; the
    /// default wire type tag for outgoing writes.
    pub expanded_type_id: NodeId,

    /// The initial value blob read at discovery time. Its length sizes the
    /// exchange; the blob itself seeds the IO buffers so the first write
    /// carries a layout-correct value.
    pub initial_value: Vec<u8>,

    /// The discovered structure layout.
    pub symbols: TypeNode,
}

impl CyclicNode {
    /// The type id outgoing extension objects are tagged with.
    ///
    /// The explicitly-configured encoding id wins over the dynamic one;
    /// some target environments require a fixed encoding identity.
    pub fn wire_type_id(&self) -> &NodeId {
        self.encoding_id.as_ref().unwrap_or(&self.expanded_type_id)
    }

    /// Length of the initial value read at discovery time.
    pub fn initial_len(&self) -> usize {
        self.initial_value.len()
    }
}

// =============================================================================
// Scalar mapping tables
// =============================================================================

/// Maps a namespace-0 numeric id to a scalar kind and its OPC UA type name.
fn builtin_scalar(numeric: u32) -> Option<(ScalarKind, &'static str)> {
    let mapped = match numeric {
        1 => (ScalarKind::Boolean, "Boolean"),
        2 => (ScalarKind::SByte, "SByte"),
        3 => (ScalarKind::Byte, "Byte"),
        4 => (ScalarKind::Int16, "Int16"),
        5 => (ScalarKind::UInt16, "UInt16"),
        6 => (ScalarKind::Int32, "Int32"),
        7 => (ScalarKind::UInt32, "UInt32"),
        8 => (ScalarKind::Int64, "Int64"),
        9 => (ScalarKind::UInt64, "UInt64"),
        10 => (ScalarKind::Float, "Float"),
        11 => (ScalarKind::Double, "Double"),
        12 => (ScalarKind::String, "String"),
        13 => (ScalarKind::DateTime, "DateTime"),
        14 => (ScalarKind::Guid, "GUID"),
        15 => (ScalarKind::ByteString, "BYTESTRING"),
        _ => return None,
    };
    Some(mapped)
}

/// Maps a namespace-3 vendor numeric id to a scalar kind and its IEC name.
///
/// Some controllers expose IEC 61131 elementary types under non-standard
/// numeric ids in namespace 3 instead of aliasing the built-ins.
fn vendor_scalar(numeric: u32) -> Option<(ScalarKind, &'static str)> {
    let mapped = match numeric {
        3001 => (ScalarKind::Byte, "BYTE"),
        3002 => (ScalarKind::UInt16, "WORD"),
        3003 => (ScalarKind::UInt32, "DWORD"),
        3004 => (ScalarKind::UInt64, "LWORD"),
        3014 => (ScalarKind::String, "STRING"),
        _ => return None,
    };
    Some(mapped)
}

/// Vendor namespace carrying the numeric ids of [`vendor_scalar`].
const VENDOR_NAMESPACE: u16 = 3;

// =============================================================================
// Structure discovery
// =============================================================================

/// Reads the structure definition of `data_type` and builds its layout tree.
///
/// Recurses into string-identified nested structure types, bounded by
/// [`MAX_NESTING`]. Array-ness (value rank ≥ 1) is recorded on the field but
/// does not change recursion.
///
/// # Errors
///
/// Fails on any remote read failure, unknown numeric type code, union
/// structure, unresolvable identifier kind, or when the nesting bound is
/// exceeded.
pub fn read_structure_definition<'a, T: UaTransport>(
    transport: &'a mut T,
    data_type: &'a NodeId,
    name: &'a str,
    level: usize,
) -> Pin<Box<dyn Future<Output = Result<TypeNode, DiscoveryError>> + Send + 'a>> {
    Box::pin(async move {
        if level > MAX_NESTING {
            return Err(DiscoveryError::TooDeep {
                name: name.to_string(),
                limit: MAX_NESTING,
            });
        }

        let definition = transport
            .read_attribute(data_type, AttributeId::DataTypeDefinition)
            .await
            .map_err(|status| {
                DiscoveryError::status(format!("structure definition of '{}'", name), status)
            })?
            .into_structure_definition()
            .ok_or_else(|| DiscoveryError::UnexpectedValue {
                context: format!("structure definition of '{}'", name),
            })?;

        let type_name = definition
            .default_encoding_id
            .as_string()
            .unwrap_or_default()
            .to_string();

        let mut root = TypeNode::new();
        let (root_info, header) = match definition.structure_type {
            StructureType::Structure => (TypeInfo::struct_fixed(name, &type_name), 0),
            StructureType::StructureWithOptionalFields => {
                (TypeInfo::struct_with_optional_fields(name, &type_name), 4)
            }
            StructureType::Union => {
                return Err(DiscoveryError::UnsupportedStructure(name.to_string()));
            }
        };
        root.set(root_info);

        debug!(
            name = name,
            type_name = %type_name,
            fields = definition.fields.len(),
            level = level,
            "structure definition resolved"
        );

        let mut offset = header;
        for field in &definition.fields {
            let array = if field.value_rank >= 1 {
                Some((field.value_rank, field.array_dimensions.clone()))
            } else {
                None
            };

            match (&field.data_type.identifier, field.data_type.namespace_index) {
                (NodeIdentifier::Numeric(numeric), 0) => {
                    let (kind, iec_name) = builtin_scalar(*numeric).ok_or_else(|| {
                        DiscoveryError::UnknownBuiltinType {
                            field: field.name.clone(),
                            numeric: *numeric,
                        }
                    })?;
                    let mut info = TypeInfo::scalar(kind, &field.name, iec_name);
                    info.is_optional = field.is_optional;
                    if let Some((rank, dims)) = array {
                        info = info.into_array(rank, dims);
                    }
                    debug!(
                        field = %field.name,
                        numeric = numeric,
                        kind = %kind,
                        optional = field.is_optional,
                        rank = field.value_rank,
                        "built-in field"
                    );
                    let size = info.data_size;
                    root.add_child(info, offset);
                    offset += size;
                }
                (NodeIdentifier::Numeric(numeric), VENDOR_NAMESPACE) => {
                    let (kind, iec_name) = vendor_scalar(*numeric).ok_or_else(|| {
                        DiscoveryError::UnknownVendorType {
                            field: field.name.clone(),
                            numeric: *numeric,
                        }
                    })?;
                    let mut info = TypeInfo::scalar(kind, &field.name, iec_name);
                    info.is_optional = field.is_optional;
                    if let Some((rank, dims)) = array {
                        info = info.into_array(rank, dims);
                    }
                    debug!(
                        field = %field.name,
                        numeric = numeric,
                        kind = %kind,
                        vendor = iec_name,
                        "vendor field"
                    );
                    let size = info.data_size;
                    root.add_child(info, offset);
                    offset += size;
                }
                (NodeIdentifier::String(_), _) => {
                    // Nested structure, recurse into its own definition.
                    let mut sub = read_structure_definition(
                        transport,
                        &field.data_type,
                        &field.name,
                        level + 1,
                    )
                    .await?;
                    sub.info.is_optional = field.is_optional;
                    if let Some((rank, dims)) = array {
                        sub.info = sub.info.into_array(rank, dims);
                    }
                    root.children.push(sub);
                }
                _ => {
                    return Err(DiscoveryError::UnsupportedIdentifier {
                        field: field.name.clone(),
                        node_id: field.data_type.to_opc_string(),
                    });
                }
            }
        }

        Ok(root)
    })
}

// =============================================================================
// Cyclic node resolution
// =============================================================================

/// Resolves one configured cyclic node into a fully-populated binding.
///
/// Performs the initial transactions in order: node-id resolution, data-type
/// read, node-class read, initial extension-object value read (capturing the
/// expanded encoding id and the blob), structure-definition discovery, and
/// finally the optional fixed-encoding-node resolution.
///
/// # Errors
///
/// Aborts on the first failing step with the remote status attached.
pub async fn resolve_cyclic_node<T: UaTransport>(
    transport: &mut T,
    namespace: u16,
    name: &str,
    encoding_name: Option<&str>,
) -> Result<CyclicNode, DiscoveryError> {
    let by_name = NodeId::string(namespace, name);

    let node_id = transport
        .read_attribute(&by_name, AttributeId::NodeId)
        .await
        .map_err(|status| DiscoveryError::status(format!("node id of '{}'", name), status))?
        .into_node_id()
        .ok_or_else(|| DiscoveryError::UnexpectedValue {
            context: format!("node id of '{}'", name),
        })?;
    debug!(name = name, node_id = %node_id, "node id resolved");

    let data_type_id = transport
        .read_attribute(&node_id, AttributeId::DataType)
        .await
        .map_err(|status| DiscoveryError::status(format!("data type of '{}'", name), status))?
        .into_node_id()
        .ok_or_else(|| DiscoveryError::UnexpectedValue {
            context: format!("data type of '{}'", name),
        })?;

    let node_class = transport
        .read_attribute(&node_id, AttributeId::NodeClass)
        .await
        .map_err(|status| DiscoveryError::status(format!("node class of '{}'", name), status))?;
    debug!(name = name, data_type = %data_type_id, class = ?node_class, "attributes resolved");

    let initial = transport
        .read_attribute(&node_id, AttributeId::Value)
        .await
        .map_err(|status| DiscoveryError::status(format!("initial value of '{}'", name), status))?
        .into_extension_object()
        .ok_or_else(|| DiscoveryError::UnexpectedValue {
            context: format!("initial value of '{}'", name),
        })?;
    debug!(
        name = name,
        bytes = initial.body.len(),
        expanded = %initial.type_id,
        "initial value read"
    );

    let symbols = read_structure_definition(transport, &data_type_id, name, 0).await?;

    let encoding_id = match encoding_name {
        Some(encoding) => {
            let id = transport
                .read_attribute(&NodeId::string(namespace, encoding), AttributeId::NodeId)
                .await
                .map_err(|status| {
                    DiscoveryError::status(
                        format!("encoding node '{}' of '{}'", encoding, name),
                        status,
                    )
                })?
                .into_node_id()
                .ok_or_else(|| DiscoveryError::UnexpectedValue {
                    context: format!("encoding node '{}' of '{}'", encoding, name),
                })?;
            debug!(name = name, encoding = %id, "fixed encoding node resolved");
            Some(id)
        }
        None => None,
    };

    info!(
        name = name,
        node_id = %node_id,
        size = initial.body.len(),
        "cyclic node fully resolved"
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        debug!(layout = %uabridge_codec::dump(&symbols), "discovered layout");
    }

    if initial.body.is_empty() {
        warn!(name = name, "initial value is empty, exchange size unknown");
    }

    Ok(CyclicNode {
        namespace,
        name: name.to_string(),
        encoding_name: encoding_name.map(str::to_string),
        node_id,
        data_type_id,
        encoding_id,
        expanded_type_id: initial.type_id,
        initial_value: initial.body,
        symbols,
    })
}

// =============================================================================
// Tests
// =============================================================================
