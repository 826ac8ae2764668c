// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport capability abstraction.
//!
//! The bridge does not implement the OPC UA session protocol itself; it
//! requires a transport collaborator providing connect/iterate/read/write
//! primitives, each reporting an opaque [`StatusCode`]. This keeps the state
//! machine testable against scripted transports and the protocol stack
//! swappable.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use uabridge_core::StatusCode;

use crate::types::{AttributeId, NodeClass, NodeId, UserToken};

// =============================================================================
// SecureChannelState / SessionState
// =============================================================================

/// State of the transport's secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecureChannelState {
    /// Channel is closed.
    #[default]
    Closed,

    /// Channel establishment is in progress.
    Connecting,

    /// Channel is open.
    Open,

    /// Channel is being torn down.
    Closing,
}

impl SecureChannelState {
    /// Returns `true` if the channel is fully closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SecureChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// State of the transport's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    #[default]
    Closed,

    /// Session created but not activated.
    Created,

    /// Session is active.
    Activated,

    /// Session is being closed.
    Closing,
}

impl SessionState {
    /// Returns `true` if no session exists.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Created => write!(f, "Created"),
            Self::Activated => write!(f, "Activated"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

// =============================================================================
// ClientState
// =============================================================================

/// Snapshot of the transport's own state triple, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClientState {
    /// Secure channel state.
    pub channel: SecureChannelState,

    /// Session state.
    pub session: SessionState,

    /// Last connect status reported by the transport.
    pub status: StatusCode,
}

impl ClientState {
    /// Returns `true` if both channel and session report closed.
    #[inline]
    pub fn is_fully_closed(&self) -> bool {
        self.channel.is_closed() && self.session.is_closed()
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chn={}, ses={}, status={}",
            self.channel, self.session, self.status
        )
    }
}

/// Callback invoked by the transport on connection state changes.
pub type StateCallback = Box<dyn Fn(ClientState) + Send + Sync>;

// =============================================================================
// ExtensionObject
// =============================================================================

/// An encoded extension object: a type tag plus the raw encoded body.
///
/// The bridge never interprets the body on the cyclic path; decoding happens
/// off-path through the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionObject {
    /// The binary-encoding type id the body is tagged with.
    pub type_id: NodeId,

    /// The raw encoded body.
    pub body: Vec<u8>,
}

impl ExtensionObject {
    /// Creates an extension object.
    pub fn new(type_id: NodeId, body: Vec<u8>) -> Self {
        Self { type_id, body }
    }
}

// =============================================================================
// StructureDefinition
// =============================================================================

/// Wire variant of a remote structure definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    /// All fields mandatory, no header.
    Structure,

    /// Leading 32-bit presence bitmask, up to 32 optional fields.
    StructureWithOptionalFields,

    /// Discriminated union (not supported by the bridge).
    Union,
}

/// One field of a remote structure definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureField {
    /// Field name.
    pub name: String,

    /// Declared data type id of the field.
    pub data_type: NodeId,

    /// Value rank (negative = scalar, 1 = one dimension, >1 = more).
    pub value_rank: i32,

    /// Declared maximum array dimensions, when reported.
    pub array_dimensions: Vec<u32>,

    /// `true` if the server marks the field optional.
    pub is_optional: bool,
}

impl StructureField {
    /// Creates a scalar field description.
    pub fn scalar(name: impl Into<String>, data_type: NodeId) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank: -1,
            array_dimensions: Vec::new(),
            is_optional: false,
        }
    }

    /// Creates a 1-D array field description with the given maximum size.
    pub fn array(name: impl Into<String>, data_type: NodeId, max_len: u32) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank: 1,
            array_dimensions: vec![max_len],
            is_optional: false,
        }
    }
}

/// A remote structure definition as read from the type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// Structure wire variant.
    pub structure_type: StructureType,

    /// The default binary encoding node id; its string identifier doubles as
    /// the structure's type name.
    pub default_encoding_id: NodeId,

    /// Fields in wire order.
    pub fields: Vec<StructureField>,
}

// =============================================================================
// AttributeValue
// =============================================================================

/// Typed result of an attribute read.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A node id (from NodeId or DataType attribute reads).
    NodeId(NodeId),

    /// A node class.
    NodeClass(NodeClass),

    /// An extension-object value.
    Value(ExtensionObject),

    /// A structure definition.
    DataTypeDefinition(StructureDefinition),
}

impl AttributeValue {
    /// Returns the node id, if this is one.
    pub fn into_node_id(self) -> Option<NodeId> {
        match self {
            Self::NodeId(id) => Some(id),
            _ => None,
        }
    }

    /// Returns the extension object, if this is one.
    pub fn into_extension_object(self) -> Option<ExtensionObject> {
        match self {
            Self::Value(eo) => Some(eo),
            _ => None,
        }
    }

    /// Returns the structure definition, if this is one.
    pub fn into_structure_definition(self) -> Option<StructureDefinition> {
        match self {
            Self::DataTypeDefinition(def) => Some(def),
            _ => None,
        }
    }
}

// =============================================================================
// UaTransport Trait
// =============================================================================

/// Capability contract the bridge requires from an OPC UA client stack.
///
/// All remote operations report an opaque [`StatusCode`]; the bridge only
/// distinguishes good from not-good and the severe top-bit class. The bridge
/// task owns its transport exclusively, so operations take `&mut self`.
///
/// # Thread Safety
///
/// Implementations must be `Send` so the bridge task can run on any runtime
/// worker.
#[async_trait]
pub trait UaTransport: Send {
    /// Establishes the connection: TCP, secure channel and session,
    /// anonymous or with the given credentials.
    ///
    /// Blocking from the machine's point of view; runs to completion or to
    /// the transport-level timeout.
    async fn connect(&mut self, endpoint: &str, token: &UserToken) -> StatusCode;

    /// Closes session and secure channel.
    async fn disconnect(&mut self) -> StatusCode;

    /// Drives the transport's internal state machine for at most `timeout`,
    /// returning the current connect status.
    async fn run_iterate(&mut self, timeout: Duration) -> StatusCode;

    /// Reads one attribute of one node.
    async fn read_attribute(
        &mut self,
        node: &NodeId,
        attribute: AttributeId,
    ) -> Result<AttributeValue, StatusCode>;

    /// Writes an extension-object value to a node.
    async fn write_attribute(&mut self, node: &NodeId, value: ExtensionObject) -> StatusCode;

    /// Returns the transport's state triple.
    fn state(&self) -> ClientState;

    /// Installs a connection state-change callback.
    ///
    /// Optional; the default keeps no callback.
    fn set_state_callback(&mut self, _callback: StateCallback) {}
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_state_closed() {
        let state = ClientState::default();
        assert!(state.is_fully_closed());

        let state = ClientState {
            channel: SecureChannelState::Open,
            session: SessionState::Activated,
            status: StatusCode::GOOD,
        };
        assert!(!state.is_fully_closed());
        assert_eq!(state.to_string(), "chn=Open, ses=Activated, status=00000000h");
    }

    #[test]
    fn test_attribute_value_accessors() {
        let id = NodeId::numeric(4, 99);
        assert_eq!(
            AttributeValue::NodeId(id.clone()).into_node_id(),
            Some(id.clone())
        );
        assert!(AttributeValue::NodeClass(NodeClass::Variable)
            .into_node_id()
            .is_none());

        let eo = ExtensionObject::new(id, vec![1, 2, 3]);
        assert_eq!(
            AttributeValue::Value(eo.clone()).into_extension_object(),
            Some(eo)
        );
    }

    #[test]
    fn test_structure_field_constructors() {
        let f = StructureField::scalar("counter", NodeId::numeric(0, 6));
        assert_eq!(f.value_rank, -1);
        assert!(f.array_dimensions.is_empty());

        let f = StructureField::array("payload", NodeId::numeric(0, 3), 10);
        assert_eq!(f.value_rank, 1);
        assert_eq!(f.array_dimensions, vec![10]);
    }
}
