// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Self-healing cyclic IO client for OPC UA extension objects.
//!
//! This crate maintains one persistent client connection to an OPC UA server
//! and cyclically exchanges a single pair of structured blobs: one write
//! value pushed to the server, one read value pulled from it. Structure
//! layouts are discovered from the server's type system on every connect and
//! published as [`uabridge_codec::TypeNode`] trees for the codec.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       BridgeHandle                              │
//! │      (caller-facing blob access, stats, layout snapshots)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        IoBridge task                            │
//! │     (connection state machine, type discovery, cyclic IO)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     UaTransport (trait)                         │
//! │        (connect / iterate / read & write attribute)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use uabridge_client::{BridgeConfig, IoBridge};
//!
//! let config = BridgeConfig::builder()
//!     .endpoint("opc.tcp://10.10.2.27:4840")
//!     .namespace(4)
//!     .write_node("HostToPlc")
//!     .read_node("PlcToHost")
//!     .cycle_time(std::time::Duration::from_millis(100))
//!     .build()?;
//!
//! let handle = IoBridge::spawn(config, |cfg| MyTransport::new(cfg))?;
//!
//! // Exchange raw blobs once cyclic IO is running.
//! while !handle.is_cyclic_io_running() {
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//! }
//! let (inputs, status) = handle.get_inputs();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod buffers;
pub mod config;
pub mod discovery;
pub mod error;
pub mod machine;
pub mod stats;
pub mod transport;
pub mod types;

pub use buffers::SharedIo;
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use discovery::{read_structure_definition, resolve_cyclic_node, CyclicNode, MAX_NESTING};
pub use error::{BridgeError, BridgeResult, ConfigurationError, DiscoveryError};
pub use machine::{BridgeHandle, BridgeState, IoBridge};
pub use stats::BridgeStats;
pub use transport::{
    AttributeValue, ClientState, ExtensionObject, SecureChannelState, SessionState, StateCallback,
    StructureDefinition, StructureField, StructureType, UaTransport,
};
pub use types::{AttributeId, NodeClass, NodeId, NodeIdentifier, SecurityMode, UserToken};

pub use uabridge_core::{CancelToken, StatusCode, StructValue, Value};
