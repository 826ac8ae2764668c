// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge error types.
//!
//! Three fault domains:
//!
//! - **Configuration**: invalid settings, rejected eagerly before the IO
//!   task starts.
//! - **Discovery**: the remote type system could not be resolved; treated as
//!   a connection-level fault by the state machine (a connection whose types
//!   cannot be discovered cannot run cyclic IO).
//! - **Status**: an opaque remote status code from the transport.
//!
//! Transport faults during cyclic IO never surface as errors to callers;
//! they drive the retry ladder and are visible through status snapshots.

use std::time::Duration;

use thiserror::Error;

use uabridge_core::StatusCode;

/// Result alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

// =============================================================================
// BridgeError
// =============================================================================

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid configuration.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Type discovery failed.
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    /// A transport operation failed with the given status.
    #[error("transport operation failed with status {0}")]
    Status(StatusCode),

    /// Cyclic IO has not reached the running state.
    #[error("cyclic IO is not running")]
    NotRunning,
}

impl BridgeError {
    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(error: DiscoveryError) -> Self {
        Self::Discovery(error)
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required field is missing.
    #[error("missing required configuration field '{0}'")]
    MissingField(&'static str),

    /// The endpoint URL is not usable.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A node id string could not be parsed.
    #[error("invalid node id '{node_id}': {reason}")]
    InvalidNodeId {
        /// The rejected node id string.
        node_id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The cycle time must be greater than zero.
    #[error("invalid cycle time {0:?}: must be greater than zero")]
    InvalidCycleTime(Duration),

    /// An unknown security mode name.
    #[error("invalid security mode '{0}'")]
    InvalidSecurityMode(String),

    /// Inconsistent security settings.
    #[error("invalid security configuration: {0}")]
    InvalidSecurity(String),
}

impl ConfigurationError {
    /// Creates a missing-field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    /// Creates an invalid-endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-node-id error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-security-mode error.
    pub fn invalid_security_mode(mode: impl Into<String>) -> Self {
        Self::InvalidSecurityMode(mode.into())
    }

    /// Creates an invalid-security error.
    pub fn invalid_security(reason: impl Into<String>) -> Self {
        Self::InvalidSecurity(reason.into())
    }
}

// =============================================================================
// DiscoveryError
// =============================================================================

/// Failure while resolving a cyclic node or its structure layout.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A remote attribute read failed.
    #[error("reading {context} failed with status {status}")]
    Status {
        /// What was being read (node name and attribute).
        context: String,
        /// The remote status code.
        status: StatusCode,
    },

    /// A field declares a namespace-0 numeric type the mapping table does
    /// not know. Guessing the layout would be unsafe, so discovery aborts.
    #[error("field '{field}' has unknown built-in data type {numeric}")]
    UnknownBuiltinType {
        /// Field name.
        field: String,
        /// Numeric type id.
        numeric: u32,
    },

    /// A field declares a vendor-namespace numeric type outside the known
    /// table.
    #[error("field '{field}' has unknown vendor data type {numeric}")]
    UnknownVendorType {
        /// Field name.
        field: String,
        /// Numeric type id.
        numeric: u32,
    },

    /// A field's data type identifier kind cannot be resolved (GUID or
    /// opaque type ids, or numeric ids in an unexpected namespace).
    #[error("field '{field}' has unresolvable data type identifier {node_id}")]
    UnsupportedIdentifier {
        /// Field name.
        field: String,
        /// The unresolvable type id.
        node_id: String,
    },

    /// The structure variant is not supported (unions).
    #[error("structure '{0}' has an unsupported structure type")]
    UnsupportedStructure(String),

    /// Nested structures exceed the deliberate recursion bound.
    #[error("structure '{name}' nests deeper than {limit} levels")]
    TooDeep {
        /// Structure name at the bound.
        name: String,
        /// The configured bound.
        limit: usize,
    },

    /// The attribute read returned a value of an unexpected shape.
    #[error("reading {context} returned an unexpected value kind")]
    UnexpectedValue {
        /// What was being read.
        context: String,
    },
}

impl DiscoveryError {
    /// Creates a status error with context.
    pub fn status(context: impl Into<String>, status: StatusCode) -> Self {
        Self::Status {
            context: context.into(),
            status,
        }
    }

    /// Maps this error to the status code the state machine records.
    ///
    /// Remote failures keep their original code (severity classification
    /// included); local classification failures map to fixed bad codes.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            Self::UnknownBuiltinType { .. }
            | Self::UnknownVendorType { .. }
            | Self::UnsupportedIdentifier { .. }
            | Self::UnsupportedStructure(_)
            | Self::TooDeep { .. } => StatusCode::BAD_DATA_TYPE_ID_UNKNOWN,
            Self::UnexpectedValue { .. } => StatusCode::BAD_TYPE_MISMATCH,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_status_mapping() {
        let err = DiscoveryError::status("node 'X' value", StatusCode::BAD_TIMEOUT);
        assert_eq!(err.status_code(), StatusCode::BAD_TIMEOUT);

        let err = DiscoveryError::UnknownVendorType {
            field: "f".into(),
            numeric: 3999,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_DATA_TYPE_ID_UNKNOWN);
        assert!(err.status_code().is_severe());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::configuration(ConfigurationError::missing_field("endpoint"));
        assert!(err.to_string().contains("endpoint"));

        let err = BridgeError::Status(StatusCode::BAD_CONNECTION_CLOSED);
        assert!(err.to_string().contains("80AE0000"));
    }
}
