// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge configuration.
//!
//! One configuration describes one connection: the endpoint, the two cyclic
//! nodes (write and read) with their optional fixed encoding names, the cycle
//! time, and the session security settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ConfigurationError};
use crate::types::{SecurityMode, UserToken};

// =============================================================================
// BridgeConfig
// =============================================================================

/// Configuration for one cyclic IO connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use uabridge_client::BridgeConfig;
///
/// let config = BridgeConfig::builder()
///     .endpoint("opc.tcp://10.10.2.27:4840")
///     .namespace(4)
///     .write_node("HostToPlc")
///     .read_node("PlcToHost")
///     .cycle_time(Duration::from_millis(100))
///     .build()
///     .unwrap();
///
/// assert!(config.user_token.is_anonymous());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Server endpoint URL (e.g. `opc.tcp://10.10.2.27:4840`).
    pub endpoint: String,

    /// Namespace index of the cyclic nodes.
    pub namespace: u16,

    /// Node name written to the server each cycle.
    pub write_node: String,

    /// Fixed encoding node name for writes. When set, outgoing extension
    /// objects are tagged with this node's id instead of the encoding id the
    /// server reported at discovery; some targets require it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_encoding: Option<String>,

    /// Node name read from the server each cycle.
    pub read_node: String,

    /// Fixed encoding node name for the read node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_encoding: Option<String>,

    /// Read/write cycle time. Must be greater than zero.
    #[serde(with = "humantime_serde")]
    pub cycle_time: Duration,

    /// Session authentication. Absence of credentials means anonymous.
    #[serde(default)]
    pub user_token: UserToken,

    /// Message security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Path to the client certificate (required unless security is off).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<String>,

    /// Path to the client private key (required unless security is off).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<String>,

    /// Paths of trusted server certificates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_list: Vec<String>,

    /// Transport-level connect/request timeout.
    #[serde(default = "default_timeout")]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Secure channel lifetime requested from the server.
    #[serde(default = "default_secure_channel_lifetime")]
    #[serde(with = "humantime_serde")]
    pub secure_channel_lifetime: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_secure_channel_lifetime() -> Duration {
    Duration::from_secs(10 * 60)
}

impl BridgeConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.endpoint.is_empty() {
            return Err(BridgeError::configuration(
                ConfigurationError::missing_field("endpoint"),
            ));
        }
        if !self.endpoint.starts_with("opc.tcp://") {
            return Err(BridgeError::configuration(
                ConfigurationError::invalid_endpoint(
                    &self.endpoint,
                    "endpoint must start with opc.tcp://",
                ),
            ));
        }
        if self.write_node.is_empty() {
            return Err(BridgeError::configuration(
                ConfigurationError::missing_field("write_node"),
            ));
        }
        if self.read_node.is_empty() {
            return Err(BridgeError::configuration(
                ConfigurationError::missing_field("read_node"),
            ));
        }
        if self.cycle_time.is_zero() {
            return Err(BridgeError::configuration(
                ConfigurationError::InvalidCycleTime(self.cycle_time),
            ));
        }
        if self.security_mode.requires_certificates() {
            if self.certificate_path.is_none() {
                return Err(BridgeError::configuration(
                    ConfigurationError::missing_field("certificate_path"),
                ));
            }
            if self.private_key_path.is_none() {
                return Err(BridgeError::configuration(
                    ConfigurationError::missing_field("private_key_path"),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// BridgeConfigBuilder
// =============================================================================

/// Builder for [`BridgeConfig`].
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    endpoint: Option<String>,
    namespace: Option<u16>,
    write_node: Option<String>,
    write_encoding: Option<String>,
    read_node: Option<String>,
    read_encoding: Option<String>,
    cycle_time: Option<Duration>,
    user_token: Option<UserToken>,
    security_mode: Option<SecurityMode>,
    certificate_path: Option<String>,
    private_key_path: Option<String>,
    trust_list: Vec<String>,
    timeout: Option<Duration>,
    secure_channel_lifetime: Option<Duration>,
}

impl BridgeConfigBuilder {
    /// Sets the server endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the namespace index of the cyclic nodes.
    pub fn namespace(mut self, namespace: u16) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Sets the write node name.
    pub fn write_node(mut self, name: impl Into<String>) -> Self {
        self.write_node = Some(name.into());
        self
    }

    /// Sets the fixed write encoding node name.
    pub fn write_encoding(mut self, name: impl Into<String>) -> Self {
        self.write_encoding = Some(name.into());
        self
    }

    /// Sets the read node name.
    pub fn read_node(mut self, name: impl Into<String>) -> Self {
        self.read_node = Some(name.into());
        self
    }

    /// Sets the fixed read encoding node name.
    pub fn read_encoding(mut self, name: impl Into<String>) -> Self {
        self.read_encoding = Some(name.into());
        self
    }

    /// Sets the cycle time.
    pub fn cycle_time(mut self, cycle_time: Duration) -> Self {
        self.cycle_time = Some(cycle_time);
        self
    }

    /// Sets username/password authentication.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_token = Some(UserToken::UserName {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets anonymous authentication.
    pub fn anonymous(mut self) -> Self {
        self.user_token = Some(UserToken::Anonymous);
        self
    }

    /// Sets the message security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = Some(mode);
        self
    }

    /// Sets the client certificate path.
    pub fn certificate_path(mut self, path: impl Into<String>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Sets the client private key path.
    pub fn private_key_path(mut self, path: impl Into<String>) -> Self {
        self.private_key_path = Some(path.into());
        self
    }

    /// Adds a trusted server certificate path.
    pub fn trust(mut self, path: impl Into<String>) -> Self {
        self.trust_list.push(path.into());
        self
    }

    /// Sets the transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the secure channel lifetime.
    pub fn secure_channel_lifetime(mut self, lifetime: Duration) -> Self {
        self.secure_channel_lifetime = Some(lifetime);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<BridgeConfig, BridgeError> {
        let config = BridgeConfig {
            endpoint: self.endpoint.ok_or_else(|| {
                BridgeError::configuration(ConfigurationError::missing_field("endpoint"))
            })?,
            namespace: self.namespace.unwrap_or(0),
            write_node: self.write_node.ok_or_else(|| {
                BridgeError::configuration(ConfigurationError::missing_field("write_node"))
            })?,
            write_encoding: self.write_encoding,
            read_node: self.read_node.ok_or_else(|| {
                BridgeError::configuration(ConfigurationError::missing_field("read_node"))
            })?,
            read_encoding: self.read_encoding,
            cycle_time: self.cycle_time.ok_or_else(|| {
                BridgeError::configuration(ConfigurationError::missing_field("cycle_time"))
            })?,
            user_token: self.user_token.unwrap_or_default(),
            security_mode: self.security_mode.unwrap_or_default(),
            certificate_path: self.certificate_path,
            private_key_path: self.private_key_path,
            trust_list: self.trust_list,
            timeout: self.timeout.unwrap_or_else(default_timeout),
            secure_channel_lifetime: self
                .secure_channel_lifetime
                .unwrap_or_else(default_secure_channel_lifetime),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
