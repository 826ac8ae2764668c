// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA status codes.
//!
//! The bridge treats status codes as opaque beyond a good/not-good check and
//! the severe-error discriminator. A severe status (top bit set) signals that
//! the remote client context is no longer safely reusable and must be
//! recreated rather than reconnected.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// StatusCode
// =============================================================================

/// An OPC UA status code.
///
/// Wraps the raw 32-bit code returned by the transport. The top two bits
/// carry the severity (00 = good, 01 = uncertain, 10/11 = bad).
///
/// # Examples
///
/// ```
/// use uabridge_core::StatusCode;
///
/// assert!(StatusCode::GOOD.is_good());
/// assert!(StatusCode::BAD_CONNECTION_CLOSED.is_severe());
/// assert!(!StatusCode::UNCERTAIN_INITIAL_VALUE.is_severe());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// The operation succeeded.
    pub const GOOD: StatusCode = StatusCode(0);

    /// An unexpected internal error occurred.
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);

    /// The requested node id was not found on the server.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);

    /// The referenced data type id is not known.
    pub const BAD_DATA_TYPE_ID_UNKNOWN: StatusCode = StatusCode(0x8011_0000);

    /// The received value could not be interpreted as an extension object.
    pub const BAD_ENCODING_ERROR: StatusCode = StatusCode(0x8006_0000);

    /// The value type does not match the expected type.
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);

    /// The secure channel or session was closed by the peer.
    pub const BAD_CONNECTION_CLOSED: StatusCode = StatusCode(0x80AE_0000);

    /// The operation timed out.
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);

    /// The value is an initial value that has not been refreshed yet.
    pub const UNCERTAIN_INITIAL_VALUE: StatusCode = StatusCode(0x4092_0000);

    /// Returns the raw 32-bit code.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the operation succeeded.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the status is uncertain (bit 30 set, bit 31 clear).
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0x4000_0000 != 0 && self.0 & 0x8000_0000 == 0
    }

    /// Returns `true` if the status signals a severe error (top bit set).
    ///
    /// After a severe error the client context must be discarded and
    /// recreated; reconnecting with the same context is unsafe.
    #[inline]
    pub const fn is_severe(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}h", self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

// =============================================================================
// Tests
// =============================================================================
