// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Codec error types.
//!
//! Codec failures are per-call results reported to the caller; they never
//! affect the cyclic IO exchange, which keeps moving raw bytes regardless.

use thiserror::Error;

use crate::symbol::ScalarKind;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors produced while encoding or decoding an extension-object body.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    /// The layout references a scalar kind the codec does not implement.
    ///
    /// Encoding and decoding fail identically for these kinds.
    #[error("scalar kind {kind} of field '{field}' is not supported")]
    UnsupportedKind {
        /// The offending kind.
        kind: ScalarKind,
        /// Name of the field that declared it.
        field: String,
    },

    /// The layout tree is invalid (discovery never resolved it).
    ///
    /// Raw IO remains available; only structured conversion is off.
    #[error("type description for '{0}' is not valid, cannot serialize")]
    NotSerializable(String),

    /// The buffer ended before the layout was fully consumed.
    ///
    /// Callers must supply a buffer at least as large as the initial-read
    /// length discovered for the node.
    #[error(
        "buffer exhausted while decoding field '{field}': needed {needed} bytes, {remaining} left"
    )]
    BufferExhausted {
        /// Field being decoded when the data ran out.
        field: String,
        /// Bytes required to continue.
        needed: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },

    /// The field declares more than one array dimension.
    ///
    /// Only 1-D dynamic arrays with a leading 32-bit count are supported.
    #[error("field '{field}' declares value rank {rank}, only 1-D arrays are supported")]
    UnsupportedRank {
        /// Name of the array field.
        field: String,
        /// Declared value rank.
        rank: i32,
    },
}
