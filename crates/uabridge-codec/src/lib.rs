// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Structural type model and binary codec for OPC UA extension-object blobs.
//!
//! Structure layouts are discovered at runtime from the server's type system
//! and captured as a [`TypeNode`] tree. This crate converts between raw
//! extension-object bodies and the generic [`uabridge_core::Value`] tree,
//! driven entirely by that layout description:
//!
//! - [`decode`]: raw bytes → structured value
//! - [`encode`]: structured value → raw bytes
//! - [`type_definition`]: layout introspection without a live connection
//!
//! The type tree is the sole source of truth. The encoder is deliberately
//! lenient about the caller-provided value (missing or mistyped fields encode
//! as kind-appropriate defaults), while an invalid or unsupported layout is a
//! hard per-call error.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

mod decode;
mod encode;
pub mod error;
pub mod node;
pub mod symbol;
mod typedef;

pub use decode::decode;
pub use encode::encode;
pub use error::{CodecError, CodecResult};
pub use node::{dump, TypeDb, TypeNode};
pub use symbol::{ScalarKind, StructKind, TypeInfo, TypeKind};
pub use typedef::type_definition;
