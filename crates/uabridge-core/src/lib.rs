// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types for the uabridge OPC UA IO bridge.
//!
//! This crate provides the protocol-agnostic leaf types shared by the codec
//! and client crates:
//!
//! - [`StatusCode`]: opaque OPC UA status code with good/severe classification
//! - [`Value`]/[`StructValue`]: generic structured value tree exchanged with
//!   the embedding scripting layer
//! - [`CancelToken`]: cooperative shutdown flag observed by the IO task

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod status;
pub mod value;

pub use cancel::CancelToken;
pub use status::StatusCode;
pub use value::{StructValue, Value};
