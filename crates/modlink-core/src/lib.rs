// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-core
//!
//! Core abstractions and shared types for the ModLink Modbus/OPC UA bridge.
//!
//! This crate provides everything the protocol crates and the engine agree on:
//!
//! - **Model**: `Device`, `Tag`, `TagValue` and the register/data type enums
//! - **Codec**: pure conversions between Modbus register words and typed values
//! - **Store**: the authoritative in-memory tag value store
//! - **Bus**: the write command channel between the address space and the engine
//! - **Facade**: the address-space seam the engine publishes through
//! - **Error**: the unified error hierarchy
//!
//! ## Example
//!
//! ```rust
//! use modlink_core::codec;
//! use modlink_core::model::{TagDataType, TagValue};
//!
//! let words = codec::encode(&TagValue::Float(3.14), TagDataType::Float).unwrap();
//! let value = codec::decode(&words, TagDataType::Float).unwrap();
//! assert_eq!(value, TagValue::Float(3.14));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bus;
pub mod codec;
pub mod error;
pub mod facade;
pub mod model;
pub mod store;

pub use bus::{write_channel, WriteCommand, WriteHandle, WriteReceiver};
pub use error::{BridgeError, BridgeResult};
pub use facade::{AddressSpaceFacade, NullAddressSpace};
pub use model::{
    Device, DeviceId, RegisterClass, SerialParity, Tag, TagDataType, TagValue, Transport,
};
pub use store::{DeviceValues, TagReading, TagState, TagStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
