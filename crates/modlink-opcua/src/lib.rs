// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-opcua
//!
//! The OPC UA half of the bridge: server construction and the
//! address-space bridge that mirrors the tag store into OPC UA variables.
//!
//! The `opcua` crate's session and subscription machinery is consumed as-is;
//! this crate only populates the address space. Each device becomes a folder
//! under `Objects/ModbusDevices`, each tag a variable whose getter reads the
//! tag store on every access and whose setter feeds the engine's write path.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bridge;
pub mod server;

pub use bridge::AddressSpaceBridge;
pub use server::{build_server, spawn_server};
