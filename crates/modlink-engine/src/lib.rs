// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-engine
//!
//! The device-integration engine. The [`Engine`] owns the tag store, the
//! Modbus client pool, the modem route table and the pollers, and exposes
//! the admin operations the HTTP layer and the OPC UA setters converge on:
//! add device, remove device, write tag.
//!
//! All writes go through one path: resolve and check writability, coerce
//! the value, perform the Modbus write, then update the tag store and
//! republish to the address space while still holding the device's
//! transaction lock.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod engine;

pub use engine::Engine;
