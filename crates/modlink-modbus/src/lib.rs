// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-modbus
//!
//! The Modbus side of the bridge:
//!
//! - **Client**: one lazily-connected client per outbound device (TCP or
//!   RTU), with serialized transactions and reconnect-on-failure
//! - **Pool**: the id-keyed map of client entries
//! - **Poller**: the per-device periodic refresh task
//! - **Listener**: the bank of TCP listeners that accepts inbound "modem"
//!   devices and answers their queries from the tag store

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod listener;
pub mod pool;
pub mod poller;

pub use client::{ClientOptions, ClientSession, DeviceClient};
pub use listener::{ConnectionRegistry, ModemConnection, ModemListenerBank, ModemRouteTable};
pub use pool::ClientPool;
pub use poller::{spawn_poller, PollerHandle};
