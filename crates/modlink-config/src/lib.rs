// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-config
//!
//! Settings and the persistent device catalog for ModLink.
//!
//! - [`Settings`]: the bridge's fixed configuration (listener port range,
//!   OPC UA and HTTP ports, default timeouts), loadable from a YAML or TOML
//!   file with every field defaulted.
//! - [`DeviceCatalog`]: the catalog collaborator. It loads the full device
//!   array on startup and rewrites it on each admin mutation, replacing the
//!   file atomically so a crash mid-write cannot tear it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod settings;

pub use catalog::DeviceCatalog;
pub use settings::Settings;
