// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # modlink-api
//!
//! The HTTP admin surface: device listing, value inspection, modem
//! connection listing, device add/remove and tag writes. No
//! authentication; the API is an operator-facing admin port.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::ApiServer;
