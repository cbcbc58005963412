// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary-level errors and exit handling.

use thiserror::Error;

use modlink_core::BridgeError;

/// Result alias for the binary.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum BinError {
    /// Settings or catalog could not be loaded.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A component failed during startup.
    #[error("startup error: {0}")]
    Startup(String),

    /// A bridge error escaped to the top level.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Logs the error and exits with a nonzero status.
pub fn report_error_and_exit(error: BinError) -> ! {
    tracing::error!(error = %error, "fatal");
    eprintln!("error: {}", error);
    std::process::exit(1);
}
