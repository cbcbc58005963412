// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for the bridge.
//!
//! Every component reports through [`BridgeError`]; the HTTP layer maps the
//! kinds to status codes via [`BridgeError::status_code`] and the OPC UA
//! bridge maps them to `StatusCode`s. I/O kinds mark the device
//! disconnected wherever they occur; validation kinds never touch state.

use std::time::Duration;

use thiserror::Error;

use crate::model::TagDataType;

/// Result alias used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// The unified error type.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bad admin input; HTTP 400.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// Unknown device or tag; HTTP 404.
    #[error("{what} not found")]
    NotFound {
        /// The missing entity, e.g. `device 'd1'`.
        what: String,
    },

    /// Read-only register class or modem write attempt; HTTP 400,
    /// OPC UA `BadNotWritable`.
    #[error("not writable: {message}")]
    NotWritable {
        /// Why the write was rejected.
        message: String,
    },

    /// Transport could not be opened; the entry stays disconnected.
    #[error("connect to {target} failed: {message}")]
    ConnectFailed {
        /// Dial target (host:port or serial path).
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// A bounded I/O wait elapsed; the transport is recycled.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O failure on an established transport; the transport is recycled.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying failure.
        message: String,
    },

    /// Malformed or unexpected Modbus frame; the frame is dropped.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was malformed.
        message: String,
    },

    /// Encode-side failure for writes; HTTP 400.
    #[error("value {value} out of range for {data_type}")]
    ValueOutOfRange {
        /// The offending value, rendered.
        value: String,
        /// The declared tag type.
        data_type: TagDataType,
    },

    /// Catalog persistence failure; HTTP 500.
    #[error("catalog error: {message}")]
    Catalog {
        /// Underlying failure.
        message: String,
    },

    /// Anything that should not happen; HTTP 500.
    #[error("internal error: {message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl BridgeError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not-found error; `what` names the entity.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a not-writable error.
    pub fn not_writable(message: impl Into<String>) -> Self {
        Self::NotWritable {
            message: message.into(),
        }
    }

    /// Creates a connect-failed error.
    pub fn connect_failed(target: impl Into<String>, message: impl ToString) -> Self {
        Self::ConnectFailed {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl ToString) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a value-out-of-range error.
    pub fn out_of_range(value: impl Into<String>, data_type: TagDataType) -> Self {
        Self::ValueOutOfRange {
            value: value.into(),
            data_type,
        }
    }

    /// Creates a catalog error.
    pub fn catalog(message: impl ToString) -> Self {
        Self::Catalog {
            message: message.to_string(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for the underlying-I/O kinds that mark a device
    /// disconnected.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectFailed { .. }
                | BridgeError::Timeout(_)
                | BridgeError::Transport { .. }
        )
    }

    /// Returns the HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::Validation { .. }
            | BridgeError::NotWritable { .. }
            | BridgeError::ValueOutOfRange { .. } => 400,
            BridgeError::NotFound { .. } => 404,
            BridgeError::ConnectFailed { .. }
            | BridgeError::Timeout(_)
            | BridgeError::Transport { .. }
            | BridgeError::Protocol { .. }
            | BridgeError::Catalog { .. }
            | BridgeError::Internal { .. } => 500,
        }
    }

    /// Returns the error kind as a short string for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Validation { .. } => "validation",
            BridgeError::NotFound { .. } => "not-found",
            BridgeError::NotWritable { .. } => "not-writable",
            BridgeError::ConnectFailed { .. } => "connect-failed",
            BridgeError::Timeout(_) => "timeout",
            BridgeError::Transport { .. } => "transport",
            BridgeError::Protocol { .. } => "protocol",
            BridgeError::ValueOutOfRange { .. } => "value-out-of-range",
            BridgeError::Catalog { .. } => "catalog",
            BridgeError::Internal { .. } => "internal",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
