// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP mapping for bridge errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use modlink_core::BridgeError;

/// A bridge error carried to the HTTP layer.
///
/// Validation, writability and range failures surface as 400, unknown
/// devices and tags as 404, everything I/O-shaped as 500.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
