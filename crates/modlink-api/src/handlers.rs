// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request handlers for the admin endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use modlink_core::{Device, DeviceValues};
use modlink_engine::Engine;
use modlink_modbus::ModemConnection;

use crate::error::ApiError;

// =============================================================================
// Wire Shapes
// =============================================================================

/// A device record as served by `GET /api/devices`: the catalog record plus
/// the transient connected flag.
#[derive(Debug, Serialize)]
pub struct DeviceRecord {
    /// The catalog fields, flattened.
    #[serde(flatten)]
    pub device: Device,
    /// Whether the device's transport is currently up.
    pub connected: bool,
}

/// Body of `POST /api/write`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    /// Target device id.
    pub device_id: String,
    /// Target tag name.
    pub tag_name: String,
    /// Value to write; numbers, booleans and numeric strings are accepted.
    pub value: serde_json::Value,
}

/// Body of a successful `POST /api/write`.
#[derive(Debug, Serialize)]
pub struct WriteResponse {
    /// Always `true`; failures surface as error statuses.
    pub ok: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/devices`: the device catalog with live connected flags.
pub async fn list_devices(State(engine): State<Arc<Engine>>) -> Json<Vec<DeviceRecord>> {
    let devices = engine
        .devices_with_status()
        .into_iter()
        .map(|(device, connected)| DeviceRecord { device, connected })
        .collect();
    Json(devices)
}

/// `GET /api/values`: the tag value snapshot.
pub async fn list_values(
    State(engine): State<Arc<Engine>>,
) -> Json<BTreeMap<String, DeviceValues>> {
    Json(engine.values())
}

/// `GET /api/connections`: live modem sessions.
pub async fn list_connections(State(engine): State<Arc<Engine>>) -> Json<Vec<ModemConnection>> {
    Json(engine.connections())
}

/// `POST /api/devices`: add a device; returns it with its assigned id.
///
/// The body is decoded by hand so shape errors surface as 400 with a
/// message, not as a bare extractor rejection.
pub async fn add_device(
    State(engine): State<Arc<Engine>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<Json<Device>, ApiError> {
    let device: Device = serde_json::from_value(raw)
        .map_err(|e| modlink_core::BridgeError::validation(format!("invalid device record: {}", e)))?;
    let added = engine.add_device(device).await?;
    Ok(Json(added))
}

/// `DELETE /api/devices/{id}`: remove a device and drain its resources.
pub async fn remove_device(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<String>,
) -> Result<Json<WriteResponse>, ApiError> {
    engine.remove_device(&id).await?;
    Ok(Json(WriteResponse { ok: true }))
}

/// `POST /api/write`: write a tag through the unified write path.
pub async fn write_tag(
    State(engine): State<Arc<Engine>>,
    Json(raw): Json<serde_json::Value>,
) -> Result<Json<WriteResponse>, ApiError> {
    let request: WriteRequest = serde_json::from_value(raw)
        .map_err(|e| modlink_core::BridgeError::validation(format!("invalid write request: {}", e)))?;
    engine
        .write_tag_raw(&request.device_id, &request.tag_name, &request.value)
        .await?;
    Ok(Json(WriteResponse { ok: true }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{DeviceId, RegisterClass, Tag, TagDataType, Transport};

    #[test]
    fn device_record_flattens_catalog_fields() {
        let record = DeviceRecord {
            device: Device {
                id: DeviceId::new("d1"),
                name: "pump".to_string(),
                transport: Transport::Tcp {
                    address: "127.0.0.1".to_string(),
                    port: 5020,
                },
                device_id: 1,
                poll_interval_ms: 2000,
                tags: vec![Tag {
                    name: "t".to_string(),
                    address: 0,
                    register_type: RegisterClass::Holding,
                    data_type: TagDataType::UInt16,
                    current_value: None,
                }],
            },
            connected: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "d1");
        assert_eq!(json["type"], "tcp");
        assert_eq!(json["connected"], true);
        assert_eq!(json["pollInterval"], 2000);
    }

    #[test]
    fn write_request_parses_camel_case() {
        let request: WriteRequest = serde_json::from_value(serde_json::json!({
            "deviceId": "d1",
            "tagName": "c",
            "value": "1"
        }))
        .unwrap();
        assert_eq!(request.device_id, "d1");
        assert_eq!(request.tag_name, "c");
        assert_eq!(request.value, serde_json::json!("1"));
    }
}
