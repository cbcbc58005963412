// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge settings.
//!
//! All fields carry defaults, so running without a settings file is valid.
//! The file format is chosen by extension: `.yaml`/`.yml` or `.toml`.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use modlink_core::{BridgeError, BridgeResult};

// =============================================================================
// Defaults
// =============================================================================

/// Default HTTP admin port.
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default OPC UA endpoint port.
pub const DEFAULT_OPCUA_PORT: u16 = 52000;

/// Default first modem listener port (inclusive).
pub const DEFAULT_MODEM_PORT_START: u16 = 8000;

/// Default last modem listener port (inclusive).
pub const DEFAULT_MODEM_PORT_END: u16 = 8100;

/// Default Modbus connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Default Modbus request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;

/// Default device catalog path.
pub const DEFAULT_CATALOG_PATH: &str = "devices.json";

// =============================================================================
// Settings
// =============================================================================

/// The bridge's configuration constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct Settings {
    /// HTTP admin port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// OPC UA endpoint port.
    #[serde(default = "default_opcua_port")]
    pub opcua_port: u16,

    /// First modem listener port, inclusive.
    #[serde(default = "default_modem_port_start")]
    pub modem_port_start: u16,

    /// Last modem listener port, inclusive.
    #[serde(default = "default_modem_port_end")]
    pub modem_port_end: u16,

    /// Modbus connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Modbus request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Path of the persisted device catalog.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_opcua_port() -> u16 {
    DEFAULT_OPCUA_PORT
}

fn default_modem_port_start() -> u16 {
    DEFAULT_MODEM_PORT_START
}

fn default_modem_port_end() -> u16 {
    DEFAULT_MODEM_PORT_END
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from(DEFAULT_CATALOG_PATH)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            opcua_port: DEFAULT_OPCUA_PORT,
            modem_port_start: DEFAULT_MODEM_PORT_START,
            modem_port_end: DEFAULT_MODEM_PORT_END,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            catalog_path: default_catalog_path(),
        }
    }
}

impl Settings {
    /// Loads settings from a YAML or TOML file, chosen by extension.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::catalog(format!("read {}: {}", path.display(), e)))?;
        let settings: Settings = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| BridgeError::validation(format!("{}: {}", path.display(), e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| BridgeError::validation(format!("{}: {}", path.display(), e)))?,
            other => {
                return Err(BridgeError::validation(format!(
                    "unsupported settings format: {:?}",
                    other
                )))
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validates internal consistency.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.modem_port_start > self.modem_port_end {
            return Err(BridgeError::validation(format!(
                "modem port range {}..={} is empty",
                self.modem_port_start, self.modem_port_end
            )));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(BridgeError::validation("timeouts cannot be zero"));
        }
        Ok(())
    }

    /// Returns the modem listener port range.
    pub fn modem_ports(&self) -> RangeInclusive<u16> {
        self.modem_port_start..=self.modem_port_end
    }

    /// Returns the Modbus connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the Modbus request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// =============================================================================
// Tests
// =============================================================================
