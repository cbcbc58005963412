// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The persistent device catalog.
//!
//! The catalog is a JSON array of device records. It is loaded in full on
//! startup and rewritten in full on each admin mutation. Writes go to a
//! sibling temp file first and are renamed over the target, so a crash
//! mid-write leaves the previous catalog intact.

use std::path::{Path, PathBuf};

use modlink_core::{BridgeError, BridgeResult, Device};

/// Handle to the on-disk device catalog.
#[derive(Debug, Clone)]
pub struct DeviceCatalog {
    path: PathBuf,
}

impl DeviceCatalog {
    /// Creates a catalog handle for the given path. The file is not touched
    /// until [`load`](Self::load) or [`persist`](Self::persist) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the catalog path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full device array. A missing file is an empty catalog.
    pub fn load(&self) -> BridgeResult<Vec<Device>> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no device catalog, starting empty");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| BridgeError::catalog(format!("read {}: {}", self.path.display(), e)))?;
        let devices: Vec<Device> = serde_json::from_str(&content)
            .map_err(|e| BridgeError::catalog(format!("parse {}: {}", self.path.display(), e)))?;
        tracing::info!(
            path = %self.path.display(),
            devices = devices.len(),
            "device catalog loaded"
        );
        Ok(devices)
    }

    /// Persists the full device array, replacing the file atomically.
    pub fn persist(&self, devices: &[Device]) -> BridgeResult<()> {
        let json = serde_json::to_string_pretty(devices)
            .map_err(|e| BridgeError::catalog(format!("serialize catalog: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())
            .map_err(|e| BridgeError::catalog(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            BridgeError::catalog(format!("replace {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            devices = devices.len(),
            "device catalog persisted"
        );
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{DeviceId, RegisterClass, Tag, TagDataType, Transport};

    fn device(id: &str) -> Device {
        Device {
            id: DeviceId::new(id),
            name: format!("device-{}", id),
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
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DeviceCatalog::new(dir.path().join("devices.json"));
        assert!(catalog.load().unwrap().is_empty());
    }

    #[test]
    fn persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DeviceCatalog::new(dir.path().join("devices.json"));

        let devices = vec![device("a"), device("b")];
        catalog.persist(&devices).unwrap();

        let loaded = catalog.load().unwrap();
        assert_eq!(loaded, devices);

        // The temp file must not linger.
        assert!(!dir.path().join("devices.json.tmp").exists());
    }

    #[test]
    fn persist_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DeviceCatalog::new(dir.path().join("devices.json"));

        catalog.persist(&[device("a"), device("b")]).unwrap();
        catalog.persist(&[device("a")]).unwrap();

        assert_eq!(catalog.load().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "{not json").unwrap();

        let catalog = DeviceCatalog::new(&path);
        assert!(matches!(
            catalog.load(),
            Err(BridgeError::Catalog { .. })
        ));
    }
}
