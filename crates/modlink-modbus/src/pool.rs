// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The Modbus client pool.
//!
//! One [`DeviceClient`] entry per outbound (non-modem) device, keyed by
//! device id. Entries are created when a device is added and removed with
//! the device; removal closes the transport best-effort.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use modlink_core::{BridgeResult, Device, DeviceId};

use crate::client::{ClientOptions, DeviceClient};

/// Process-wide map of outbound device clients.
pub struct ClientPool {
    options: ClientOptions,
    entries: RwLock<HashMap<DeviceId, Arc<DeviceClient>>>,
}

impl ClientPool {
    /// Creates an empty pool with the given timeouts.
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a client entry for a non-modem device.
    pub fn insert(&self, device: &Device) -> BridgeResult<Arc<DeviceClient>> {
        let client = Arc::new(DeviceClient::new(device, self.options)?);
        self.entries
            .write()
            .insert(device.id.clone(), client.clone());
        Ok(client)
    }

    /// Returns the entry for a device, if one exists.
    pub fn get(&self, device_id: &DeviceId) -> Option<Arc<DeviceClient>> {
        self.entries.read().get(device_id).cloned()
    }

    /// Returns `true` while the device's transport is believed healthy.
    pub fn is_connected(&self, device_id: &DeviceId) -> bool {
        self.entries
            .read()
            .get(device_id)
            .map(|c| c.is_connected())
            .unwrap_or(false)
    }

    /// Removes a device's entry, closing its transport best-effort.
    pub async fn remove(&self, device_id: &DeviceId) {
        let client = self.entries.write().remove(device_id);
        if let Some(client) = client {
            client.disconnect().await;
        }
    }

    /// Closes every transport. Used during shutdown draining.
    pub async fn disconnect_all(&self) {
        let clients: Vec<_> = self.entries.read().values().cloned().collect();
        for client in clients {
            client.disconnect().await;
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the pool has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{RegisterClass, Tag, TagDataType, Transport};

    fn device(id: &str) -> Device {
        Device {
            id: DeviceId::new(id),
            name: id.to_string(),
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

    #[tokio::test]
    async fn insert_get_remove() {
        let pool = ClientPool::new(ClientOptions::default());
        let d = device("d1");

        pool.insert(&d).unwrap();
        assert!(pool.get(&d.id).is_some());
        assert!(!pool.is_connected(&d.id));
        assert_eq!(pool.len(), 1);

        pool.remove(&d.id).await;
        assert!(pool.get(&d.id).is_none());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let pool = ClientPool::new(ClientOptions::default());
        pool.remove(&DeviceId::new("ghost")).await;
        assert!(pool.is_empty());
    }
}
