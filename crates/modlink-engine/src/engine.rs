// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The engine: device materialization, admin operations and the write path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use modlink_config::{DeviceCatalog, Settings};
use modlink_core::{
    AddressSpaceFacade, BridgeError, BridgeResult, Device, DeviceId, DeviceValues, Tag, TagValue,
    WriteReceiver,
};
use modlink_modbus::{
    spawn_poller, ClientPool, ConnectionRegistry, ModemConnection, ModemRouteTable, PollerHandle,
};

// =============================================================================
// Engine
// =============================================================================

/// The device-integration engine.
///
/// Owns the device list and all per-device resources. Admin mutations are
/// serialized under one lock; reads and writes go through the shared
/// structures without it.
pub struct Engine {
    settings: Settings,
    catalog: DeviceCatalog,
    store: Arc<modlink_core::TagStore>,
    pool: Arc<ClientPool>,
    routes: Arc<ModemRouteTable>,
    registry: Arc<ConnectionRegistry>,
    space: Arc<dyn AddressSpaceFacade>,
    devices: RwLock<Vec<Device>>,
    /// Poller handles, also serving as the admin mutation lock.
    pollers: Mutex<HashMap<DeviceId, PollerHandle>>,
}

impl Engine {
    /// Creates the engine over its owned structures.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        catalog: DeviceCatalog,
        store: Arc<modlink_core::TagStore>,
        pool: Arc<ClientPool>,
        routes: Arc<ModemRouteTable>,
        registry: Arc<ConnectionRegistry>,
        space: Arc<dyn AddressSpaceFacade>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            catalog,
            store,
            pool,
            routes,
            registry,
            space,
            devices: RwLock::new(Vec::new()),
            pollers: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the shared tag store.
    pub fn store(&self) -> &Arc<modlink_core::TagStore> {
        &self.store
    }

    /// Returns the engine's settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Loads the catalog and materializes every device.
    ///
    /// A catalog entry that fails validation or attachment is logged and
    /// skipped; a bad entry must not keep the bridge from starting.
    pub async fn bootstrap(&self) -> BridgeResult<usize> {
        let loaded = self.catalog.load()?;
        let mut pollers = self.pollers.lock().await;
        let mut installed = 0;

        for mut device in loaded {
            if device.id.is_empty() {
                device.id = DeviceId::new(Uuid::new_v4().to_string());
            }
            if let Err(error) = self.check_device(&device) {
                tracing::warn!(device = %device.id, error = %error, "skipping invalid catalog entry");
                continue;
            }
            match self.attach(&mut pollers, &device) {
                Ok(()) => {
                    self.devices.write().push(device);
                    installed += 1;
                }
                Err(error) => {
                    tracing::warn!(device = %device.id, error = %error, "cannot materialize catalog entry");
                }
            }
        }

        tracing::info!(devices = installed, "engine bootstrapped");
        Ok(installed)
    }

    // =========================================================================
    // Admin Operations
    // =========================================================================

    /// Adds a device: validate, assign an id if absent, persist, then
    /// materialize. Partial work is rolled back on failure.
    pub async fn add_device(&self, mut device: Device) -> BridgeResult<Device> {
        let mut pollers = self.pollers.lock().await;

        self.check_device(&device)?;
        if device.id.is_empty() {
            device.id = DeviceId::new(Uuid::new_v4().to_string());
        }

        // Persist first: if the catalog cannot be written, nothing else is
        // touched.
        let previous: Vec<Device> = self.devices.read().clone();
        let mut next = previous.clone();
        next.push(device.clone());
        self.catalog.persist(&next)?;

        if let Err(error) = self.attach(&mut pollers, &device) {
            if let Err(rollback) = self.catalog.persist(&previous) {
                tracing::error!(error = %rollback, "catalog rollback failed");
            }
            return Err(error);
        }

        self.devices.write().push(device.clone());
        tracing::info!(device = %device.id, name = %device.name, "device added");
        Ok(device)
    }

    /// Removes a device, draining its poller, client and address-space
    /// nodes, then persists the catalog.
    pub async fn remove_device(&self, device_id: &str) -> BridgeResult<()> {
        let mut pollers = self.pollers.lock().await;

        let device_id = DeviceId::new(device_id);
        let device = self
            .devices
            .read()
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .ok_or_else(|| BridgeError::not_found(format!("device '{}'", device_id)))?;

        self.detach(&mut pollers, &device).await;
        self.devices.write().retain(|d| d.id != device.id);
        self.catalog.persist(&self.devices.read().clone())?;

        tracing::info!(device = %device.id, "device removed");
        Ok(())
    }

    /// Writes a tag value arriving as a raw admin input (HTTP body).
    ///
    /// The value is parsed as the tag's declared type; numeric parse from
    /// string is accepted.
    pub async fn write_tag_raw(
        &self,
        device_id: &str,
        tag_name: &str,
        raw: &serde_json::Value,
    ) -> BridgeResult<()> {
        let (device, tag) = self.resolve_writable(&DeviceId::new(device_id), tag_name)?;
        let value = tag.data_type.parse_value(raw)?;
        self.perform_write(&device, &tag, value).await
    }

    /// Writes an already-typed tag value (OPC UA setter path).
    pub async fn write_tag(
        &self,
        device_id: &DeviceId,
        tag_name: &str,
        value: TagValue,
    ) -> BridgeResult<()> {
        let (device, tag) = self.resolve_writable(device_id, tag_name)?;
        let value = value.coerce(tag.data_type)?;
        self.perform_write(&device, &tag, value).await
    }

    /// Spawns the worker that services OPC UA setter writes from the bus.
    pub fn serve_writes(self: &Arc<Self>, mut commands: WriteReceiver) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let result = engine
                        .write_tag(&command.device_id, &command.tag_name, command.value)
                        .await;
                    let _ = command.reply.send(result);
                });
            }
        })
    }

    // =========================================================================
    // Read Surfaces
    // =========================================================================

    /// Returns every device with its live connected flag.
    pub fn devices_with_status(&self) -> Vec<(Device, bool)> {
        self.devices
            .read()
            .iter()
            .map(|device| {
                let connected = match device.transport.listen_port() {
                    Some(port) => self.registry.has_listen_port(port),
                    None => self.pool.is_connected(&device.id),
                };
                (device.clone(), connected)
            })
            .collect()
    }

    /// Returns the value snapshot for the HTTP read endpoint.
    pub fn values(&self) -> BTreeMap<String, DeviceValues> {
        self.store.snapshot()
    }

    /// Returns the live modem sessions.
    pub fn connections(&self) -> Vec<ModemConnection> {
        self.registry.list()
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Drains all pollers and closes every Modbus transport.
    pub async fn shutdown(&self) {
        let mut pollers = self.pollers.lock().await;
        for (_, handle) in pollers.drain() {
            handle.stop().await;
        }
        self.pool.disconnect_all().await;
        tracing::info!("engine drained");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Validates a device record and the global invariants against the
    /// current device list.
    fn check_device(&self, device: &Device) -> BridgeResult<()> {
        device.validate(&self.settings.modem_ports())?;

        let devices = self.devices.read();
        if !device.id.is_empty() && devices.iter().any(|d| d.id == device.id) {
            return Err(BridgeError::validation(format!(
                "device id '{}' already exists",
                device.id
            )));
        }
        if let Some(port) = device.transport.listen_port() {
            let clash = devices.iter().any(|d| {
                d.transport.listen_port() == Some(port) && d.device_id == device.device_id
            });
            if clash {
                return Err(BridgeError::validation(format!(
                    "modem port {} unit {} already in use",
                    port, device.device_id
                )));
            }
        }
        Ok(())
    }

    /// Materializes a device into the store, address space and either the
    /// client pool + poller or the modem route table. Rolls back the
    /// earlier steps if a later one fails.
    fn attach(
        &self,
        pollers: &mut HashMap<DeviceId, PollerHandle>,
        device: &Device,
    ) -> BridgeResult<()> {
        self.store.install(device);

        if let Err(error) = self.space.install_device(device) {
            self.store.uninstall(&device.id);
            return Err(error);
        }

        if device.is_modem() {
            self.routes.insert(device);
        } else {
            match self.pool.insert(device) {
                Ok(client) => {
                    pollers.insert(
                        device.id.clone(),
                        spawn_poller(
                            device.clone(),
                            client,
                            self.store.clone(),
                            self.space.clone(),
                        ),
                    );
                }
                Err(error) => {
                    self.space.remove_device(device);
                    self.store.uninstall(&device.id);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Tears a device's resources down in reverse order of [`attach`].
    async fn detach(&self, pollers: &mut HashMap<DeviceId, PollerHandle>, device: &Device) {
        if let Some(handle) = pollers.remove(&device.id) {
            handle.stop().await;
        }
        self.pool.remove(&device.id).await;
        self.routes.remove(device);
        self.space.remove_device(device);
        self.store.uninstall(&device.id);
    }

    /// Resolves a device and tag for writing, rejecting modem devices and
    /// read-only register classes before any I/O.
    fn resolve_writable(&self, device_id: &DeviceId, tag_name: &str) -> BridgeResult<(Device, Tag)> {
        let device = self
            .devices
            .read()
            .iter()
            .find(|d| &d.id == device_id)
            .cloned()
            .ok_or_else(|| BridgeError::not_found(format!("device '{}'", device_id)))?;
        if device.is_modem() {
            return Err(BridgeError::not_writable(format!(
                "device '{}' is a modem; no reverse write path",
                device_id
            )));
        }
        let tag = device
            .tag(tag_name)
            .cloned()
            .ok_or_else(|| {
                BridgeError::not_found(format!("tag '{}' on device '{}'", tag_name, device_id))
            })?;
        if !tag.is_writable() {
            return Err(BridgeError::not_writable(format!(
                "tag '{}' is a {} register",
                tag.name, tag.register_type
            )));
        }
        Ok((device, tag))
    }

    /// The unified write path: Modbus write, then store update and
    /// republish, all under the device's transaction lock.
    async fn perform_write(&self, device: &Device, tag: &Tag, value: TagValue) -> BridgeResult<()> {
        let value = value.coerce(tag.data_type)?;
        let client = self.pool.get(&device.id).ok_or_else(|| {
            BridgeError::internal(format!("no client entry for device '{}'", device.id))
        })?;

        let mut session = client.session().await;
        session.ensure_connected().await?;
        session.write_tag(tag, &value).await?;

        self.store.set_from_wire(&device.id, &tag.name, value.clone());
        self.space.publish(&device.id, &tag.name, &value);
        drop(session);

        tracing::debug!(device = %device.id, tag = %tag.name, value = %value, "tag written");
        Ok(())
    }
}
