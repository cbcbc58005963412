// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The address-space bridge.
//!
//! Each device is a folder `ModbusDevices/<device.name>`; each tag is a
//! variable with node-id string `<device-id>_<tag-name>`. Variable getters
//! read the tag store on every request, so the bridge holds no value state
//! of its own. Setters on writable tags feed the engine's write path
//! through the core write bus; modem tags reject writes outright.
//!
//! The attribute setter callback runs while the server holds the address
//! space lock, so republishes are not applied inline: [`publish`] enqueues
//! the value and a background task applies it once the lock is free.
//!
//! [`publish`]: AddressSpaceBridge::publish

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use opcua::server::prelude::*;
use opcua::sync::RwLock;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use modlink_core::{
    AddressSpaceFacade, BridgeError, BridgeResult, Device, DeviceId, TagDataType, TagStore,
    TagValue, WriteHandle,
};

use crate::server::APPLICATION_URI;

// =============================================================================
// AddressSpaceBridge
// =============================================================================

/// Mirrors devices and tags into the OPC UA address space.
pub struct AddressSpaceBridge {
    space: Arc<RwLock<AddressSpace>>,
    namespace: u16,
    root: NodeId,
    store: Arc<TagStore>,
    writer: WriteHandle,
    write_timeout: Duration,
    folders: Mutex<HashMap<DeviceId, NodeId>>,
    publish_tx: mpsc::UnboundedSender<(NodeId, Variant)>,
}

impl AddressSpaceBridge {
    /// Creates the bridge, registering the namespace and the
    /// `ModbusDevices` root folder.
    ///
    /// Must be called inside a tokio runtime; the republish task is spawned
    /// here.
    pub fn new(
        space: Arc<RwLock<AddressSpace>>,
        store: Arc<TagStore>,
        writer: WriteHandle,
        write_timeout: Duration,
    ) -> BridgeResult<Arc<Self>> {
        let (namespace, root) = {
            let mut guard = space.write();
            let namespace = guard
                .register_namespace(APPLICATION_URI)
                .map_err(|_| BridgeError::internal("cannot register OPC UA namespace"))?;
            let root = guard
                .add_folder("ModbusDevices", "ModbusDevices", &NodeId::objects_folder_id())
                .map_err(|_| BridgeError::internal("cannot create ModbusDevices folder"))?;
            (namespace, root)
        };

        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<(NodeId, Variant)>();
        let publish_space = space.clone();
        tokio::spawn(async move {
            while let Some((node_id, variant)) = publish_rx.recv().await {
                let now = DateTime::now();
                let mut guard = publish_space.write();
                guard.set_variable_value(node_id, variant, &now, &now);
            }
        });

        Ok(Arc::new(Self {
            space,
            namespace,
            root,
            store,
            writer,
            write_timeout,
            folders: Mutex::new(HashMap::new()),
            publish_tx,
        }))
    }

    /// Returns the node id of a tag's variable.
    pub fn tag_node_id(&self, device_id: &DeviceId, tag_name: &str) -> NodeId {
        NodeId::new(self.namespace, format!("{}_{}", device_id, tag_name))
    }

    fn install_tags(&self, device: &Device, folder: &NodeId, space: &mut AddressSpace) {
        for tag in &device.tags {
            let node_id = self.tag_node_id(&device.id, &tag.name);

            let store = self.store.clone();
            let getter_device = device.id.clone();
            let getter_tag = tag.name.clone();
            let getter = AttrFnGetter::new_boxed(
                move |_, _, _, _, _, _| -> Result<Option<DataValue>, StatusCode> {
                    let state = store
                        .get(&getter_device, &getter_tag)
                        .ok_or(StatusCode::BadNodeIdUnknown)?;
                    let now = DateTime::now();
                    let (variant, status) = match state.value {
                        Some(value) => (value_to_variant(&value), StatusCode::Good),
                        None => (Variant::Empty, StatusCode::BadWaitingForInitialData),
                    };
                    Ok(Some(DataValue {
                        value: Some(variant),
                        status: Some(status),
                        source_timestamp: Some(now),
                        source_picoseconds: None,
                        server_timestamp: Some(now),
                        server_picoseconds: None,
                    }))
                },
            );

            let mut builder = VariableBuilder::new(&node_id, tag.name.as_str(), tag.name.as_str())
                .organized_by(folder)
                .data_type(opc_data_type(tag.data_type))
                .minimum_sampling_interval(device.poll_interval_ms as f64)
                .value(Variant::Empty)
                .value_getter(getter);

            if tag.is_writable() {
                let writer = self.writer.clone();
                let setter_device = device.id.clone();
                let setter_tag = tag.name.clone();
                let data_type = tag.data_type;
                let is_modem = device.is_modem();
                let timeout = self.write_timeout;
                let setter = AttrFnSetter::new_boxed(
                    move |_, _, _, data_value: DataValue| -> Result<(), StatusCode> {
                        if is_modem {
                            return Err(StatusCode::BadNotWritable);
                        }
                        let variant = data_value.value.ok_or(StatusCode::BadTypeMismatch)?;
                        let parsed =
                            variant_to_value(&variant).ok_or(StatusCode::BadTypeMismatch)?;
                        let coerced = parsed
                            .coerce(data_type)
                            .map_err(|_| StatusCode::BadOutOfRange)?;
                        writer
                            .write_blocking(
                                setter_device.clone(),
                                setter_tag.clone(),
                                coerced,
                                timeout,
                            )
                            .map_err(|error| {
                                tracing::warn!(
                                    device = %setter_device,
                                    tag = %setter_tag,
                                    error = %error,
                                    "OPC UA write rejected"
                                );
                                write_status(&error)
                            })
                    },
                );
                builder = builder.writable().value_setter(setter);
            }

            builder.insert(space);
        }
    }
}

impl AddressSpaceFacade for AddressSpaceBridge {
    fn install_device(&self, device: &Device) -> BridgeResult<()> {
        let mut space = self.space.write();
        let folder = space
            .add_folder(device.name.as_str(), device.name.as_str(), &self.root)
            .map_err(|_| {
                BridgeError::internal(format!("cannot create folder for device '{}'", device.id))
            })?;
        self.install_tags(device, &folder, &mut space);
        drop(space);

        self.folders.lock().insert(device.id.clone(), folder);
        tracing::debug!(device = %device.id, tags = device.tags.len(), "device mapped into address space");
        Ok(())
    }

    fn remove_device(&self, device: &Device) {
        let folder = self.folders.lock().remove(&device.id);
        let mut space = self.space.write();
        for tag in &device.tags {
            let node_id = self.tag_node_id(&device.id, &tag.name);
            space.delete(&node_id, true);
        }
        if let Some(folder) = folder {
            space.delete(&folder, true);
        }
        tracing::debug!(device = %device.id, "device removed from address space");
    }

    fn publish(&self, device_id: &DeviceId, tag_name: &str, value: &TagValue) {
        let node_id = self.tag_node_id(device_id, tag_name);
        let _ = self.publish_tx.send((node_id, value_to_variant(value)));
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn opc_data_type(data_type: TagDataType) -> DataTypeId {
    match data_type {
        TagDataType::Float => DataTypeId::Float,
        TagDataType::Int32 => DataTypeId::Int32,
        TagDataType::UInt32 => DataTypeId::UInt32,
        TagDataType::Int16 => DataTypeId::Int16,
        TagDataType::UInt16 => DataTypeId::UInt16,
        TagDataType::Boolean => DataTypeId::Boolean,
    }
}

fn value_to_variant(value: &TagValue) -> Variant {
    match value {
        TagValue::Float(v) => Variant::Float(*v),
        TagValue::Int32(v) => Variant::Int32(*v),
        TagValue::UInt32(v) => Variant::UInt32(*v),
        TagValue::Int16(v) => Variant::Int16(*v),
        TagValue::UInt16(v) => Variant::UInt16(*v),
        TagValue::Bool(v) => Variant::Boolean(*v),
    }
}

fn variant_to_value(variant: &Variant) -> Option<TagValue> {
    match variant {
        Variant::Boolean(v) => Some(TagValue::Bool(*v)),
        Variant::SByte(v) => Some(TagValue::Int16(*v as i16)),
        Variant::Byte(v) => Some(TagValue::UInt16(*v as u16)),
        Variant::Int16(v) => Some(TagValue::Int16(*v)),
        Variant::UInt16(v) => Some(TagValue::UInt16(*v)),
        Variant::Int32(v) => Some(TagValue::Int32(*v)),
        Variant::UInt32(v) => Some(TagValue::UInt32(*v)),
        Variant::Int64(v) => i32::try_from(*v).ok().map(TagValue::Int32),
        Variant::UInt64(v) => u32::try_from(*v).ok().map(TagValue::UInt32),
        Variant::Float(v) => Some(TagValue::Float(*v)),
        Variant::Double(v) => Some(TagValue::Float(*v as f32)),
        _ => None,
    }
}

fn write_status(error: &BridgeError) -> StatusCode {
    match error {
        BridgeError::NotWritable { .. } => StatusCode::BadNotWritable,
        BridgeError::NotFound { .. } => StatusCode::BadNodeIdUnknown,
        BridgeError::Validation { .. } => StatusCode::BadTypeMismatch,
        BridgeError::ValueOutOfRange { .. } => StatusCode::BadOutOfRange,
        BridgeError::ConnectFailed { .. }
        | BridgeError::Timeout(_)
        | BridgeError::Transport { .. }
        | BridgeError::Protocol { .. } => StatusCode::BadCommunicationError,
        _ => StatusCode::BadInternalError,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcua::types::Identifier;

    use modlink_core::{write_channel, RegisterClass, Tag, Transport};

    fn device() -> Device {
        Device {
            id: DeviceId::new("d1"),
            name: "pump".to_string(),
            transport: Transport::Tcp {
                address: "127.0.0.1".to_string(),
                port: 5020,
            },
            device_id: 1,
            poll_interval_ms: 2000,
            tags: vec![
                Tag {
                    name: "t".to_string(),
                    address: 100,
                    register_type: RegisterClass::Holding,
                    data_type: TagDataType::UInt16,
                    current_value: None,
                },
                Tag {
                    name: "ro".to_string(),
                    address: 101,
                    register_type: RegisterClass::Input,
                    data_type: TagDataType::Float,
                    current_value: None,
                },
            ],
        }
    }

    fn bridge() -> (Arc<AddressSpaceBridge>, Arc<RwLock<AddressSpace>>) {
        let space = Arc::new(RwLock::new(AddressSpace::new()));
        let store = Arc::new(TagStore::new());
        let (writer, _rx) = write_channel();
        let bridge =
            AddressSpaceBridge::new(space.clone(), store, writer, Duration::from_secs(2)).unwrap();
        (bridge, space)
    }

    #[tokio::test]
    async fn install_creates_and_remove_deletes_nodes() {
        let (bridge, space) = bridge();
        let device = device();

        bridge.install_device(&device).unwrap();
        let tag_node = bridge.tag_node_id(&device.id, "t");
        assert!(space.read().find_node(&tag_node).is_some());

        bridge.remove_device(&device);
        assert!(space.read().find_node(&tag_node).is_none());
    }

    #[tokio::test]
    async fn node_id_uses_device_and_tag_name() {
        let (bridge, _space) = bridge();
        let node_id = bridge.tag_node_id(&DeviceId::new("d1"), "t");
        assert_eq!(node_id.identifier, Identifier::String("d1_t".into()));
    }

    #[test]
    fn variant_round_trip() {
        let values = [
            TagValue::Float(3.14),
            TagValue::Int32(-5),
            TagValue::UInt32(70_000),
            TagValue::Int16(-1),
            TagValue::UInt16(65),
            TagValue::Bool(true),
        ];
        for value in values {
            let variant = value_to_variant(&value);
            assert_eq!(variant_to_value(&variant), Some(value));
        }
    }

    #[test]
    fn foreign_variants_are_rejected() {
        assert_eq!(variant_to_value(&Variant::Empty), None);
        assert_eq!(
            variant_to_value(&Variant::from("text")),
            None
        );
        assert_eq!(variant_to_value(&Variant::Int64(1 << 40)), None);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            write_status(&BridgeError::not_writable("modem")),
            StatusCode::BadNotWritable
        );
        assert_eq!(
            write_status(&BridgeError::transport("reset")),
            StatusCode::BadCommunicationError
        );
        assert_eq!(
            write_status(&BridgeError::not_found("device 'x'")),
            StatusCode::BadNodeIdUnknown
        );
    }
}
