// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The authoritative in-memory tag value store.
//!
//! A flat map keyed by `(device-id, tag-name)` holding each tag's metadata
//! and current value. All operations are serialized under a single mutex,
//! are O(1) or O(|tags|), and never perform I/O, so the store can be read
//! from synchronous callbacks (OPC UA getters) as well as async tasks.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{Device, DeviceId, RegisterClass, Tag, TagDataType, TagValue};

// =============================================================================
// Slot Types
// =============================================================================

/// A tag's metadata plus its current value, as returned by [`TagStore::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct TagState {
    /// Modbus register address.
    pub address: u16,
    /// Register class.
    pub register_type: RegisterClass,
    /// Declared data type.
    pub data_type: TagDataType,
    /// Whether the register class accepts writes.
    pub writable: bool,
    /// Current value; `None` until the first poll or seed.
    pub value: Option<TagValue>,
}

/// One tag's entry in the values snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagReading {
    /// Current value, `null` if never read.
    pub value: Option<TagValue>,
    /// Whether the tag accepts writes.
    pub writable: bool,
}

/// One device's entry in the values snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceValues {
    /// Display name of the device.
    pub name: String,
    /// Tag readings keyed by tag name.
    pub tags: BTreeMap<String, TagReading>,
}

// =============================================================================
// TagStore
// =============================================================================

struct Slot {
    meta: Tag,
}

struct DeviceEntry {
    name: String,
    tag_order: Vec<String>,
}

struct StoreInner {
    devices: HashMap<DeviceId, DeviceEntry>,
    slots: HashMap<(DeviceId, String), Slot>,
}

/// The process-wide tag value store.
pub struct TagStore {
    inner: Mutex<StoreInner>,
}

impl TagStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                devices: HashMap::new(),
                slots: HashMap::new(),
            }),
        }
    }

    /// Installs all tags of a device atomically.
    ///
    /// Seeded `currentValue`s from the catalog are carried over. Installing
    /// over an existing device replaces its slots.
    pub fn install(&self, device: &Device) {
        let mut inner = self.inner.lock();
        if inner.devices.contains_key(&device.id) {
            Self::remove_device(&mut inner, &device.id);
        }
        let tag_order = device.tags.iter().map(|t| t.name.clone()).collect();
        inner.devices.insert(
            device.id.clone(),
            DeviceEntry {
                name: device.name.clone(),
                tag_order,
            },
        );
        for tag in &device.tags {
            inner
                .slots
                .insert((device.id.clone(), tag.name.clone()), Slot { meta: tag.clone() });
        }
    }

    /// Removes all tags of a device atomically.
    ///
    /// Returns `false` if the device was not installed.
    pub fn uninstall(&self, device_id: &DeviceId) -> bool {
        let mut inner = self.inner.lock();
        Self::remove_device(&mut inner, device_id)
    }

    fn remove_device(inner: &mut StoreInner, device_id: &DeviceId) -> bool {
        match inner.devices.remove(device_id) {
            Some(entry) => {
                for name in entry.tag_order {
                    inner.slots.remove(&(device_id.clone(), name));
                }
                true
            }
            None => false,
        }
    }

    /// Returns a tag's metadata and current value.
    pub fn get(&self, device_id: &DeviceId, tag_name: &str) -> Option<TagState> {
        let inner = self.inner.lock();
        inner
            .slots
            .get(&(device_id.clone(), tag_name.to_string()))
            .map(|slot| TagState {
                address: slot.meta.address,
                register_type: slot.meta.register_type,
                data_type: slot.meta.data_type,
                writable: slot.meta.is_writable(),
                value: slot.meta.current_value.clone(),
            })
    }

    /// Updates a tag's current value from a wire read or a completed write.
    ///
    /// Idempotent; returns `false` if the slot does not exist.
    pub fn set_from_wire(&self, device_id: &DeviceId, tag_name: &str, value: TagValue) -> bool {
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(&(device_id.clone(), tag_name.to_string())) {
            Some(slot) => {
                slot.meta.current_value = Some(value);
                true
            }
            None => false,
        }
    }

    /// Returns the full value snapshot for the HTTP read endpoint:
    /// device-id → (name, tag-name → value + writable).
    pub fn snapshot(&self) -> BTreeMap<String, DeviceValues> {
        let inner = self.inner.lock();
        let mut out = BTreeMap::new();
        for (device_id, entry) in &inner.devices {
            let mut tags = BTreeMap::new();
            for name in &entry.tag_order {
                if let Some(slot) = inner.slots.get(&(device_id.clone(), name.clone())) {
                    tags.insert(
                        name.clone(),
                        TagReading {
                            value: slot.meta.current_value.clone(),
                            writable: slot.meta.is_writable(),
                        },
                    );
                }
            }
            out.insert(
                device_id.to_string(),
                DeviceValues {
                    name: entry.name.clone(),
                    tags,
                },
            );
        }
        out
    }

    /// Returns the number of installed devices.
    pub fn device_count(&self) -> usize {
        self.inner.lock().devices.len()
    }

    /// Returns the number of installed tag slots.
    pub fn slot_count(&self) -> usize {
        self.inner.lock().slots.len()
    }
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
