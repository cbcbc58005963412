// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The address-space seam.
//!
//! The engine and pollers publish through this trait rather than talking to
//! the OPC UA stack directly: device folders and tag variables are created
//! and destroyed atomically with the device, and every fresh value is
//! republished so subscriptions observe the new sample. The OPC UA-backed
//! implementation lives in `modlink-opcua`; tests use [`NullAddressSpace`].

use crate::error::BridgeResult;
use crate::model::{Device, DeviceId, TagValue};

/// Facade over the OPC UA address space.
///
/// Implementations hold identifier-keyed handles only; they look values up
/// by `(device-id, tag-name)` on every access instead of caching them.
pub trait AddressSpaceFacade: Send + Sync {
    /// Creates the device folder and one variable per tag.
    fn install_device(&self, device: &Device) -> BridgeResult<()>;

    /// Deletes the device's variables and folder.
    fn remove_device(&self, device: &Device);

    /// Republishes a fresh value on the tag's variable.
    fn publish(&self, device_id: &DeviceId, tag_name: &str, value: &TagValue);
}

/// An address space that swallows everything. Used by tests and by the
/// `validate` command, which materializes devices without serving OPC UA.
#[derive(Debug, Default)]
pub struct NullAddressSpace;

impl AddressSpaceFacade for NullAddressSpace {
    fn install_device(&self, _device: &Device) -> BridgeResult<()> {
        Ok(())
    }

    fn remove_device(&self, _device: &Device) {}

    fn publish(&self, _device_id: &DeviceId, _tag_name: &str, _value: &TagValue) {}
}
