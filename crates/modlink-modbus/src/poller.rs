// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-device periodic poll task.
//!
//! Each outbound device gets one task that ticks every `pollInterval`
//! milliseconds. A tick connects if needed, walks the tags in declared
//! order, decodes each region into the tag store and republishes through
//! the address-space facade. The first failing tag recycles the transport
//! and aborts the rest of the tick; the next tick retries.
//!
//! Ticks for one device never overlap: the interval skips missed ticks
//! instead of queueing them, and the client session lock serializes against
//! concurrent writes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use modlink_core::codec;
use modlink_core::{AddressSpaceFacade, Device, TagStore};

use crate::client::DeviceClient;

/// Handle to a running poller; stopping it cancels the task cleanly.
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signals the poller to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Spawns the poll task for one outbound device.
pub fn spawn_poller(
    device: Device,
    client: Arc<DeviceClient>,
    store: Arc<TagStore>,
    space: Arc<dyn AddressSpaceFacade>,
) -> PollerHandle {
    let (stop, mut stopped) = watch::channel(false);
    let interval = Duration::from_millis(device.poll_interval_ms.max(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(device = %device.id, interval_ms = interval.as_millis() as u64, "poller started");

        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                _ = ticker.tick() => {
                    poll_once(&device, &client, &store, space.as_ref()).await;
                }
            }
        }

        tracing::debug!(device = %device.id, "poller stopped");
    });

    PollerHandle { stop, task }
}

/// Runs one poll tick under the device's session lock.
async fn poll_once(
    device: &Device,
    client: &DeviceClient,
    store: &TagStore,
    space: &dyn AddressSpaceFacade,
) {
    let mut session = client.session().await;

    if let Err(error) = session.ensure_connected().await {
        tracing::debug!(device = %device.id, error = %error, "poll skipped, connect failed");
        return;
    }

    for tag in &device.tags {
        let words = match session.read_region(tag).await {
            Ok(words) => words,
            Err(error) => {
                tracing::warn!(
                    device = %device.id,
                    tag = %tag.name,
                    error = %error,
                    "poll read failed, recycling transport"
                );
                session.recycle().await;
                return;
            }
        };
        match codec::decode(&words, tag.data_type) {
            Ok(value) => {
                store.set_from_wire(&device.id, &tag.name, value.clone());
                space.publish(&device.id, &tag.name, &value);
            }
            Err(error) => {
                tracing::warn!(
                    device = %device.id,
                    tag = %tag.name,
                    error = %error,
                    "poll decode failed, recycling transport"
                );
                session.recycle().await;
                return;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
