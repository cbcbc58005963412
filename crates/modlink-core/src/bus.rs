// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Write command channel between the address space and the engine.
//!
//! OPC UA attribute setters are synchronous callbacks, while the Modbus
//! write path is async. A setter submits a [`WriteCommand`] through the
//! [`WriteHandle`] and blocks on the reply slot with a bounded timeout; the
//! engine end drains the async receiver and answers each command.

use std::sync::mpsc::SyncSender;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{BridgeError, BridgeResult};
use crate::model::{DeviceId, TagValue};

/// A single tag write travelling from the address space into the engine.
#[derive(Debug)]
pub struct WriteCommand {
    /// Target device.
    pub device_id: DeviceId,
    /// Target tag name.
    pub tag_name: String,
    /// Value to write, already parsed but not yet coerced.
    pub value: TagValue,
    /// Reply slot the submitting side blocks on.
    pub reply: SyncSender<BridgeResult<()>>,
}

/// Receiving end of the write bus, consumed by the engine's write worker.
pub type WriteReceiver = mpsc::UnboundedReceiver<WriteCommand>;

/// Submitting end of the write bus.
#[derive(Debug, Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

/// Creates a connected write handle / receiver pair.
pub fn write_channel() -> (WriteHandle, WriteReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WriteHandle { tx }, rx)
}

impl WriteHandle {
    /// Submits a write and blocks until the engine answers or `timeout`
    /// elapses.
    ///
    /// Intended for synchronous callers only; async code should go through
    /// the engine's write path directly.
    pub fn write_blocking(
        &self,
        device_id: DeviceId,
        tag_name: impl Into<String>,
        value: TagValue,
        timeout: Duration,
    ) -> BridgeResult<()> {
        let (reply, reply_rx) = std::sync::mpsc::sync_channel(1);
        self.tx
            .send(WriteCommand {
                device_id,
                tag_name: tag_name.into(),
                value,
                reply,
            })
            .map_err(|_| BridgeError::internal("write bus closed"))?;
        match reply_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Timeout(timeout)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn write_round_trip() {
        let (handle, mut rx) = write_channel();

        let worker = tokio::spawn(async move {
            let cmd = rx.recv().await.expect("command");
            assert_eq!(cmd.device_id.as_str(), "d1");
            assert_eq!(cmd.tag_name, "t");
            cmd.reply.send(Ok(())).unwrap();
        });

        let result = tokio::task::spawn_blocking(move || {
            handle.write_blocking(
                DeviceId::new("d1"),
                "t",
                TagValue::UInt16(1),
                Duration::from_secs(1),
            )
        })
        .await
        .unwrap();

        assert!(result.is_ok());
        worker.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn write_times_out_without_worker() {
        let (handle, _rx) = write_channel();
        let result = tokio::task::spawn_blocking(move || {
            handle.write_blocking(
                DeviceId::new("d1"),
                "t",
                TagValue::UInt16(1),
                Duration::from_millis(50),
            )
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(BridgeError::Timeout(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn closed_bus_reports_internal_error() {
        let (handle, rx) = write_channel();
        drop(rx);
        let result = tokio::task::spawn_blocking(move || {
            handle.write_blocking(
                DeviceId::new("d1"),
                "t",
                TagValue::UInt16(1),
                Duration::from_millis(50),
            )
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(BridgeError::Internal { .. })));
    }
}
