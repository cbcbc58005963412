// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! One coordinator fans a single shutdown event out to every component:
//! the HTTP server's graceful-shutdown future, the listener bank and the
//! engine's drain. The event fires on SIGTERM/SIGINT or an explicit
//! trigger.

use tokio::sync::broadcast;
use tracing::info;

/// Fans the shutdown event out to subscribers.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with no subscribers yet.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Returns a future that resolves when shutdown is triggered.
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            let _ = receiver.recv().await;
        }
    }

    /// Triggers shutdown for all subscribers. Idempotent.
    pub fn trigger(&self) {
        let _ = self.sender.send(());
    }

    /// Blocks until an OS termination signal arrives, then triggers
    /// shutdown.
    pub async fn wait_for_os_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("install SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("install SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
            info!("received Ctrl+C");
        }

        self.trigger();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
