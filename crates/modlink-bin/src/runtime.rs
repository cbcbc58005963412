// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Runtime orchestration.
//!
//! Startup order: settings → tag store, client pool, route table and
//! connection registry → OPC UA server and address-space bridge (the one
//! fatal bind) → engine and write worker → catalog bootstrap → modem
//! listener bank → HTTP admin server. Shutdown drains in reverse: HTTP
//! stops accepting, the listener bank closes, pollers cancel and every
//! Modbus transport is released.

use std::sync::Arc;

use tracing::info;

use modlink_api::ApiServer;
use modlink_config::{DeviceCatalog, Settings};
use modlink_core::{write_channel, AddressSpaceFacade, TagStore};
use modlink_engine::Engine;
use modlink_modbus::{ClientOptions, ClientPool, ConnectionRegistry, ModemListenerBank, ModemRouteTable};
use modlink_opcua::{build_server, spawn_server, AddressSpaceBridge};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// The assembled bridge runtime.
pub struct BridgeRuntime {
    settings: Settings,
    shutdown: ShutdownCoordinator,
}

impl BridgeRuntime {
    /// Creates a runtime over validated settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Runs the bridge until an OS termination signal arrives.
    pub async fn run(self) -> BinResult<()> {
        let settings = self.settings.clone();
        info!(version = env!("CARGO_PKG_VERSION"), "starting ModLink");

        // Shared structures.
        let store = Arc::new(TagStore::new());
        let pool = Arc::new(ClientPool::new(ClientOptions {
            connect_timeout: settings.connect_timeout(),
            request_timeout: settings.request_timeout(),
        }));
        let routes = Arc::new(ModemRouteTable::new());
        let registry = Arc::new(ConnectionRegistry::new());

        // OPC UA endpoint: the only fatal bind.
        let (opcua_server, address_space) = build_server(settings.opcua_port)
            .map_err(|e| BinError::Startup(e.to_string()))?;

        let (writer, write_commands) = write_channel();
        // The setter blocks on connect plus one request; give the reply a
        // little slack on top of that.
        let write_timeout =
            settings.connect_timeout() + settings.request_timeout() + std::time::Duration::from_millis(500);
        let bridge = AddressSpaceBridge::new(address_space, store.clone(), writer, write_timeout)
            .map_err(|e| BinError::Startup(e.to_string()))?;
        let facade: Arc<dyn AddressSpaceFacade> = bridge.clone();

        // Engine over the catalog.
        let catalog = DeviceCatalog::new(&settings.catalog_path);
        let engine = Engine::new(
            settings.clone(),
            catalog,
            store.clone(),
            pool,
            routes.clone(),
            registry.clone(),
            facade,
        );
        let write_worker = engine.serve_writes(write_commands);
        engine.bootstrap().await?;

        // Modem listener bank.
        let bank = ModemListenerBank::new(routes, registry, store);
        bank.start(settings.modem_ports()).await;

        // OPC UA sessions run on their own thread for the process lifetime.
        let _opcua_thread = spawn_server(opcua_server);

        // HTTP admin server with graceful shutdown.
        let api = ApiServer::new(engine.clone(), settings.http_port);
        let api_task = tokio::spawn(api.run_with_shutdown(self.shutdown.signal()));

        info!(
            http_port = settings.http_port,
            opcua_port = settings.opcua_port,
            modem_ports = ?settings.modem_ports(),
            "ModLink is ready"
        );

        self.shutdown.wait_for_os_signal().await;
        info!("shutdown initiated, draining");

        bank.stop().await;
        engine.shutdown().await;
        write_worker.abort();
        match api_task.await {
            Ok(result) => result.map_err(BinError::from)?,
            Err(join_error) => {
                return Err(BinError::Startup(format!("HTTP task failed: {}", join_error)))
            }
        }

        info!("ModLink shutdown complete");
        Ok(())
    }
}
