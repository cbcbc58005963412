// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA server construction.
//!
//! The endpoint is anonymous and unencrypted; authentication is out of
//! scope for this bridge. Failing to bind the endpoint port is the one
//! fatal startup error, so the port is probed before the server thread
//! starts (the crate's run loop only reports bind errors from inside its
//! own runtime).

use std::net::TcpListener as StdTcpListener;

use opcua::server::prelude::*;

use modlink_core::{BridgeError, BridgeResult};

/// Application URI used for the server and its namespace.
pub const APPLICATION_URI: &str = "urn:modlink:bridge";

/// Builds the OPC UA server with an anonymous endpoint on the given port.
///
/// Returns the server and its address space handle. Fails if the port
/// cannot be bound.
pub fn build_server(port: u16) -> BridgeResult<(Server, std::sync::Arc<opcua::sync::RwLock<AddressSpace>>)> {
    // Probe the port up front; Server::run would only surface the bind
    // failure on its own thread.
    StdTcpListener::bind(("0.0.0.0", port))
        .map_err(|e| BridgeError::internal(format!("cannot bind OPC UA endpoint port {}: {}", port, e)))?;

    let server = ServerBuilder::new_anonymous("ModLink")
        .application_uri(APPLICATION_URI)
        .product_uri(APPLICATION_URI)
        .host_and_port("0.0.0.0", port)
        .discovery_urls(vec![format!("opc.tcp://0.0.0.0:{}/", port)])
        .create_sample_keypair(false)
        .server()
        .ok_or_else(|| BridgeError::internal("invalid OPC UA server configuration"))?;

    let address_space = server.address_space();
    tracing::info!(port, "OPC UA endpoint configured");
    Ok((server, address_space))
}

/// Runs the server on its own thread.
///
/// The thread lives for the process lifetime; the server's session
/// machinery is torn down with the process.
pub fn spawn_server(server: Server) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("opcua-server".to_string())
        .spawn(move || {
            server.run();
        })
        .expect("spawn opcua server thread")
}
