// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The modem listener bank.
//!
//! Inbound "modem" devices dial one of a contiguous range of TCP listener
//! ports and then act as Modbus clients; the bridge is the server. Each
//! accepted connection runs a session that reads Modbus/TCP frames and
//! routes them by `(listen-port, unit-id)` to the matching configured
//! device. Only FC03 (Read Holding Registers) is answered, from the tag
//! store; other function codes and unroutable frames are consumed silently.
//!
//! The FC03 response follows the modem's dialect rather than generic
//! Modbus: a `float` tag answers with the 4 big-endian bytes of the value,
//! anything else with the rounded value as one big-endian word. The
//! requested quantity is parsed but ignored; only the tag whose address
//! equals the start address is served.
//!
//! Live connections are tracked in a registry keyed
//! `remote-ip:remote-port:listen-port` and removed on close or error.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use modlink_core::{Device, DeviceId, Tag, TagDataType, TagStore, TagValue};

// =============================================================================
// Route Table
// =============================================================================

/// Routing target for one `(listen-port, unit-id)` pair.
#[derive(Debug, Clone)]
struct ModemRoute {
    device_id: DeviceId,
    tags: Vec<Tag>,
}

/// Maps `(listen-port, unit-id)` to the configured modem device.
///
/// Admin operations register and deregister routes; sessions look them up
/// per frame so removals take effect immediately.
#[derive(Default)]
pub struct ModemRouteTable {
    routes: RwLock<HashMap<(u16, u8), ModemRoute>>,
}

impl ModemRouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a modem device as a routing target.
    pub fn insert(&self, device: &Device) {
        if let Some(port) = device.transport.listen_port() {
            self.routes.write().insert(
                (port, device.device_id),
                ModemRoute {
                    device_id: device.id.clone(),
                    tags: device.tags.clone(),
                },
            );
        }
    }

    /// Deregisters a device from the table.
    pub fn remove(&self, device: &Device) {
        if let Some(port) = device.transport.listen_port() {
            self.routes.write().remove(&(port, device.device_id));
        }
    }

    /// Returns `true` if any device routes through the given listen port.
    pub fn serves_port(&self, port: u16) -> bool {
        self.routes.read().keys().any(|(p, _)| *p == port)
    }

    fn lookup(&self, port: u16, unit_id: u8) -> Option<ModemRoute> {
        self.routes.read().get(&(port, unit_id)).cloned()
    }
}

// =============================================================================
// Connection Registry
// =============================================================================

/// A live modem session, as exposed to the HTTP layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModemConnection {
    /// Peer IP address.
    pub remote_address: String,
    /// Peer TCP port.
    pub remote_port: u16,
    /// The local listener port the peer dialed.
    pub listen_port: u16,
    /// Always `true` while the entry exists.
    pub connected: bool,
}

/// Registry of live modem sessions keyed `remote-ip:remote-port:listen-port`.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ModemConnection>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(peer: &SocketAddr, listen_port: u16) -> String {
        format!("{}:{}:{}", peer.ip(), peer.port(), listen_port)
    }

    fn insert(&self, peer: &SocketAddr, listen_port: u16) -> String {
        let key = Self::key(peer, listen_port);
        self.connections.insert(
            key.clone(),
            ModemConnection {
                remote_address: peer.ip().to_string(),
                remote_port: peer.port(),
                listen_port,
                connected: true,
            },
        );
        key
    }

    fn remove(&self, key: &str) {
        self.connections.remove(key);
    }

    /// Returns a snapshot of the live sessions.
    pub fn list(&self) -> Vec<ModemConnection> {
        let mut out: Vec<_> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| {
            (a.listen_port, &a.remote_address, a.remote_port)
                .cmp(&(b.listen_port, &b.remote_address, b.remote_port))
        });
        out
    }

    /// Returns `true` if any session arrived on the given listener port.
    pub fn has_listen_port(&self, port: u16) -> bool {
        self.connections
            .iter()
            .any(|entry| entry.value().listen_port == port)
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no session is live.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

// =============================================================================
// Listener Bank
// =============================================================================

/// The bank of TCP listeners for inbound modem devices.
pub struct ModemListenerBank {
    routes: Arc<ModemRouteTable>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<TagStore>,
    stop: watch::Sender<bool>,
    listeners: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl ModemListenerBank {
    /// Creates a bank over the shared route table, registry and tag store.
    pub fn new(
        routes: Arc<ModemRouteTable>,
        registry: Arc<ConnectionRegistry>,
        store: Arc<TagStore>,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            routes,
            registry,
            store,
            stop,
            listeners: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Binds a listener on every port in the inclusive range.
    ///
    /// A port that fails to bind is logged and skipped; the bank is not
    /// fatal to startup. Returns the number of listeners opened.
    pub async fn start(&self, ports: RangeInclusive<u16>) -> usize {
        let mut opened = 0;
        for port in ports {
            match TcpListener::bind(("0.0.0.0", port)).await {
                Ok(listener) => {
                    opened += 1;
                    let routes = self.routes.clone();
                    let registry = self.registry.clone();
                    let store = self.store.clone();
                    let mut stopped = self.stop.subscribe();
                    let handle = tokio::spawn(async move {
                        loop {
                            tokio::select! {
                                _ = stopped.changed() => break,
                                accepted = listener.accept() => match accepted {
                                    Ok((stream, peer)) => {
                                        let session_stop = stopped.clone();
                                        tokio::spawn(run_session(
                                            stream,
                                            peer,
                                            port,
                                            routes.clone(),
                                            registry.clone(),
                                            store.clone(),
                                            session_stop,
                                        ));
                                    }
                                    Err(error) => {
                                        tracing::warn!(port, error = %error, "modem accept failed");
                                    }
                                },
                            }
                        }
                    });
                    self.listeners.lock().push(handle);
                }
                Err(error) => {
                    tracing::warn!(port, error = %error, "modem listener bind failed, skipping port");
                }
            }
        }
        tracing::info!(listeners = opened, "modem listener bank started");
        opened
    }

    /// Stops all listeners and signals live sessions to end.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let handles: Vec<_> = self.listeners.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

// =============================================================================
// Session
// =============================================================================

async fn run_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    listen_port: u16,
    routes: Arc<ModemRouteTable>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<TagStore>,
    mut stopped: watch::Receiver<bool>,
) {
    let key = registry.insert(&peer, listen_port);
    tracing::info!(%peer, listen_port, "modem connected");

    loop {
        let mut header = [0u8; 7];
        let read = tokio::select! {
            _ = stopped.changed() => break,
            read = stream.read_exact(&mut header) => read,
        };
        if read.is_err() {
            break; // peer closed or transport failed
        }

        let transaction_id = u16::from_be_bytes([header[0], header[1]]);
        let protocol_id = u16::from_be_bytes([header[2], header[3]]);
        let length = u16::from_be_bytes([header[4], header[5]]);
        let unit_id = header[6];

        // The length field covers the unit id plus the PDU. A value outside
        // the legal frame size means the stream is desynchronized.
        if protocol_id != 0 || !(2..=260).contains(&length) {
            tracing::warn!(%peer, listen_port, protocol_id, length, "malformed MBAP header, closing session");
            break;
        }

        let mut pdu = vec![0u8; length as usize - 1];
        if stream.read_exact(&mut pdu).await.is_err() {
            break;
        }

        let Some(response) = answer_frame(
            &routes,
            &store,
            listen_port,
            transaction_id,
            unit_id,
            &pdu,
        ) else {
            continue; // silently dropped
        };

        if let Err(error) = stream.write_all(&response).await {
            tracing::debug!(%peer, listen_port, error = %error, "modem write failed");
            break;
        }
    }

    registry.remove(&key);
    tracing::info!(%peer, listen_port, "modem disconnected");
}

/// Produces the response for one inbound PDU, or `None` to drop the frame.
fn answer_frame(
    routes: &ModemRouteTable,
    store: &TagStore,
    listen_port: u16,
    transaction_id: u16,
    unit_id: u8,
    pdu: &[u8],
) -> Option<Vec<u8>> {
    let function_code = *pdu.first()?;
    if function_code != 0x03 {
        tracing::debug!(listen_port, unit_id, function_code, "ignoring unsupported function code");
        return None;
    }
    if pdu.len() < 5 {
        tracing::debug!(listen_port, unit_id, "short FC03 request dropped");
        return None;
    }
    let start_address = u16::from_be_bytes([pdu[1], pdu[2]]);
    // Quantity is parsed but unused: only the tag at the start address is served.
    let _quantity = u16::from_be_bytes([pdu[3], pdu[4]]);

    let route = match routes.lookup(listen_port, unit_id) {
        Some(route) => route,
        None => {
            tracing::debug!(listen_port, unit_id, "no modem route, frame dropped");
            return None;
        }
    };
    let tag = match route.tags.iter().find(|t| t.address == start_address) {
        Some(tag) => tag,
        None => {
            tracing::debug!(
                listen_port,
                unit_id,
                start_address,
                device = %route.device_id,
                "no tag at address, frame dropped"
            );
            return None;
        }
    };

    let value = store
        .get(&route.device_id, &tag.name)
        .and_then(|state| state.value);
    Some(fc3_response(transaction_id, unit_id, tag, value.as_ref()))
}

/// Builds the MBAP + FC03 response frame.
///
/// A `float` tag answers with the 4 big-endian bytes of the value; every
/// other type answers with the rounded value as one big-endian word. An
/// unset value answers as zero.
fn fc3_response(
    transaction_id: u16,
    unit_id: u8,
    tag: &Tag,
    value: Option<&TagValue>,
) -> Vec<u8> {
    let payload: Vec<u8> = if tag.data_type == TagDataType::Float {
        let raw = value.map(|v| v.as_f64() as f32).unwrap_or(0.0);
        raw.to_be_bytes().to_vec()
    } else {
        let rounded = value.map(|v| v.as_f64().round()).unwrap_or(0.0);
        let word = rounded as i64 as u16;
        word.to_be_bytes().to_vec()
    };

    // MBAP length: unit id + function code + byte count + payload.
    let length = (3 + payload.len()) as u16;
    let mut frame = Vec::with_capacity(7 + 2 + payload.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.push(unit_id);
    frame.push(0x03);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(&payload);
    frame
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{RegisterClass, Transport};

    fn modem_device(port: u16, unit_id: u8) -> Device {
        Device {
            id: DeviceId::new("m1"),
            name: "meter".to_string(),
            transport: Transport::TcpModem { port },
            device_id: unit_id,
            poll_interval_ms: 2000,
            tags: vec![
                Tag {
                    name: "x".to_string(),
                    address: 10,
                    register_type: RegisterClass::Holding,
                    data_type: TagDataType::UInt16,
                    current_value: Some(TagValue::UInt16(42)),
                },
                Tag {
                    name: "f".to_string(),
                    address: 20,
                    register_type: RegisterClass::Holding,
                    data_type: TagDataType::Float,
                    current_value: Some(TagValue::Float(3.14)),
                },
            ],
        }
    }

    fn fc3_request(start: u16, quantity: u16) -> Vec<u8> {
        let mut pdu = vec![0x03];
        pdu.extend_from_slice(&start.to_be_bytes());
        pdu.extend_from_slice(&quantity.to_be_bytes());
        pdu
    }

    fn harness(device: &Device) -> (ModemRouteTable, TagStore) {
        let routes = ModemRouteTable::new();
        routes.insert(device);
        let store = TagStore::new();
        store.install(device);
        (routes, store)
    }

    #[test]
    fn word_response_frame() {
        let device = modem_device(8000, 7);
        let (routes, store) = harness(&device);

        let frame = answer_frame(&routes, &store, 8000, 0x0001, 7, &fc3_request(10, 1)).unwrap();
        assert_eq!(
            frame,
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x07, 0x03, 0x02, 0x00, 0x2A]
        );
    }

    #[test]
    fn float_response_carries_four_bytes() {
        let device = modem_device(8000, 7);
        let (routes, store) = harness(&device);

        let frame = answer_frame(&routes, &store, 8000, 0x0002, 7, &fc3_request(20, 2)).unwrap();
        // length = 1 (unit) + 1 (fc) + 1 (byte count) + 4 (payload)
        assert_eq!(&frame[4..6], &[0x00, 0x07]);
        assert_eq!(frame[8], 4);
        let bits = u32::from_be_bytes([frame[9], frame[10], frame[11], frame[12]]);
        assert!((f32::from_bits(bits) - 3.14).abs() < 1e-6);
    }

    #[test]
    fn unknown_unit_or_port_is_dropped() {
        let device = modem_device(8000, 7);
        let (routes, store) = harness(&device);

        assert!(answer_frame(&routes, &store, 8000, 1, 9, &fc3_request(10, 1)).is_none());
        assert!(answer_frame(&routes, &store, 8001, 1, 7, &fc3_request(10, 1)).is_none());
    }

    #[test]
    fn unknown_address_and_function_codes_are_dropped() {
        let device = modem_device(8000, 7);
        let (routes, store) = harness(&device);

        assert!(answer_frame(&routes, &store, 8000, 1, 7, &fc3_request(99, 1)).is_none());
        // FC06 write is not answered in this dialect.
        let write_pdu = vec![0x06, 0x00, 0x0A, 0x00, 0x01];
        assert!(answer_frame(&routes, &store, 8000, 1, 7, &write_pdu).is_none());
        // Truncated FC03.
        assert!(answer_frame(&routes, &store, 8000, 1, 7, &[0x03, 0x00]).is_none());
    }

    #[test]
    fn unset_value_answers_zero() {
        let mut device = modem_device(8000, 7);
        device.tags[0].current_value = None;
        let (routes, store) = harness(&device);

        let frame = answer_frame(&routes, &store, 8000, 1, 7, &fc3_request(10, 1)).unwrap();
        assert_eq!(&frame[9..11], &[0x00, 0x00]);
    }

    #[test]
    fn route_table_follows_device_lifecycle() {
        let device = modem_device(8000, 7);
        let routes = ModemRouteTable::new();
        routes.insert(&device);
        assert!(routes.serves_port(8000));
        assert!(routes.lookup(8000, 7).is_some());

        routes.remove(&device);
        assert!(!routes.serves_port(8000));
        assert!(routes.lookup(8000, 7).is_none());
    }

    #[test]
    fn registry_listing_is_sorted_and_keyed() {
        let registry = ConnectionRegistry::new();
        let peer_a: SocketAddr = "10.0.0.9:40001".parse().unwrap();
        let peer_b: SocketAddr = "10.0.0.8:40002".parse().unwrap();

        let key_a = registry.insert(&peer_a, 8001);
        registry.insert(&peer_b, 8000);
        assert_eq!(registry.len(), 2);
        assert!(registry.has_listen_port(8000));

        let listed = registry.list();
        assert_eq!(listed[0].listen_port, 8000);
        assert_eq!(listed[1].remote_address, "10.0.0.9");

        registry.remove(&key_a);
        assert_eq!(registry.len(), 1);
        assert!(!registry.has_listen_port(8001));
    }

    #[test]
    fn connection_serializes_camel_case() {
        let connection = ModemConnection {
            remote_address: "10.0.0.9".to_string(),
            remote_port: 40001,
            listen_port: 8000,
            connected: true,
        };
        let json = serde_json::to_value(&connection).unwrap();
        assert_eq!(json["remoteAddress"], "10.0.0.9");
        assert_eq!(json["listenPort"], 8000);
        assert_eq!(json["connected"], true);
    }
}
