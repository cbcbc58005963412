// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Wire-level tests for the modem listener bank: a raw TCP client plays the
//! part of the dialing field device.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use modlink_core::{Device, DeviceId, RegisterClass, Tag, TagDataType, TagStore, TagValue, Transport};
use modlink_modbus::{ConnectionRegistry, ModemListenerBank, ModemRouteTable};

const TEST_PORT: u16 = 47811;

fn modem_device(port: u16) -> Device {
    Device {
        id: DeviceId::new("m1"),
        name: "meter".to_string(),
        transport: Transport::TcpModem { port },
        device_id: 7,
        poll_interval_ms: 2000,
        tags: vec![Tag {
            name: "x".to_string(),
            address: 10,
            register_type: RegisterClass::Holding,
            data_type: TagDataType::UInt16,
            current_value: Some(TagValue::UInt16(42)),
        }],
    }
}

fn mbap_fc3(transaction_id: u16, unit_id: u8, start: u16, quantity: u16) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&6u16.to_be_bytes());
    frame.push(unit_id);
    frame.push(0x03);
    frame.extend_from_slice(&start.to_be_bytes());
    frame.extend_from_slice(&quantity.to_be_bytes());
    frame
}

async fn start_bank(port: u16) -> (ModemListenerBank, Arc<ConnectionRegistry>) {
    let device = modem_device(port);

    let routes = Arc::new(ModemRouteTable::new());
    routes.insert(&device);
    let registry = Arc::new(ConnectionRegistry::new());
    let store = Arc::new(TagStore::new());
    store.install(&device);

    let bank = ModemListenerBank::new(routes, registry.clone(), store);
    assert_eq!(bank.start(port..=port).await, 1);
    (bank, registry)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within one second");
}

#[tokio::test]
async fn modem_responder_answers_fc3() {
    let (bank, registry) = start_bank(TEST_PORT).await;

    let mut stream = TcpStream::connect(("127.0.0.1", TEST_PORT)).await.unwrap();
    stream.write_all(&mbap_fc3(0x0001, 7, 10, 1)).await.unwrap();

    let mut response = [0u8; 11];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(
        response,
        [0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x07, 0x03, 0x02, 0x00, 0x2A]
    );

    wait_for(|| registry.len() == 1).await;
    drop(stream);
    wait_for(|| registry.is_empty()).await;

    bank.stop().await;
}

#[tokio::test]
async fn unknown_unit_is_dropped_and_session_survives() {
    let port = TEST_PORT + 1;
    let (bank, registry) = start_bank(port).await;

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

    // Unit 9 has no route; the frame must be consumed without an answer.
    stream.write_all(&mbap_fc3(0x0001, 9, 10, 1)).await.unwrap();
    // The follow-up frame for unit 7 is still served on the same session.
    stream.write_all(&mbap_fc3(0x0002, 7, 10, 1)).await.unwrap();

    let mut response = [0u8; 11];
    stream.read_exact(&mut response).await.unwrap();
    assert_eq!(u16::from_be_bytes([response[0], response[1]]), 0x0002);
    assert_eq!(&response[9..11], &[0x00, 0x2A]);

    assert_eq!(registry.len(), 1);
    bank.stop().await;
    wait_for(|| registry.is_empty()).await;
}

#[tokio::test]
async fn registry_lists_remote_endpoint() {
    let port = TEST_PORT + 2;
    let (bank, registry) = start_bank(port).await;

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    wait_for(|| registry.len() == 1).await;

    let listed = registry.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].listen_port, port);
    assert_eq!(listed[0].remote_address, "127.0.0.1");
    assert!(listed[0].connected);

    drop(stream);
    wait_for(|| registry.is_empty()).await;
    bank.stop().await;
}
