// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-device Modbus client with lazy connect and reconnect-on-failure.
//!
//! A [`DeviceClient`] wraps one `tokio-modbus` context behind a mutex. The
//! mutex is exposed as a [`ClientSession`] guard so a whole exchange (the
//! poll tick's reads, or a write followed by the store update) holds the
//! per-device lock and Modbus operations on one transport never interleave.
//!
//! Failure policy: a transport error or timeout closes the context
//! best-effort and marks the entry disconnected; the next session re-dials.
//! There is no backoff. A clean Modbus exception response keeps the
//! connection and surfaces as a protocol error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tokio_modbus::client::{Context as ModbusContext, Reader, Writer};
use tokio_modbus::prelude::*;
use tokio_modbus::{Error as TokioModbusError, ExceptionCode};
use tokio_serial::SerialPortBuilderExt;

use modlink_core::codec;
use modlink_core::{
    BridgeError, BridgeResult, Device, DeviceId, RegisterClass, SerialParity, Tag, TagDataType,
    TagValue, Transport,
};

// =============================================================================
// ClientOptions
// =============================================================================

/// Timeouts applied to every connect and request.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Bound on transport dial/open.
    pub connect_timeout: Duration,
    /// Bound on each Modbus request/response exchange.
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(2),
        }
    }
}

// =============================================================================
// DeviceClient
// =============================================================================

struct ClientInner {
    context: Option<ModbusContext>,
}

/// One outbound device's Modbus client entry.
///
/// The entry lives for the device lifetime; its transport may cycle
/// independently through disconnect and reconnect.
pub struct DeviceClient {
    device_id: DeviceId,
    unit_id: u8,
    transport: Transport,
    options: ClientOptions,
    inner: Mutex<ClientInner>,
    connected: AtomicBool,
}

impl DeviceClient {
    /// Creates a client entry for a non-modem device.
    pub fn new(device: &Device, options: ClientOptions) -> BridgeResult<Self> {
        if device.is_modem() {
            return Err(BridgeError::internal(format!(
                "device '{}' is a modem and has no outbound client",
                device.id
            )));
        }
        Ok(Self {
            device_id: device.id.clone(),
            unit_id: device.device_id,
            transport: device.transport.clone(),
            options,
            inner: Mutex::new(ClientInner { context: None }),
            connected: AtomicBool::new(false),
        })
    }

    /// Returns the device id this entry belongs to.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Returns `true` while the transport is believed healthy.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Acquires the per-device transaction lock.
    pub async fn session(&self) -> ClientSession<'_> {
        ClientSession {
            client: self,
            guard: self.inner.lock().await,
        }
    }

    /// Closes the transport best-effort and marks the entry disconnected.
    pub async fn disconnect(&self) {
        let mut session = self.session().await;
        session.recycle().await;
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("device_id", &self.device_id)
            .field("unit_id", &self.unit_id)
            .field("target", &self.transport.target())
            .field("connected", &self.is_connected())
            .finish()
    }
}

// =============================================================================
// ClientSession
// =============================================================================

/// Exclusive access to a device's transport for one exchange.
pub struct ClientSession<'a> {
    client: &'a DeviceClient,
    guard: MutexGuard<'a, ClientInner>,
}

impl ClientSession<'_> {
    /// Opens the transport if it is not already open and assigns the unit id.
    ///
    /// On failure the entry stays disconnected and `ConnectFailed` is
    /// returned; the next call re-dials.
    pub async fn ensure_connected(&mut self) -> BridgeResult<()> {
        if self.guard.context.is_some() {
            return Ok(());
        }

        let target = self.client.transport.target();
        let slave = Slave(self.client.unit_id);
        let connect = async {
            match &self.client.transport {
                Transport::Tcp { address, port } => {
                    let stream = TcpStream::connect((address.as_str(), *port))
                        .await
                        .map_err(|e| BridgeError::connect_failed(&target, e))?;
                    stream.set_nodelay(true).ok();
                    Ok(tcp::attach_slave(stream, slave))
                }
                Transport::Rtu {
                    serial_port,
                    baud_rate,
                    parity,
                    data_bits,
                    stop_bits,
                } => {
                    let builder = tokio_serial::new(serial_port.as_str(), *baud_rate)
                        .parity(serial_parity(*parity))
                        .data_bits(serial_data_bits(*data_bits))
                        .stop_bits(serial_stop_bits(*stop_bits));
                    let port = builder
                        .open_native_async()
                        .map_err(|e| BridgeError::connect_failed(&target, e))?;
                    Ok(rtu::attach_slave(port, slave))
                }
                Transport::TcpModem { .. } => Err(BridgeError::internal(
                    "modem devices have no outbound transport",
                )),
            }
        };

        let context = timeout(self.client.options.connect_timeout, connect)
            .await
            .map_err(|_| {
                BridgeError::connect_failed(
                    &target,
                    format!(
                        "timed out after {:?}",
                        self.client.options.connect_timeout
                    ),
                )
            })??;

        self.guard.context = Some(context);
        self.client.connected.store(true, Ordering::Relaxed);
        tracing::info!(
            device = %self.client.device_id,
            target = %target,
            unit_id = self.client.unit_id,
            "modbus transport connected"
        );
        Ok(())
    }

    /// Reads the register region backing a tag and returns it as raw words.
    ///
    /// Bit classes read a single coil/discrete input; register classes read
    /// [`codec::register_count`] registers.
    pub async fn read_region(&mut self, tag: &Tag) -> BridgeResult<Vec<u16>> {
        let count = codec::register_count(tag.data_type);
        let op_timeout = self.client.options.request_timeout;
        let context = self.context()?;

        let result = match tag.register_type {
            RegisterClass::Holding => {
                timeout(op_timeout, context.read_holding_registers(tag.address, count)).await
            }
            RegisterClass::Input => {
                timeout(op_timeout, context.read_input_registers(tag.address, count)).await
            }
            RegisterClass::Coil => {
                match timeout(op_timeout, context.read_coils(tag.address, 1)).await {
                    Ok(inner) => Ok(inner.map(|r| r.map(words_from_bits))),
                    Err(elapsed) => Err(elapsed),
                }
            }
            RegisterClass::Discrete => {
                match timeout(op_timeout, context.read_discrete_inputs(tag.address, 1)).await {
                    Ok(inner) => Ok(inner.map(|r| r.map(words_from_bits))),
                    Err(elapsed) => Err(elapsed),
                }
            }
        };

        self.settle(result).await
    }

    /// Writes a typed value to a tag's registers.
    ///
    /// Holding registers use FC06 (16-bit types) or FC16 (two-register
    /// types); coils use FC05. Any other combination fails with
    /// `NotWritable` before touching the wire.
    pub async fn write_tag(&mut self, tag: &Tag, value: &TagValue) -> BridgeResult<()> {
        match tag.register_type {
            RegisterClass::Holding => {
                let words = codec::encode(value, tag.data_type)?;
                let op_timeout = self.client.options.request_timeout;
                let address = tag.address;
                let context = self.context()?;
                let result = if words.len() == 1 {
                    timeout(op_timeout, context.write_single_register(address, words[0])).await
                } else {
                    timeout(op_timeout, context.write_multiple_registers(address, &words)).await
                };
                self.settle(result).await
            }
            RegisterClass::Coil => {
                let state = match value.coerce(TagDataType::Boolean)? {
                    TagValue::Bool(b) => b,
                    _ => unreachable!(),
                };
                let op_timeout = self.client.options.request_timeout;
                let address = tag.address;
                let context = self.context()?;
                let result = timeout(op_timeout, context.write_single_coil(address, state)).await;
                self.settle(result).await
            }
            RegisterClass::Input | RegisterClass::Discrete => Err(BridgeError::not_writable(
                format!("tag '{}' is a {} register", tag.name, tag.register_type),
            )),
        }
    }

    /// Closes the transport best-effort and marks the entry disconnected.
    pub async fn recycle(&mut self) {
        if let Some(mut context) = self.guard.context.take() {
            if let Err(e) = context.disconnect().await {
                tracing::debug!(device = %self.client.device_id, error = %e, "disconnect failed");
            }
        }
        self.client.connected.store(false, Ordering::Relaxed);
    }

    fn context(&mut self) -> BridgeResult<&mut ModbusContext> {
        self.guard
            .context
            .as_mut()
            .ok_or_else(|| BridgeError::transport("not connected"))
    }

    /// Collapses a timed, nested Modbus result, recycling the transport on
    /// transport-level failures.
    async fn settle<T>(
        &mut self,
        result: Result<Result<Result<T, ExceptionCode>, TokioModbusError>, tokio::time::error::Elapsed>,
    ) -> BridgeResult<T> {
        match result {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(exception))) => Err(BridgeError::protocol(format!(
                "modbus exception {:?} from unit {}",
                exception, self.client.unit_id
            ))),
            Ok(Err(error)) => {
                self.recycle().await;
                Err(map_modbus_error(error))
            }
            Err(_) => {
                self.recycle().await;
                Err(BridgeError::Timeout(self.client.options.request_timeout))
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn words_from_bits(bits: Vec<bool>) -> Vec<u16> {
    bits.into_iter().map(u16::from).collect()
}

fn map_modbus_error(error: TokioModbusError) -> BridgeError {
    match error {
        TokioModbusError::Transport(io) => BridgeError::transport(io),
        TokioModbusError::Protocol(protocol) => {
            BridgeError::protocol(format!("{:?}", protocol))
        }
    }
}

fn serial_parity(parity: SerialParity) -> tokio_serial::Parity {
    match parity {
        SerialParity::None => tokio_serial::Parity::None,
        SerialParity::Even => tokio_serial::Parity::Even,
        SerialParity::Odd => tokio_serial::Parity::Odd,
    }
}

fn serial_data_bits(bits: u8) -> tokio_serial::DataBits {
    match bits {
        7 => tokio_serial::DataBits::Seven,
        _ => tokio_serial::DataBits::Eight,
    }
}

fn serial_stop_bits(bits: u8) -> tokio_serial::StopBits {
    match bits {
        2 => tokio_serial::StopBits::Two,
        _ => tokio_serial::StopBits::One,
    }
}

// =============================================================================
// Tests
// =============================================================================
