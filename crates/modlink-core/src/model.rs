// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data model for devices, tags and tag values.
//!
//! The JSON shapes defined here are shared by the persisted device catalog
//! and the HTTP admin surface: field names are camelCase, the transport is
//! selected by the `type` field, and tag values serialize as bare scalars.

use std::fmt;
use std::ops::RangeInclusive;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec;
use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// Identifiers
// =============================================================================

/// A unique identifier for a device.
///
/// Device ids are opaque strings, stable across restarts and unique within a
/// bridge instance. Ids are generated (UUID v4) when a device is added
/// without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a new device id.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty (not yet assigned).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Register and Data Types
// =============================================================================

/// The four Modbus register classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterClass {
    /// Read-write 16-bit registers (FC03 read, FC06/FC16 write).
    Holding,
    /// Read-only 16-bit registers (FC04).
    Input,
    /// Read-write single bits (FC01 read, FC05 write).
    Coil,
    /// Read-only single bits (FC02).
    Discrete,
}

impl RegisterClass {
    /// Returns the class name as used on the wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterClass::Holding => "holding",
            RegisterClass::Input => "input",
            RegisterClass::Coil => "coil",
            RegisterClass::Discrete => "discrete",
        }
    }

    /// Returns `true` for the single-bit classes.
    #[inline]
    pub fn is_bit(&self) -> bool {
        matches!(self, RegisterClass::Coil | RegisterClass::Discrete)
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The data types a tag can decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagDataType {
    /// IEEE 754 single precision, two registers.
    Float,
    /// Signed 32-bit, two registers.
    Int32,
    /// Unsigned 32-bit, two registers.
    UInt32,
    /// Signed 16-bit, one register.
    Int16,
    /// Unsigned 16-bit, one register.
    UInt16,
    /// Single bit.
    Boolean,
}

impl TagDataType {
    /// Returns the type name as used in catalog records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagDataType::Float => "float",
            TagDataType::Int32 => "int32",
            TagDataType::UInt32 => "uint32",
            TagDataType::Int16 => "int16",
            TagDataType::UInt16 => "uint16",
            TagDataType::Boolean => "boolean",
        }
    }

    /// Returns `true` for the types occupying two consecutive registers.
    #[inline]
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            TagDataType::Float | TagDataType::Int32 | TagDataType::UInt32
        )
    }

    /// Parses a raw admin input (JSON scalar, numbers possibly as strings)
    /// into a value of this type.
    ///
    /// Numeric parse from string is accepted; booleans accept `true`/`false`,
    /// `1`/`0` and nonzero numbers.
    pub fn parse_value(&self, raw: &serde_json::Value) -> BridgeResult<TagValue> {
        let scalar = match raw {
            serde_json::Value::String(s) => {
                let s = s.trim();
                if *self == TagDataType::Boolean {
                    match s {
                        "true" | "1" => return Ok(TagValue::Bool(true)),
                        "false" | "0" => return Ok(TagValue::Bool(false)),
                        _ => {}
                    }
                }
                let number = if let Ok(i) = s.parse::<i64>() {
                    serde_json::json!(i)
                } else {
                    let f: f64 = s.parse().map_err(|_| {
                        BridgeError::validation(format!("cannot parse '{}' as {}", s, self))
                    })?;
                    serde_json::json!(f)
                };
                TagValue::from_json(&number).ok_or_else(|| {
                    BridgeError::validation(format!("cannot parse '{}' as {}", s, self))
                })?
            }
            serde_json::Value::Bool(b) => TagValue::Bool(*b),
            serde_json::Value::Number(_) => TagValue::from_json(raw).ok_or_else(|| {
                BridgeError::validation(format!("cannot parse '{}' as {}", raw, self))
            })?,
            other => {
                return Err(BridgeError::validation(format!(
                    "cannot parse '{}' as {}",
                    other, self
                )))
            }
        };
        scalar.coerce(*self)
    }
}

impl fmt::Display for TagDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// TagValue
// =============================================================================

/// A typed tag value.
///
/// Every value carries its kind in the type system; conversion to and from
/// register words lives in [`crate::codec`]. On the wire (catalog and HTTP)
/// a value is a bare JSON scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// 32-bit float.
    Float(f32),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Boolean.
    Bool(bool),
}

impl TagValue {
    /// Returns the data type of this value.
    pub fn kind(&self) -> TagDataType {
        match self {
            TagValue::Float(_) => TagDataType::Float,
            TagValue::Int32(_) => TagDataType::Int32,
            TagValue::UInt32(_) => TagDataType::UInt32,
            TagValue::Int16(_) => TagDataType::Int16,
            TagValue::UInt16(_) => TagDataType::UInt16,
            TagValue::Bool(_) => TagDataType::Boolean,
        }
    }

    /// Returns the value as an `f64` (booleans map to 0/1).
    pub fn as_f64(&self) -> f64 {
        match self {
            TagValue::Float(v) => *v as f64,
            TagValue::Int32(v) => *v as f64,
            TagValue::UInt32(v) => *v as f64,
            TagValue::Int16(v) => *v as f64,
            TagValue::UInt16(v) => *v as f64,
            TagValue::Bool(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Builds a best-fit value from a JSON scalar.
    ///
    /// Integers settle into the narrowest fitting kind; the declared tag type
    /// is applied afterwards with [`TagValue::coerce`].
    pub fn from_json(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::Bool(b) => Some(TagValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    if u <= u16::MAX as u64 {
                        return Some(TagValue::UInt16(u as u16));
                    }
                    if u <= u32::MAX as u64 {
                        return Some(TagValue::UInt32(u as u32));
                    }
                }
                if let Some(i) = n.as_i64() {
                    if i >= i16::MIN as i64 && i <= i16::MAX as i64 {
                        return Some(TagValue::Int16(i as i16));
                    }
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        return Some(TagValue::Int32(i as i32));
                    }
                }
                n.as_f64().map(|f| TagValue::Float(f as f32))
            }
            _ => None,
        }
    }

    /// Converts this value into the given data type.
    ///
    /// Numeric kinds convert between each other with range checks; a value
    /// that does not fit fails with `ValueOutOfRange`. Booleans convert from
    /// numerics by nonzero-ness but never the other way around.
    pub fn coerce(&self, target: TagDataType) -> BridgeResult<TagValue> {
        if self.kind() == target {
            return Ok(self.clone());
        }
        let out_of_range = || BridgeError::out_of_range(self.to_string(), target);
        match target {
            TagDataType::Boolean => match self {
                TagValue::Bool(b) => Ok(TagValue::Bool(*b)),
                _ => Ok(TagValue::Bool(self.as_f64() != 0.0)),
            },
            TagDataType::Float => match self {
                TagValue::Bool(_) => Err(BridgeError::validation(format!(
                    "boolean value for {} tag",
                    target
                ))),
                _ => Ok(TagValue::Float(self.as_f64() as f32)),
            },
            TagDataType::Int32 | TagDataType::UInt32 | TagDataType::Int16 | TagDataType::UInt16 => {
                if matches!(self, TagValue::Bool(_)) {
                    return Err(BridgeError::validation(format!(
                        "boolean value for {} tag",
                        target
                    )));
                }
                let rounded = self.as_f64().round();
                if !rounded.is_finite() {
                    return Err(out_of_range());
                }
                match target {
                    TagDataType::Int32 => {
                        if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
                            Err(out_of_range())
                        } else {
                            Ok(TagValue::Int32(rounded as i32))
                        }
                    }
                    TagDataType::UInt32 => {
                        if rounded < 0.0 || rounded > u32::MAX as f64 {
                            Err(out_of_range())
                        } else {
                            Ok(TagValue::UInt32(rounded as u32))
                        }
                    }
                    TagDataType::Int16 => {
                        if rounded < i16::MIN as f64 || rounded > i16::MAX as f64 {
                            Err(out_of_range())
                        } else {
                            Ok(TagValue::Int16(rounded as i16))
                        }
                    }
                    TagDataType::UInt16 => {
                        if rounded < 0.0 || rounded > u16::MAX as f64 {
                            Err(out_of_range())
                        } else {
                            Ok(TagValue::UInt16(rounded as u16))
                        }
                    }
                    _ => unreachable!(),
                }
            }
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Int32(v) => write!(f, "{}", v),
            TagValue::UInt32(v) => write!(f, "{}", v),
            TagValue::Int16(v) => write!(f, "{}", v),
            TagValue::UInt16(v) => write!(f, "{}", v),
            TagValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Float(v) => serializer.serialize_f32(*v),
            TagValue::Int32(v) => serializer.serialize_i32(*v),
            TagValue::UInt32(v) => serializer.serialize_u32(*v),
            TagValue::Int16(v) => serializer.serialize_i16(*v),
            TagValue::UInt16(v) => serializer.serialize_u16(*v),
            TagValue::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        TagValue::from_json(&raw)
            .ok_or_else(|| D::Error::custom(format!("expected scalar tag value, got {}", raw)))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Serial parity setting for RTU transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity bit (default).
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// How a device is reached.
///
/// In catalog and HTTP records the variant is selected by the `type` field;
/// the transport parameters sit flat on the device object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Transport {
    /// Outbound Modbus/TCP connection.
    #[serde(rename_all = "camelCase")]
    Tcp {
        /// Host name or IP address.
        address: String,
        /// TCP port.
        port: u16,
    },
    /// Outbound Modbus RTU over a serial line.
    #[serde(rename_all = "camelCase")]
    Rtu {
        /// Serial device path, e.g. `/dev/ttyUSB0`.
        serial_port: String,
        /// Baud rate, default 9600.
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Parity, default none.
        #[serde(default)]
        parity: SerialParity,
        /// Data bits, default 8.
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Stop bits, default 1.
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
    /// Inbound "modem" device: the device dials a listener port and the
    /// bridge answers its Modbus queries.
    #[serde(rename_all = "camelCase")]
    TcpModem {
        /// The listener port the device dials.
        port: u16,
    },
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

impl Transport {
    /// Returns `true` for the inbound modem variant.
    #[inline]
    pub fn is_modem(&self) -> bool {
        matches!(self, Transport::TcpModem { .. })
    }

    /// Returns the modem listen port, if this is a modem transport.
    pub fn listen_port(&self) -> Option<u16> {
        match self {
            Transport::TcpModem { port } => Some(*port),
            _ => None,
        }
    }

    /// Returns a short human-readable target description.
    pub fn target(&self) -> String {
        match self {
            Transport::Tcp { address, port } => format!("{}:{}", address, port),
            Transport::Rtu { serial_port, .. } => serial_port.clone(),
            Transport::TcpModem { port } => format!("modem:{}", port),
        }
    }
}

// =============================================================================
// Tag
// =============================================================================

/// A named, typed view onto one or two Modbus registers of a device.
///
/// Tags never mutate structurally after the device is added; only the
/// current value changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag name, unique within its device.
    pub name: String,
    /// Modbus register address, 0-based.
    pub address: u16,
    /// Register class the tag lives in.
    pub register_type: RegisterClass,
    /// Data type the registers decode to.
    pub data_type: TagDataType,
    /// Last known value, if any. Persisted catalogs may seed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<TagValue>,
}

impl Tag {
    /// Returns `true` if the tag's register class accepts writes.
    #[inline]
    pub fn is_writable(&self) -> bool {
        codec::is_writable(self.register_type)
    }

    /// Validates the register class / data type combination.
    fn validate(&self, device: &str) -> BridgeResult<()> {
        if self.name.is_empty() {
            return Err(BridgeError::validation(format!(
                "device '{}': tag name cannot be empty",
                device
            )));
        }
        let boolean = self.data_type == TagDataType::Boolean;
        if boolean != self.register_type.is_bit() {
            return Err(BridgeError::validation(format!(
                "device '{}': tag '{}' combines {} with {}",
                device, self.name, self.register_type, self.data_type
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Device
// =============================================================================

/// Default Modbus unit id.
fn default_unit_id() -> u8 {
    1
}

/// Default poll interval in milliseconds.
pub fn default_poll_interval_ms() -> u64 {
    2000
}

/// A configured field device with its tag list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Opaque device id; generated when absent at insert time.
    #[serde(default)]
    pub id: DeviceId,
    /// Display name.
    pub name: String,
    /// Transport parameters, selected by the `type` field.
    #[serde(flatten)]
    pub transport: Transport,
    /// Modbus unit id, default 1.
    #[serde(default = "default_unit_id")]
    pub device_id: u8,
    /// Poll interval in milliseconds, default 2000. Ignored for modems.
    #[serde(rename = "pollInterval", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Ordered tag list.
    pub tags: Vec<Tag>,
}

impl Default for DeviceId {
    fn default() -> Self {
        DeviceId(String::new())
    }
}

impl Device {
    /// Returns `true` for inbound modem devices.
    #[inline]
    pub fn is_modem(&self) -> bool {
        self.transport.is_modem()
    }

    /// Looks up a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Looks up a tag by register address.
    pub fn tag_at(&self, address: u16) -> Option<&Tag> {
        self.tags.iter().find(|t| t.address == address)
    }

    /// Validates the device record against the structural invariants.
    ///
    /// `modem_ports` is the listener port range modem devices must dial
    /// into. Global invariants (id uniqueness, modem port/unit uniqueness)
    /// are checked by the engine against the full catalog.
    pub fn validate(&self, modem_ports: &RangeInclusive<u16>) -> BridgeResult<()> {
        if self.name.is_empty() {
            return Err(BridgeError::validation("device name cannot be empty"));
        }
        if self.tags.is_empty() {
            return Err(BridgeError::validation(format!(
                "device '{}' has no tags",
                self.name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for tag in &self.tags {
            tag.validate(&self.name)?;
            if !seen.insert(tag.name.as_str()) {
                return Err(BridgeError::validation(format!(
                    "device '{}': duplicate tag '{}'",
                    self.name, tag.name
                )));
            }
        }
        match &self.transport {
            Transport::Tcp { address, .. } => {
                if address.is_empty() {
                    return Err(BridgeError::validation(format!(
                        "device '{}': address cannot be empty",
                        self.name
                    )));
                }
            }
            Transport::Rtu {
                serial_port,
                baud_rate,
                data_bits,
                stop_bits,
                ..
            } => {
                if serial_port.is_empty() {
                    return Err(BridgeError::validation(format!(
                        "device '{}': serial port cannot be empty",
                        self.name
                    )));
                }
                if *baud_rate == 0 {
                    return Err(BridgeError::validation(format!(
                        "device '{}': baud rate cannot be zero",
                        self.name
                    )));
                }
                if !matches!(data_bits, 7 | 8) {
                    return Err(BridgeError::validation(format!(
                        "device '{}': data bits must be 7 or 8",
                        self.name
                    )));
                }
                if !matches!(stop_bits, 1 | 2) {
                    return Err(BridgeError::validation(format!(
                        "device '{}': stop bits must be 1 or 2",
                        self.name
                    )));
                }
            }
            Transport::TcpModem { port } => {
                if !modem_ports.contains(port) {
                    return Err(BridgeError::validation(format!(
                        "device '{}': listen port {} outside {}..={}",
                        self.name,
                        port,
                        modem_ports.start(),
                        modem_ports.end()
                    )));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, register_type: RegisterClass, data_type: TagDataType) -> Tag {
        Tag {
            name: name.to_string(),
            address: 0,
            register_type,
            data_type,
            current_value: None,
        }
    }

    fn tcp_device(tags: Vec<Tag>) -> Device {
        Device {
            id: DeviceId::new("d1"),
            name: "pump".to_string(),
            transport: Transport::Tcp {
                address: "127.0.0.1".to_string(),
                port: 5020,
            },
            device_id: 1,
            poll_interval_ms: 2000,
            tags,
        }
    }

    const PORTS: RangeInclusive<u16> = 8000..=8100;

    #[test]
    fn device_json_round_trip() {
        let json = serde_json::json!({
            "id": "d1",
            "name": "pump",
            "type": "tcp",
            "address": "127.0.0.1",
            "port": 5020,
            "deviceId": 3,
            "pollInterval": 500,
            "tags": [
                {"name": "t", "address": 100, "registerType": "holding", "dataType": "uint16"}
            ]
        });
        let device: Device = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(device.device_id, 3);
        assert_eq!(device.poll_interval_ms, 500);
        assert_eq!(device.tags[0].data_type, TagDataType::UInt16);

        let back = serde_json::to_value(&device).unwrap();
        assert_eq!(back["type"], "tcp");
        assert_eq!(back["pollInterval"], 500);
        assert_eq!(back["tags"][0]["registerType"], "holding");
    }

    #[test]
    fn modem_json_uses_flat_port() {
        let json = serde_json::json!({
            "id": "m1",
            "name": "meter",
            "type": "tcp-modem",
            "port": 8000,
            "deviceId": 7,
            "tags": [
                {"name": "x", "address": 10, "registerType": "holding",
                 "dataType": "uint16", "currentValue": 42}
            ]
        });
        let device: Device = serde_json::from_value(json).unwrap();
        assert!(device.is_modem());
        assert_eq!(device.transport.listen_port(), Some(8000));
        assert_eq!(
            device.tags[0].current_value,
            Some(TagValue::UInt16(42))
        );
    }

    #[test]
    fn defaults_applied() {
        let json = serde_json::json!({
            "name": "pump",
            "type": "tcp",
            "address": "10.0.0.2",
            "port": 502,
            "tags": [
                {"name": "t", "address": 0, "registerType": "input", "dataType": "float"}
            ]
        });
        let device: Device = serde_json::from_value(json).unwrap();
        assert!(device.id.is_empty());
        assert_eq!(device.device_id, 1);
        assert_eq!(device.poll_interval_ms, 2000);
    }

    #[test]
    fn boolean_requires_bit_class() {
        let device = tcp_device(vec![tag("b", RegisterClass::Holding, TagDataType::Boolean)]);
        assert!(device.validate(&PORTS).is_err());

        let device = tcp_device(vec![tag("n", RegisterClass::Coil, TagDataType::UInt16)]);
        assert!(device.validate(&PORTS).is_err());

        let device = tcp_device(vec![tag("b", RegisterClass::Coil, TagDataType::Boolean)]);
        assert!(device.validate(&PORTS).is_ok());
    }

    #[test]
    fn duplicate_tag_names_rejected() {
        let device = tcp_device(vec![
            tag("t", RegisterClass::Holding, TagDataType::UInt16),
            tag("t", RegisterClass::Input, TagDataType::UInt16),
        ]);
        assert!(device.validate(&PORTS).is_err());
    }

    #[test]
    fn modem_port_must_be_in_range() {
        let mut device = tcp_device(vec![tag("t", RegisterClass::Holding, TagDataType::UInt16)]);
        device.transport = Transport::TcpModem { port: 7999 };
        assert!(device.validate(&PORTS).is_err());
        device.transport = Transport::TcpModem { port: 8000 };
        assert!(device.validate(&PORTS).is_ok());
    }

    #[test]
    fn coerce_range_checks() {
        assert_eq!(
            TagValue::UInt32(70_000).coerce(TagDataType::UInt32).unwrap(),
            TagValue::UInt32(70_000)
        );
        assert!(TagValue::UInt32(70_000).coerce(TagDataType::UInt16).is_err());
        assert!(TagValue::Int16(-1).coerce(TagDataType::UInt16).is_err());
        assert_eq!(
            TagValue::Float(1.6).coerce(TagDataType::UInt16).unwrap(),
            TagValue::UInt16(2)
        );
        assert_eq!(
            TagValue::UInt16(0).coerce(TagDataType::Boolean).unwrap(),
            TagValue::Bool(false)
        );
    }

    #[test]
    fn parse_value_from_strings() {
        assert_eq!(
            TagDataType::Boolean
                .parse_value(&serde_json::json!("1"))
                .unwrap(),
            TagValue::Bool(true)
        );
        assert_eq!(
            TagDataType::UInt16
                .parse_value(&serde_json::json!("65"))
                .unwrap(),
            TagValue::UInt16(65)
        );
        assert_eq!(
            TagDataType::Float
                .parse_value(&serde_json::json!("3.14"))
                .unwrap(),
            TagValue::Float(3.14)
        );
        assert!(TagDataType::UInt16
            .parse_value(&serde_json::json!("70000"))
            .is_err());
        assert!(TagDataType::Int32
            .parse_value(&serde_json::json!("abc"))
            .is_err());
    }
}
