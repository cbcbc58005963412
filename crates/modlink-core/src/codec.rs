// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversions between Modbus register words and typed tag values.
//!
//! Word order is fixed big-endian: for the two-register types the first word
//! carries the high half. There is no configurable word swap.

use crate::error::{BridgeError, BridgeResult};
use crate::model::{RegisterClass, TagDataType, TagValue};

/// Returns the number of registers a data type occupies (1 or 2).
#[inline]
pub fn register_count(data_type: TagDataType) -> u16 {
    if data_type.is_wide() {
        2
    } else {
        1
    }
}

/// Returns `true` iff the register class accepts writes (holding or coil).
#[inline]
pub fn is_writable(register_type: RegisterClass) -> bool {
    matches!(register_type, RegisterClass::Holding | RegisterClass::Coil)
}

/// Decodes raw register words into a value of the given type.
///
/// `words` must hold at least [`register_count`] entries. `int16` is
/// two's-complement; `boolean` reads the low bit of the first word.
pub fn decode(words: &[u16], data_type: TagDataType) -> BridgeResult<TagValue> {
    let need = register_count(data_type) as usize;
    if words.len() < need {
        return Err(BridgeError::protocol(format!(
            "short register response: got {} words, need {} for {}",
            words.len(),
            need,
            data_type
        )));
    }
    let value = match data_type {
        TagDataType::Float => TagValue::Float(f32::from_bits(wide(words))),
        TagDataType::Int32 => TagValue::Int32(wide(words) as i32),
        TagDataType::UInt32 => TagValue::UInt32(wide(words)),
        TagDataType::Int16 => TagValue::Int16(words[0] as i16),
        TagDataType::UInt16 => TagValue::UInt16(words[0]),
        TagDataType::Boolean => TagValue::Bool(words[0] & 1 != 0),
    };
    Ok(value)
}

/// Encodes a typed value into register words, symmetric to [`decode`].
///
/// The value is first settled into `data_type`; integer inputs that do not
/// fit fail with `ValueOutOfRange`.
pub fn encode(value: &TagValue, data_type: TagDataType) -> BridgeResult<Vec<u16>> {
    let words = match value.coerce(data_type)? {
        TagValue::Float(v) => split(v.to_bits()),
        TagValue::Int32(v) => split(v as u32),
        TagValue::UInt32(v) => split(v),
        TagValue::Int16(v) => vec![v as u16],
        TagValue::UInt16(v) => vec![v],
        TagValue::Bool(v) => vec![u16::from(v)],
    };
    Ok(words)
}

#[inline]
fn wide(words: &[u16]) -> u32 {
    ((words[0] as u32) << 16) | words[1] as u32
}

#[inline]
fn split(raw: u32) -> Vec<u16> {
    vec![(raw >> 16) as u16, (raw & 0xFFFF) as u16]
}

// =============================================================================
// Tests
// =============================================================================
