//! Numeric coercions used at every indexed entry point.
//!
//! These are the integer conversions of the language: ToIntegerOrInfinity,
//! ToIndex, ToLength, the modular ToIntN/ToUintN family, and the clamped
//! conversion used by `Uint8ClampedArray`.

use crate::error::{StorageError, StorageResult};
use crate::value::Value;

/// 2^53 - 1
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// ToIntegerOrInfinity on an already-converted number.
pub fn integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        return 0.0;
    }
    if n.is_infinite() {
        return n;
    }
    n.trunc()
}

/// ToIntegerOrInfinity
pub fn to_integer_or_infinity(value: &Value) -> f64 {
    integer_or_infinity(value.to_number())
}

/// ToIndex: a non-negative integer no greater than 2^53 - 1.
pub fn to_index(value: &Value) -> StorageResult<usize> {
    if value.is_undefined() {
        return Ok(0);
    }
    let integer = to_integer_or_infinity(value);
    number_to_index(integer)
}

/// ToIndex on an already-integral number.
pub fn number_to_index(integer: f64) -> StorageResult<usize> {
    if !(0.0..=MAX_SAFE_INTEGER).contains(&integer) {
        return Err(StorageError::invalid_index(format!(
            "Index {} is out of range",
            crate::value::number_to_string(integer)
        )));
    }
    usize::try_from(integer as u64)
        .map_err(|_| StorageError::invalid_index("Index exceeds addressable memory"))
}

/// ToLength
pub fn to_length(value: &Value) -> usize {
    let len = to_integer_or_infinity(value);
    if len <= 0.0 {
        0
    } else {
        len.min(MAX_SAFE_INTEGER) as usize
    }
}

/// Resolve a relative index argument against `len`.
///
/// Negative values count back from the end; the result is clamped into
/// `[0, len]`.
pub fn relative_index(relative: f64, len: usize) -> usize {
    if relative == f64::NEG_INFINITY {
        0
    } else if relative < 0.0 {
        let from_end = len as f64 + relative;
        if from_end < 0.0 { 0 } else { from_end as usize }
    } else {
        relative.min(len as f64) as usize
    }
}

/// Resolve an optional relative bound; `undefined` means `default`.
pub fn relative_bound(value: Option<&Value>, len: usize, default: usize) -> usize {
    match value {
        None | Some(Value::Undefined) => default,
        Some(v) => relative_index(to_integer_or_infinity(v), len),
    }
}

/// Integer part of `n` reduced modulo 2^32.
fn modulo_u32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    modulo_u32(n)
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    modulo_u32(n) as i32
}

/// ToUint16
pub fn to_uint16(n: f64) -> u16 {
    modulo_u32(n) as u16
}

/// ToInt16
pub fn to_int16(n: f64) -> i16 {
    modulo_u32(n) as u16 as i16
}

/// ToUint8
pub fn to_uint8(n: f64) -> u8 {
    modulo_u32(n) as u8
}

/// ToInt8
pub fn to_int8(n: f64) -> i8 {
    modulo_u32(n) as u8 as i8
}

/// ToUint8Clamp: saturate into [0, 255], ties round to even.
pub fn to_uint8_clamp(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    n.round_ties_even() as u8
}
