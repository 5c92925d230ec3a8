//! Element kinds of typed arrays
//!
//! A kind fixes the element width and how a number maps onto the element's
//! bit pattern and back. All conversions go through `u64` bit patterns so the
//! byte layer never needs to know the element type.

use std::cmp::Ordering;

use crate::convert::{to_int8, to_int16, to_int32, to_uint8, to_uint8_clamp, to_uint16, to_uint32};
use crate::value::Value;

/// The kind of TypedArray - determines element size and interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    /// Int8Array - 8-bit signed integers
    Int8,
    /// Uint8Array - 8-bit unsigned integers
    Uint8,
    /// Uint8ClampedArray - 8-bit unsigned integers (clamped)
    Uint8Clamped,
    /// Int16Array - 16-bit signed integers
    Int16,
    /// Uint16Array - 16-bit unsigned integers
    Uint16,
    /// Int32Array - 32-bit signed integers
    Int32,
    /// Uint32Array - 32-bit unsigned integers
    Uint32,
    /// Float32Array - 32-bit floating point
    Float32,
    /// Float64Array - 64-bit floating point
    Float64,
}

impl TypedArrayKind {
    /// Every kind, in constructor-table order
    pub const ALL: [TypedArrayKind; 9] = [
        Self::Int8,
        Self::Uint8,
        Self::Uint8Clamped,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Float32,
        Self::Float64,
    ];

    /// Get the byte size of each element
    pub fn element_size(&self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Uint8Clamped => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Get the name of this TypedArray type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
        }
    }

    /// Float32 or Float64
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Whether stores saturate instead of wrapping
    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Uint8Clamped)
    }

    /// Coerce a number into this kind's domain and return its bit pattern
    pub fn encode(&self, n: f64) -> u64 {
        match self {
            Self::Int8 => to_int8(n) as u8 as u64,
            Self::Uint8 => to_uint8(n) as u64,
            Self::Uint8Clamped => to_uint8_clamp(n) as u64,
            Self::Int16 => to_int16(n) as u16 as u64,
            Self::Uint16 => to_uint16(n) as u64,
            Self::Int32 => to_int32(n) as u32 as u64,
            Self::Uint32 => to_uint32(n) as u64,
            Self::Float32 => (n as f32).to_bits() as u64,
            Self::Float64 => n.to_bits(),
        }
    }

    /// Number denoted by a bit pattern of this kind
    pub fn decode(&self, bits: u64) -> f64 {
        match self {
            Self::Int8 => bits as u8 as i8 as f64,
            Self::Uint8 | Self::Uint8Clamped => bits as u8 as f64,
            Self::Int16 => bits as u16 as i16 as f64,
            Self::Uint16 => bits as u16 as f64,
            Self::Int32 => bits as u32 as i32 as f64,
            Self::Uint32 => bits as u32 as f64,
            Self::Float32 => f32::from_bits(bits as u32) as f64,
            Self::Float64 => f64::from_bits(bits),
        }
    }

    /// Sort order of two stored elements.
    ///
    /// Floats put NaN after everything and `-0` before `+0`.
    pub fn compare_bits(&self, a: u64, b: u64) -> Ordering {
        if self.is_float() {
            let (x, y) = (self.decode(a), self.decode(b));
            return match (x.is_nan(), y.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => x.total_cmp(&y),
            };
        }
        self.decode(a).total_cmp(&self.decode(b))
    }

    /// Fast check whether `value` can ever equal an element of this kind.
    ///
    /// Searches use it to skip the scan entirely for non-numbers and for
    /// numbers outside the kind's exact domain.
    pub fn type_match(&self, value: &Value) -> bool {
        let Some(n) = value.as_number() else {
            return false;
        };
        if self.is_float() {
            return match self {
                Self::Float32 => n.is_nan() || (n as f32) as f64 == n,
                _ => true,
            };
        }
        n.fract() == 0.0 && self.decode(self.encode(n)) == n
    }

    /// Whether a raw byte copy from `source` to `self` preserves values.
    ///
    /// Same kind always does. Integers of the same width share bit patterns
    /// under modular conversion, except that a clamped target cannot accept
    /// wrapped bytes from a signed source.
    pub fn is_bit_compatible(&self, source: TypedArrayKind) -> bool {
        if *self == source {
            return true;
        }
        if self.is_float() || source.is_float() || self.element_size() != source.element_size() {
            return false;
        }
        !self.is_clamped() || matches!(source, Self::Uint8 | Self::Uint8Clamped)
    }
}
