//! Dynamic values seen by the storage layer
//!
//! The interpreter owns the real value representation; this is the narrow
//! slice of it that indexed stores and binary views need: numbers, strings,
//! booleans, the two nullish values, and non-owning object handles.

use std::fmt;
use std::rc::Rc;

/// Non-owning handle into the enclosing object table.
///
/// Stores keep one of these to name their owner in diagnostics. It never keeps
/// the object alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    /// Raw slot index in the object table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A JavaScript value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Any number, including NaN and both zeros
    Number(f64),
    /// String primitive
    String(Rc<str>),
    /// Reference to an object in the enclosing object table
    Object(ObjectHandle),
}

impl Value {
    /// Create undefined value
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Create null value
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Create boolean value
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Create number value
    #[inline]
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create 32-bit integer value
    #[inline]
    pub fn int32(n: i32) -> Self {
        Self::Number(n as f64)
    }

    /// Create string value
    pub fn string(s: &str) -> Self {
        Self::String(Rc::from(s))
    }

    /// Create object reference value
    #[inline]
    pub const fn object(handle: ObjectHandle) -> Self {
        Self::Object(handle)
    }

    /// Check if undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check if null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Check if number
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Get as number, without coercion
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice, without coercion
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object handle
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Self::Object(h) => Some(*h),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => !(n.is_nan() || *n == 0.0),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// ToNumber for primitives.
    ///
    /// Objects would need ToPrimitive, which runs user code; the storage layer
    /// never performs it and treats an unconverted object as NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Object(_) => f64::NAN,
        }
    }

    /// SameValue: NaN equals NaN, `+0` and `-0` differ.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a.to_bits() == b.to_bits() || (a == b && *a != 0.0)
            }
            _ => self.same_type_equals(other),
        }
    }

    /// SameValueZero: NaN equals NaN, `+0` equals `-0`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.same_type_equals(other),
        }
    }

    /// IsStrictlyEqual: NaN never equal, `+0` equals `-0`.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => self.same_type_equals(other),
        }
    }

    fn same_type_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::int32(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

/// Number::toString(10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut buf = ryu_js::Buffer::new();
    buf.format(n).to_string()
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    // Rust accepts "inf", "nan" and friends; JS does not.
    let valid = !unsigned.is_empty()
        && !unsigned.starts_with(['+', '-'])
        && unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        && unsigned.bytes().any(|b| b.is_ascii_digit());
    if !valid {
        return f64::NAN;
    }
    match unsigned.parse::<f64>() {
        Ok(n) => sign * n,
        Err(_) => f64::NAN,
    }
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut acc = 0.0_f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => acc = acc * radix as f64 + d as f64,
            None => return f64::NAN,
        }
    }
    acc
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}
