//! TypedArray implementation
//!
//! TypedArrays are views over ArrayBuffer, providing typed access to binary data.
//! All 9 numeric types share one implementation parametrized by [`TypedArrayKind`].
//!
//! A view never caches the buffer's bytes or length. Every access recomputes
//! its bounds from the live buffer, so a detach or resize made by a callback
//! is observed by the very next element access.

mod copy;
mod iteration;
pub mod kind;
mod sort;

pub use kind::TypedArrayKind;

use crate::array_buffer::{BufferRef, JsArrayBuffer, detached_error};
use crate::bytes::{Endianness, read_bits, write_bits};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult, reject_or_throw};
use crate::property::{PropertyDescriptor, PropertyKey, canonical_numeric_index};
use crate::protocol::IndexedProperties;
use crate::value::Value;

use std::rc::Rc;

/// A JavaScript TypedArray
///
/// Cloning yields another view of the same bytes.
#[derive(Debug, Clone)]
pub struct JsTypedArray {
    /// The underlying ArrayBuffer
    buffer: BufferRef,
    /// The kind of typed array
    kind: TypedArrayKind,
    /// Offset into the buffer, in elements
    element_offset: usize,
    /// Number of elements; `None` tracks the length of a resizable buffer
    length: Option<usize>,
}

impl JsTypedArray {
    /// Create a new TypedArray view over an ArrayBuffer.
    ///
    /// `length` of `None` covers the rest of the buffer, and keeps tracking
    /// it when the buffer is resizable.
    pub fn new(
        buffer: BufferRef,
        kind: TypedArrayKind,
        byte_offset: usize,
        length: Option<usize>,
    ) -> StorageResult<Self> {
        let elem_size = kind.element_size();
        if byte_offset % elem_size != 0 {
            return Err(StorageError::invalid_length(format!(
                "start offset of {} should be a multiple of {elem_size}",
                kind.name()
            )));
        }
        buffer.ensure_not_detached()?;
        let buf_len = buffer.byte_length();
        if byte_offset > buf_len {
            return Err(StorageError::invalid_index(format!(
                "Start offset {byte_offset} is outside the bounds of the buffer"
            )));
        }

        let length = match length {
            Some(len) => {
                let fits = len
                    .checked_mul(elem_size)
                    .and_then(|bytes| bytes.checked_add(byte_offset))
                    .is_some_and(|end| end <= buf_len);
                if !fits {
                    return Err(StorageError::invalid_length(format!(
                        "Invalid typed array length: {len}"
                    )));
                }
                Some(len)
            }
            None if buffer.is_resizable() => None,
            None => {
                if buf_len % elem_size != 0 {
                    return Err(StorageError::invalid_length(format!(
                        "byte length of {} should be a multiple of {elem_size}",
                        kind.name()
                    )));
                }
                Some((buf_len - byte_offset) / elem_size)
            }
        };

        Ok(Self {
            buffer,
            kind,
            element_offset: byte_offset / elem_size,
            length,
        })
    }

    /// Create a new TypedArray with its own zeroed buffer
    pub fn with_length(
        kind: TypedArrayKind,
        length: usize,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let byte_length = length
            .checked_mul(kind.element_size())
            .and_then(|bytes| i64::try_from(bytes).ok())
            .ok_or_else(|| StorageError::invalid_length(format!("Invalid typed array length: {length}")))?;
        let buffer = Rc::new(JsArrayBuffer::allocate(byte_length, config)?);
        Ok(Self {
            buffer,
            kind,
            element_offset: 0,
            length: Some(length),
        })
    }

    /// Create a TypedArray holding `numbers`, each coerced to `kind`
    pub fn from_numbers(
        kind: TypedArrayKind,
        numbers: &[f64],
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let array = Self::with_length(kind, numbers.len(), config)?;
        let size = kind.element_size();
        array.buffer.with_bytes_mut(|data| {
            for (i, &n) in numbers.iter().enumerate() {
                write_bits(data, i * size, size, kind.encode(n), Endianness::Native);
            }
        })?;
        Ok(array)
    }

    /// Get the kind of this TypedArray
    pub fn kind(&self) -> TypedArrayKind {
        self.kind
    }

    /// Get the underlying ArrayBuffer
    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    /// Offset into the buffer, in elements
    pub fn element_offset(&self) -> usize {
        self.element_offset
    }

    /// Get the byte offset into the buffer (0 once out of bounds)
    pub fn byte_offset(&self) -> usize {
        if self.bounds().is_none() {
            0
        } else {
            self.element_offset * self.kind.element_size()
        }
    }

    /// Whether the length follows a resizable buffer
    pub fn is_length_tracking(&self) -> bool {
        self.length.is_none()
    }

    /// Check if the underlying buffer is detached
    pub fn is_detached(&self) -> bool {
        self.buffer.is_detached()
    }

    /// Current element count, or `None` if detached or out of bounds.
    fn bounds(&self) -> Option<usize> {
        if self.buffer.is_detached() {
            return None;
        }
        let size = self.kind.element_size();
        let start = self.element_offset * size;
        let buf_len = self.buffer.byte_length();
        match self.length {
            Some(len) if start + len * size <= buf_len => Some(len),
            Some(_) => None,
            None if start <= buf_len => Some((buf_len - start) / size),
            None => None,
        }
    }

    /// Whether the view no longer fits its buffer (detached counts)
    pub fn is_out_of_bounds(&self) -> bool {
        self.bounds().is_none()
    }

    /// Get the number of elements (0 when detached or out of bounds)
    pub fn length(&self) -> usize {
        self.bounds().unwrap_or(0)
    }

    /// Get the byte length of the view
    pub fn byte_length(&self) -> usize {
        self.length() * self.kind.element_size()
    }

    /// ValidateTypedArray: the live element count, or why there is none
    pub fn validate(&self) -> StorageResult<usize> {
        if self.buffer.is_detached() {
            return Err(detached_error());
        }
        self.bounds().ok_or_else(|| {
            StorageError::detached(format!("{} is out of bounds", self.kind.name()))
        })
    }

    fn byte_index(&self, index: usize) -> usize {
        (self.element_offset + index) * self.kind.element_size()
    }

    fn check_index(&self, index: usize) -> StorageResult<()> {
        let len = self.validate()?;
        if index >= len {
            return Err(StorageError::invalid_index(format!(
                "Index {index} is out of range for {} of length {len}",
                self.kind.name()
            )));
        }
        Ok(())
    }

    /// Stored bit pattern of element `index`
    pub fn get_raw(&self, index: usize) -> StorageResult<u64> {
        self.check_index(index)?;
        let (at, size) = (self.byte_index(index), self.kind.element_size());
        self.buffer
            .with_bytes(|data| read_bits(data, at, size, Endianness::Native))
    }

    /// Store a bit pattern verbatim at element `index`
    pub fn set_raw(&self, index: usize, bits: u64) -> StorageResult<()> {
        self.check_index(index)?;
        let (at, size) = (self.byte_index(index), self.kind.element_size());
        self.buffer
            .with_bytes_mut(|data| write_bits(data, at, size, bits, Endianness::Native))
    }

    /// Element `index` as a number
    pub fn get(&self, index: usize) -> StorageResult<f64> {
        Ok(self.kind.decode(self.get_raw(index)?))
    }

    /// Coerce `value` to the element domain and store it at `index`
    pub fn set(&self, index: usize, value: f64) -> StorageResult<()> {
        self.set_raw(index, self.kind.encode(value))
    }

    /// Whether element `i` sorts before element `j`
    pub fn less(&self, i: usize, j: usize) -> StorageResult<bool> {
        let (a, b) = (self.get_raw(i)?, self.get_raw(j)?);
        Ok(self.kind.compare_bits(a, b).is_lt())
    }

    /// Exchange elements `i` and `j`
    pub fn swap(&self, i: usize, j: usize) -> StorageResult<()> {
        let (a, b) = (self.get_raw(i)?, self.get_raw(j)?);
        self.set_raw(i, b)?;
        self.set_raw(j, a)
    }

    /// Whether `value` can equal some element of this kind
    pub fn type_match(&self, value: &Value) -> bool {
        self.kind.type_match(value)
    }

    /// IsValidIntegerIndex
    pub fn is_valid_integer_index(&self, index: f64) -> bool {
        let Some(len) = self.bounds() else {
            return false;
        };
        index.fract() == 0.0 && !(index == 0.0 && index.is_sign_negative()) && index >= 0.0
            && index < len as f64
    }

    /// TypedArrayGetElement: `undefined` for anything but a valid index
    pub fn get_element(&self, index: f64) -> Value {
        if !self.is_valid_integer_index(index) {
            return Value::undefined();
        }
        self.get(index as usize)
            .map(Value::number)
            .unwrap_or_default()
    }

    /// TypedArraySetElement: coerce first, then write if the index is valid.
    pub fn set_element(&self, index: f64, value: &Value) {
        let n = value.to_number();
        if !self.is_valid_integer_index(index) {
            return;
        }
        let (at, size) = (self.byte_index(index as usize), self.kind.element_size());
        if let Some(mut data) = self.buffer.live_bytes_mut() {
            write_bits(&mut data, at, size, self.kind.encode(n), Endianness::Native);
        }
    }

    /// Integer-indexed `[[Get]]`.
    ///
    /// Returns `None` when `key` is an ordinary named key the caller should
    /// look up elsewhere.
    pub fn get_by_key(&self, key: &PropertyKey) -> Option<Value> {
        numeric_key(key).map(|n| self.get_element(n))
    }

    /// Integer-indexed `[[Set]]`; `false` means `key` is not numeric.
    pub fn set_by_key(&self, key: &PropertyKey, value: &Value) -> bool {
        match numeric_key(key) {
            Some(n) => {
                self.set_element(n, value);
                true
            }
            None => false,
        }
    }

    /// Copy of every element as numbers
    pub fn to_vec(&self) -> StorageResult<Vec<f64>> {
        let len = self.validate()?;
        let (size, kind) = (self.kind.element_size(), self.kind);
        let start = self.byte_index(0);
        self.buffer.with_bytes(|data| {
            (0..len)
                .map(|i| kind.decode(read_bits(data, start + i * size, size, Endianness::Native)))
                .collect()
        })
    }
}

fn numeric_key(key: &PropertyKey) -> Option<f64> {
    match key {
        PropertyKey::Index(i) => Some(*i as f64),
        PropertyKey::String(s) => canonical_numeric_index(s),
    }
}

impl IndexedProperties for JsTypedArray {
    fn get_own_indexed(&self, index: u32) -> StorageResult<Option<PropertyDescriptor>> {
        let value = self.get_element(index as f64);
        if !self.is_valid_integer_index(index as f64) {
            return Ok(None);
        }
        Ok(Some(PropertyDescriptor::data(value)))
    }

    fn set_own_indexed(&mut self, index: u32, value: Value, _throw: bool) -> StorageResult<bool> {
        self.set_element(index as f64, &value);
        Ok(true)
    }

    fn define_indexed(
        &mut self,
        index: u32,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> StorageResult<bool> {
        desc.validate()?;
        let result = if !self.is_valid_integer_index(index as f64) {
            Err(StorageError::not_extensible(format!(
                "Cannot define property {index}, typed array index is out of bounds"
            )))
        } else if desc.configurable == Some(false)
            || desc.enumerable == Some(false)
            || desc.is_accessor()
            || desc.writable == Some(false)
        {
            Err(StorageError::not_configurable(format!(
                "Cannot redefine property: {index}"
            )))
        } else {
            if let Some(value) = &desc.value {
                self.set_element(index as f64, value);
            }
            Ok(())
        };
        reject_or_throw(result, throw)
    }

    fn delete_indexed(&mut self, index: u32, throw: bool) -> StorageResult<bool> {
        let result = if self.is_valid_integer_index(index as f64) {
            Err(StorageError::not_configurable(format!(
                "Cannot delete property '{index}' of [object {}]",
                self.kind.name()
            )))
        } else {
            Ok(())
        };
        reject_or_throw(result, throw)
    }

    fn indexed_keys(&self) -> Vec<u32> {
        (0..self.length() as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig::default()
    }

    #[test]
    fn test_create_view() {
        let buffer = Rc::new(JsArrayBuffer::new(16));
        let view = JsTypedArray::new(buffer.clone(), TypedArrayKind::Int32, 4, Some(2)).unwrap();
        assert_eq!(view.length(), 2);
        assert_eq!(view.byte_offset(), 4);
        assert_eq!(view.byte_length(), 8);

        assert!(JsTypedArray::new(buffer.clone(), TypedArrayKind::Int32, 2, None).is_err());
        assert!(JsTypedArray::new(buffer.clone(), TypedArrayKind::Int32, 4, Some(4)).is_err());
        let rest = JsTypedArray::new(buffer, TypedArrayKind::Uint16, 4, None).unwrap();
        assert_eq!(rest.length(), 6);
    }

    #[test]
    fn test_get_set_wraps() {
        let arr = JsTypedArray::with_length(TypedArrayKind::Uint8, 4, &config()).unwrap();
        arr.set(0, 255.0).unwrap();
        arr.set(1, 256.0).unwrap();
        arr.set(2, -1.0).unwrap();
        assert_eq!(arr.to_vec().unwrap(), vec![255.0, 0.0, 255.0, 0.0]);
        assert!(matches!(arr.get(4), Err(StorageError::InvalidIndex(_))));
    }

    #[test]
    fn test_clamped() {
        let arr = JsTypedArray::from_numbers(
            TypedArrayKind::Uint8Clamped,
            &[300.0, -10.0, 1.5, f64::NAN],
            &config(),
        )
        .unwrap();
        assert_eq!(arr.to_vec().unwrap(), vec![255.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_aliasing_views() {
        let buffer = Rc::new(JsArrayBuffer::new(4));
        let bytes = JsTypedArray::new(buffer.clone(), TypedArrayKind::Uint8, 0, None).unwrap();
        let word = JsTypedArray::new(buffer, TypedArrayKind::Uint32, 0, None).unwrap();
        word.set(0, 0x0102_0304 as f64).unwrap();
        let expected = 0x0102_0304u32.to_ne_bytes().map(f64::from);
        assert_eq!(bytes.to_vec().unwrap(), expected.to_vec());
    }

    #[test]
    fn test_raw_and_compare() {
        let arr = JsTypedArray::from_numbers(TypedArrayKind::Float32, &[2.0, -0.0], &config()).unwrap();
        assert_eq!(arr.get_raw(1).unwrap(), (-0.0f32).to_bits() as u64);
        assert!(arr.less(1, 0).unwrap());
        arr.swap(0, 1).unwrap();
        assert!(arr.get(0).unwrap().is_sign_negative());
        arr.set_raw(0, 1.0f32.to_bits() as u64).unwrap();
        assert_eq!(arr.get(0).unwrap(), 1.0);
    }

    #[test]
    fn test_length_tracking() {
        let buffer = Rc::new(JsArrayBuffer::allocate_resizable(8, 16, &config()).unwrap());
        let arr = JsTypedArray::new(buffer.clone(), TypedArrayKind::Uint16, 2, None).unwrap();
        assert!(arr.is_length_tracking());
        assert_eq!(arr.length(), 3);
        buffer.resize(16).unwrap();
        assert_eq!(arr.length(), 7);
        buffer.resize(1).unwrap();
        assert!(arr.is_out_of_bounds());
        assert_eq!(arr.length(), 0);
        assert!(arr.validate().is_err());
    }

    #[test]
    fn test_fixed_view_out_of_bounds_after_shrink() {
        let buffer = Rc::new(JsArrayBuffer::allocate_resizable(8, 8, &config()).unwrap());
        let arr = JsTypedArray::new(buffer.clone(), TypedArrayKind::Uint8, 0, Some(8)).unwrap();
        buffer.resize(4).unwrap();
        assert!(arr.is_out_of_bounds());
        buffer.resize(8).unwrap();
        assert_eq!(arr.length(), 8);
    }

    #[test]
    fn test_integer_indexed_keys() {
        let mut arr = JsTypedArray::from_numbers(TypedArrayKind::Int8, &[1.0, 2.0], &config()).unwrap();
        assert!(arr.get_by_key(&PropertyKey::from("1")).unwrap().same_value(&Value::int32(2)));
        assert!(arr.get_by_key(&PropertyKey::from("-0")).unwrap().is_undefined());
        assert!(arr.get_by_key(&PropertyKey::from("1.5")).unwrap().is_undefined());
        assert!(arr.get_by_key(&PropertyKey::from("01")).is_none());
        assert!(arr.set_by_key(&PropertyKey::from("7"), &Value::int32(3)));
        assert!(!arr.set_by_key(&PropertyKey::from("foo"), &Value::int32(3)));

        assert_eq!(arr.delete_indexed(0, false), Ok(false));
        assert_eq!(arr.delete_indexed(5, false), Ok(true));
        let frozen = PropertyDescriptor::data_with(Value::int32(1), false, true, true);
        assert_eq!(arr.define_indexed(0, frozen, false), Ok(false));
        assert_eq!(
            arr.define_indexed(0, PropertyDescriptor::data(Value::int32(9)), true),
            Ok(true)
        );
        assert_eq!(arr.get(0).unwrap(), 9.0);
        assert_eq!(arr.indexed_keys(), vec![0, 1]);
    }

    #[test]
    fn test_detached_access_fails() {
        let arr = JsTypedArray::with_length(TypedArrayKind::Uint32, 4, &config()).unwrap();
        arr.set(0, 0xFFFF_FFFFu32 as f64).unwrap();
        assert!(arr.buffer().detach());
        assert!(matches!(arr.get(0), Err(StorageError::DetachedBuffer(_))));
        assert!(matches!(arr.set(0, 1.0), Err(StorageError::DetachedBuffer(_))));
        assert!(arr.get_element(0.0).is_undefined());
        assert_eq!(arr.length(), 0);
    }

    #[test]
    fn test_set_element_skips_invalid_writes() {
        let buffer = Rc::new(JsArrayBuffer::allocate_resizable(4, 4, &config()).unwrap());
        let arr = JsTypedArray::new(buffer.clone(), TypedArrayKind::Int16, 0, None).unwrap();
        arr.set_element(1.0, &Value::number(-2.0));
        arr.set_element(1.5, &Value::int32(7));
        arr.set_element(2.0, &Value::int32(7));
        assert_eq!(arr.to_vec().unwrap(), vec![0.0, -2.0]);

        buffer.resize(2).unwrap();
        arr.set_element(1.0, &Value::int32(5));
        assert_eq!(arr.to_vec().unwrap(), vec![0.0]);
        buffer.resize(4).unwrap();
        assert_eq!(arr.get(1).unwrap(), 0.0);

        buffer.detach();
        arr.set_element(0.0, &Value::int32(5));
        assert!(arr.is_detached());
    }
}
