//! DataView implementation
//!
//! DataView provides a low-level interface for reading and writing multiple
//! number types in an ArrayBuffer, with control over byte order (endianness).
//! Unlike a typed array it has no element grid: any byte offset is valid as
//! long as the access fits in the view.

use crate::array_buffer::{BufferRef, detached_error};
use crate::bytes::{Endianness, read_bits, write_bits};
use crate::convert::to_index;
use crate::error::{StorageError, StorageResult};
use crate::typed_array::TypedArrayKind;
use crate::value::Value;

/// A JavaScript DataView
#[derive(Debug, Clone)]
pub struct JsDataView {
    /// The underlying ArrayBuffer
    buffer: BufferRef,
    /// Byte offset into the buffer
    byte_offset: usize,
    /// Length of the view in bytes; `None` tracks a resizable buffer
    byte_length: Option<usize>,
}

macro_rules! view_accessors {
    ($($get:ident / $set:ident: $ty:ty => $kind:ident;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` at `byte_offset`")]
            pub fn $get(&self, byte_offset: usize, order: Endianness) -> StorageResult<$ty> {
                let kind = TypedArrayKind::$kind;
                let bits = self.get_raw(byte_offset, kind.element_size(), order)?;
                Ok(kind.decode(bits) as $ty)
            }

            #[doc = concat!("Write a `", stringify!($ty), "` at `byte_offset`")]
            pub fn $set(&self, byte_offset: usize, value: $ty, order: Endianness) -> StorageResult<()> {
                let kind = TypedArrayKind::$kind;
                self.set_raw(byte_offset, kind.element_size(), kind.encode(value as f64), order)
            }
        )*
    };
}

impl JsDataView {
    /// Create a new DataView over an ArrayBuffer.
    ///
    /// Without `byte_length` the view covers the rest of the buffer, and
    /// follows it if the buffer is resizable.
    pub fn new(
        buffer: BufferRef,
        byte_offset: usize,
        byte_length: Option<usize>,
    ) -> StorageResult<Self> {
        buffer.ensure_not_detached()?;
        let buf_len = buffer.byte_length();

        if byte_offset > buf_len {
            return Err(StorageError::invalid_index(format!(
                "Start offset {byte_offset} is outside the bounds of the buffer"
            )));
        }

        let byte_length = match byte_length {
            Some(len) => {
                if byte_offset.checked_add(len).is_none_or(|end| end > buf_len) {
                    return Err(StorageError::invalid_length(format!(
                        "Invalid DataView length {len}"
                    )));
                }
                Some(len)
            }
            None if buffer.is_resizable() => None,
            None => Some(buf_len - byte_offset),
        };

        Ok(Self {
            buffer,
            byte_offset,
            byte_length,
        })
    }

    /// Get the underlying ArrayBuffer
    pub fn buffer(&self) -> &BufferRef {
        &self.buffer
    }

    /// Get the byte offset into the buffer
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Get the byte length of the view (0 when detached or out of bounds)
    pub fn byte_length(&self) -> usize {
        self.view_byte_length().unwrap_or(0)
    }

    /// Check if the underlying buffer is detached
    pub fn is_detached(&self) -> bool {
        self.buffer.is_detached()
    }

    /// GetViewByteLength, failing when the view no longer fits its buffer
    pub fn view_byte_length(&self) -> StorageResult<usize> {
        if self.buffer.is_detached() {
            return Err(detached_error());
        }
        let buf_len = self.buffer.byte_length();
        let fits = match self.byte_length {
            Some(len) => self.byte_offset + len <= buf_len,
            None => self.byte_offset <= buf_len,
        };
        if !fits {
            return Err(StorageError::detached("DataView is out of bounds"));
        }
        Ok(self.byte_length.unwrap_or(buf_len - self.byte_offset))
    }

    fn check_bounds(&self, byte_offset: usize, size: usize) -> StorageResult<usize> {
        let view_len = self.view_byte_length()?;
        if byte_offset.checked_add(size).is_none_or(|end| end > view_len) {
            return Err(StorageError::invalid_index(
                "Offset is outside the bounds of the DataView",
            ));
        }
        Ok(self.byte_offset + byte_offset)
    }

    /// Read `size` bytes at `byte_offset` in the given order
    pub fn get_raw(&self, byte_offset: usize, size: usize, order: Endianness) -> StorageResult<u64> {
        let at = self.check_bounds(byte_offset, size)?;
        self.buffer.with_bytes(|data| read_bits(data, at, size, order))
    }

    /// Write the low `size` bytes of `bits` at `byte_offset`
    pub fn set_raw(
        &self,
        byte_offset: usize,
        size: usize,
        bits: u64,
        order: Endianness,
    ) -> StorageResult<()> {
        let at = self.check_bounds(byte_offset, size)?;
        self.buffer
            .with_bytes_mut(|data| write_bits(data, at, size, bits, order))
    }

    /// Get an Int8 at the specified byte offset
    pub fn get_int8(&self, byte_offset: usize) -> StorageResult<i8> {
        Ok(self.get_raw(byte_offset, 1, Endianness::Native)? as u8 as i8)
    }

    /// Get a Uint8 at the specified byte offset
    pub fn get_uint8(&self, byte_offset: usize) -> StorageResult<u8> {
        Ok(self.get_raw(byte_offset, 1, Endianness::Native)? as u8)
    }

    /// Set an Int8 at the specified byte offset
    pub fn set_int8(&self, byte_offset: usize, value: i8) -> StorageResult<()> {
        self.set_raw(byte_offset, 1, value as u8 as u64, Endianness::Native)
    }

    /// Set a Uint8 at the specified byte offset
    pub fn set_uint8(&self, byte_offset: usize, value: u8) -> StorageResult<()> {
        self.set_raw(byte_offset, 1, value as u64, Endianness::Native)
    }

    view_accessors! {
        get_int16 / set_int16: i16 => Int16;
        get_uint16 / set_uint16: u16 => Uint16;
        get_int32 / set_int32: i32 => Int32;
        get_uint32 / set_uint32: u32 => Uint32;
        get_float32 / set_float32: f32 => Float32;
        get_float64 / set_float64: f64 => Float64;
    }

    /// GetViewValue: coerce the request, then read.
    ///
    /// `request_index` goes through ToIndex and `little_endian` through
    /// ToBoolean before the buffer is looked at.
    pub fn get_view_value(
        &self,
        kind: TypedArrayKind,
        request_index: &Value,
        little_endian: &Value,
    ) -> StorageResult<Value> {
        let index = to_index(request_index)?;
        let order = Endianness::from_little_endian(little_endian.to_boolean());
        let bits = self.get_raw(index, kind.element_size(), order)?;
        Ok(Value::number(kind.decode(bits)))
    }

    /// SetViewValue: coerce the request and the value, then write.
    pub fn set_view_value(
        &self,
        kind: TypedArrayKind,
        request_index: &Value,
        little_endian: &Value,
        value: &Value,
    ) -> StorageResult<()> {
        let index = to_index(request_index)?;
        let bits = kind.encode(value.to_number());
        let order = Endianness::from_little_endian(little_endian.to_boolean());
        self.set_raw(index, kind.element_size(), bits, order)
    }
}
