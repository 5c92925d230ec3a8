//! ArrayBuffer implementation
//!
//! The byte region behind every typed array and DataView. A buffer is either
//! live or detached; detaching drops the bytes and is irreversible, after which
//! every entry point that would touch memory fails with a detached-buffer
//! error instead.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use crate::config::StorageConfig;
use crate::convert::relative_bound;
use crate::error::{StorageError, StorageResult};
use crate::species::Species;
use crate::value::Value;

/// Shared handle to a buffer; views keep one of these.
pub type BufferRef = Rc<JsArrayBuffer>;

/// A JavaScript ArrayBuffer
///
/// Optionally resizable up to `max_byte_length` (ES2024).
#[derive(Debug)]
pub struct JsArrayBuffer {
    /// The underlying byte data. None if detached.
    data: RefCell<Option<Vec<u8>>>,
    /// Maximum byte length for resizable buffers
    max_byte_length: Option<usize>,
}

fn allocate_zeroed(byte_length: usize) -> StorageResult<Vec<u8>> {
    let mut data = Vec::new();
    if data.try_reserve_exact(byte_length).is_err() {
        tracing::warn!(byte_length, "array buffer allocation refused");
        return Err(StorageError::OutOfMemory(byte_length));
    }
    data.resize(byte_length, 0);
    Ok(data)
}

fn check_ceiling(byte_length: i64, config: &StorageConfig) -> StorageResult<usize> {
    if byte_length < 0 {
        return Err(StorageError::invalid_length("Invalid array buffer length"));
    }
    match usize::try_from(byte_length) {
        Ok(len) if len <= config.max_byte_length => Ok(len),
        _ => Err(StorageError::invalid_length(format!(
            "Array buffer allocation of {byte_length} bytes exceeds the limit of {}",
            config.max_byte_length
        ))),
    }
}

impl JsArrayBuffer {
    /// Create a zero-filled buffer without consulting any limit
    pub fn new(byte_length: usize) -> Self {
        Self {
            data: RefCell::new(Some(vec![0; byte_length])),
            max_byte_length: None,
        }
    }

    /// Allocate a zero-filled fixed-length buffer.
    ///
    /// Negative lengths and lengths above the configured ceiling are range
    /// failures; an allocator refusal is `OutOfMemory`.
    pub fn allocate(byte_length: i64, config: &StorageConfig) -> StorageResult<Self> {
        let len = check_ceiling(byte_length, config)?;
        Ok(Self {
            data: RefCell::new(Some(allocate_zeroed(len)?)),
            max_byte_length: None,
        })
    }

    /// Allocate a resizable buffer (ES2024)
    pub fn allocate_resizable(
        byte_length: i64,
        max_byte_length: i64,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        let max = check_ceiling(max_byte_length, config)?;
        let len = check_ceiling(byte_length, config)?;
        if len > max {
            return Err(StorageError::invalid_length(format!(
                "Invalid array buffer length {len}, maximum is {max}"
            )));
        }
        Ok(Self {
            data: RefCell::new(Some(allocate_zeroed(len)?)),
            max_byte_length: Some(max),
        })
    }

    /// Adopt bytes owned by the host
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: RefCell::new(Some(bytes)),
            max_byte_length: None,
        }
    }

    /// Check if the buffer is detached
    pub fn is_detached(&self) -> bool {
        self.data.borrow().is_none()
    }

    /// Detach the buffer, dropping its bytes.
    ///
    /// Returns whether this call performed the detach.
    pub fn detach(&self) -> bool {
        let dropped = self.data.borrow_mut().take();
        if let Some(bytes) = &dropped {
            tracing::debug!(byte_length = bytes.len(), "array buffer detached");
        }
        dropped.is_some()
    }

    /// Fail with a detached-buffer error if the buffer is detached
    pub fn ensure_not_detached(&self) -> StorageResult<()> {
        if self.is_detached() {
            return Err(detached_error());
        }
        Ok(())
    }

    /// Get the byte length (0 if detached)
    pub fn byte_length(&self) -> usize {
        self.data.borrow().as_ref().map_or(0, |d| d.len())
    }

    /// Get the max byte length for resizable buffers
    pub fn max_byte_length(&self) -> Option<usize> {
        self.max_byte_length
    }

    /// Check if this is a resizable buffer
    pub fn is_resizable(&self) -> bool {
        self.max_byte_length.is_some()
    }

    /// Resize in place (resizable buffers only); new bytes are zero.
    pub fn resize(&self, new_length: usize) -> StorageResult<()> {
        let max = self
            .max_byte_length
            .ok_or_else(|| StorageError::not_writable("ArrayBuffer is not resizable"))?;
        let mut guard = self.data.borrow_mut();
        let data = guard.as_mut().ok_or_else(detached_error)?;
        if new_length > max {
            return Err(StorageError::invalid_length(format!(
                "Invalid array buffer length {new_length}, maximum is {max}"
            )));
        }
        if new_length > data.len() && data.try_reserve_exact(new_length - data.len()).is_err() {
            tracing::warn!(new_length, "array buffer resize refused");
            return Err(StorageError::OutOfMemory(new_length));
        }
        tracing::debug!(from = data.len(), to = new_length, "array buffer resized");
        data.resize(new_length, 0);
        Ok(())
    }

    /// Move the contents into a new buffer and detach this one.
    ///
    /// `new_length` of `None` keeps the current length. The result keeps this
    /// buffer's resizability.
    pub fn transfer(&self, new_length: Option<usize>) -> StorageResult<JsArrayBuffer> {
        if let (Some(len), Some(max)) = (new_length, self.max_byte_length) {
            if len > max {
                return Err(StorageError::invalid_length(format!(
                    "Invalid array buffer length {len}, maximum is {max}"
                )));
            }
        }
        self.transfer_bytes(new_length, self.max_byte_length)
    }

    /// Like [`Self::transfer`], but the result is always fixed-length
    pub fn transfer_to_fixed_length(&self, new_length: Option<usize>) -> StorageResult<JsArrayBuffer> {
        self.transfer_bytes(new_length, None)
    }

    fn transfer_bytes(
        &self,
        new_length: Option<usize>,
        max_byte_length: Option<usize>,
    ) -> StorageResult<JsArrayBuffer> {
        let mut data = self.data.borrow_mut().take().ok_or_else(detached_error)?;
        let old_length = data.len();
        if let Some(len) = new_length {
            if len > old_length && data.try_reserve_exact(len - old_length).is_err() {
                // The source stays live when the new allocation fails.
                *self.data.borrow_mut() = Some(data);
                return Err(StorageError::OutOfMemory(len));
            }
            data.resize(len, 0);
        }
        tracing::debug!(from = old_length, to = data.len(), "array buffer transferred");
        Ok(JsArrayBuffer {
            data: RefCell::new(Some(data)),
            max_byte_length,
        })
    }

    /// `ArrayBuffer.prototype.slice` with the intrinsic constructor
    pub fn slice(&self, start: f64, end: Option<f64>) -> StorageResult<JsArrayBuffer> {
        let guard = self.data.borrow();
        let data = guard.as_ref().ok_or_else(detached_error)?;
        let len = data.len();
        let first = crate::convert::relative_index(start, len);
        let last = end.map_or(len, |e| crate::convert::relative_index(e, len));
        let bytes = data[first..last.max(first)].to_vec();
        Ok(JsArrayBuffer::from_bytes(bytes))
    }

    /// `ArrayBuffer.prototype.slice` creating the result through `species`.
    ///
    /// The species result must be a live, distinct buffer of at least the
    /// requested length; this buffer is re-checked for detachment after the
    /// species call.
    pub fn slice_with<S: Species + ?Sized>(
        this: &BufferRef,
        species: &S,
        start: &Value,
        end: Option<&Value>,
    ) -> StorageResult<BufferRef> {
        let len = this.require_len()?;
        let first = relative_bound(Some(start), len, 0);
        let last = relative_bound(end, len, len);
        let count = last.saturating_sub(first);

        let target = species.create_buffer(count)?;
        target.ensure_not_detached()?;
        if Rc::ptr_eq(this, &target) {
            return Err(StorageError::InvalidSpecies(
                "ArrayBuffer subclass returned this from species constructor".to_string(),
            ));
        }
        if target.byte_length() < count {
            return Err(StorageError::invalid_length(
                "Species constructor returned a buffer that is too small",
            ));
        }
        this.ensure_not_detached()?;

        // The species call may have shrunk this buffer.
        let current = this.byte_length();
        let first = first.min(current);
        let last = last.min(current).max(first);
        this.with_bytes(|src| target.write_bytes(0, &src[first..last]))??;
        Ok(target)
    }

    fn require_len(&self) -> StorageResult<usize> {
        self.data
            .borrow()
            .as_ref()
            .map(Vec::len)
            .ok_or_else(detached_error)
    }

    /// Copy of the current contents
    pub fn to_vec(&self) -> StorageResult<Vec<u8>> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// Read bytes into a slice
    pub fn read_bytes(&self, offset: usize, dest: &mut [u8]) -> StorageResult<()> {
        self.with_bytes(|data| {
            let src = offset
                .checked_add(dest.len())
                .and_then(|end| data.get(offset..end))
                .ok_or_else(|| out_of_range(offset, dest.len()))?;
            dest.copy_from_slice(src);
            Ok(())
        })?
    }

    /// Write bytes from a slice
    pub fn write_bytes(&self, offset: usize, src: &[u8]) -> StorageResult<()> {
        self.with_bytes_mut(|data| {
            let dst = offset
                .checked_add(src.len())
                .and_then(|end| data.get_mut(offset..end))
                .ok_or_else(|| out_of_range(offset, src.len()))?;
            dst.copy_from_slice(src);
            Ok(())
        })?
    }

    /// Run `f` over the live bytes
    pub fn with_bytes<F, R>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let guard = self.data.borrow();
        guard.as_deref().map(f).ok_or_else(detached_error)
    }

    /// Run `f` over the live bytes mutably. The length cannot change.
    pub fn with_bytes_mut<F, R>(&self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut guard = self.data.borrow_mut();
        guard.as_deref_mut().map(f).ok_or_else(detached_error)
    }

    /// Live bytes for a write that was already bounds-checked; `None` once
    /// detached.
    pub(crate) fn live_bytes_mut(&self) -> Option<RefMut<'_, [u8]>> {
        RefMut::filter_map(self.data.borrow_mut(), |data| data.as_deref_mut()).ok()
    }
}

pub(crate) fn detached_error() -> StorageError {
    StorageError::detached("Cannot perform operation on a detached ArrayBuffer")
}

fn out_of_range(offset: usize, len: usize) -> StorageError {
    StorageError::invalid_index(format!(
        "Range [{offset}, {offset} + {len}) is outside the bounds of the buffer"
    ))
}
