//! Species constructor resolution
//!
//! Operations that produce a new buffer or typed array (`slice`, `map`,
//! `filter`) ask a [`Species`] for it, so an embedder can substitute
//! subclass constructors. Whatever comes back is validated before use.

use std::rc::Rc;

use crate::array_buffer::{BufferRef, JsArrayBuffer};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::typed_array::{JsTypedArray, TypedArrayKind};

/// Creates result objects for derived-object operations
pub trait Species {
    /// New buffer of `byte_length` bytes
    fn create_buffer(&self, byte_length: usize) -> StorageResult<BufferRef>;

    /// New typed array of `length` elements
    fn create_typed_array(&self, kind: TypedArrayKind, length: usize)
    -> StorageResult<JsTypedArray>;
}

/// The built-in constructors
#[derive(Debug, Clone, Default)]
pub struct IntrinsicSpecies {
    config: StorageConfig,
}

impl IntrinsicSpecies {
    /// Allocate under `config`'s limits
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

impl Species for IntrinsicSpecies {
    fn create_buffer(&self, byte_length: usize) -> StorageResult<BufferRef> {
        let len = i64::try_from(byte_length)
            .map_err(|_| StorageError::invalid_length("Invalid array buffer length"))?;
        Ok(Rc::new(JsArrayBuffer::allocate(len, &self.config)?))
    }

    fn create_typed_array(
        &self,
        kind: TypedArrayKind,
        length: usize,
    ) -> StorageResult<JsTypedArray> {
        JsTypedArray::with_length(kind, length, &self.config)
    }
}

/// TypedArraySpeciesCreate with a length argument.
///
/// The result must be live, in bounds and at least `length` long.
pub fn typed_array_species_create<S: Species + ?Sized>(
    species: &S,
    kind: TypedArrayKind,
    length: usize,
) -> StorageResult<JsTypedArray> {
    let created = species.create_typed_array(kind, length)?;
    let actual = created.validate()?;
    if actual < length {
        return Err(StorageError::invalid_length(format!(
            "Derived {} has length {actual}, expected at least {length}",
            created.kind().name()
        )));
    }
    Ok(created)
}
