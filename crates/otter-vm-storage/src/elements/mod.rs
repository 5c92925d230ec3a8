//! Indexed element storage for array objects
//!
//! An array's indexed properties live in an [`ElementStore`], a closed choice
//! between a [`DenseStore`] and a [`SparseStore`]. Writes that grow the store
//! consult the [`TransitionPolicy`]; when it asks for the other
//! representation, the store is rebuilt and swapped in place before the write
//! lands, so callers never observe an intermediate state.

pub mod dense;
pub mod sparse;
pub mod transition;

pub use dense::DenseStore;
pub use sparse::SparseStore;
pub use transition::TransitionPolicy;

use crate::error::{StorageError, StorageResult};
use crate::property::{PropertyDescriptor, Slot, apply_descriptor};
use crate::value::{ObjectHandle, Value};

/// Answer of a store asked to make room for an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// The index can be stored here
    Fits,
    /// The other representation should take over
    Handoff,
}

/// Operations shared by both element representations.
///
/// Implementors provide raw slot access; the element-level semantics of
/// `set`, `define_slot` and `delete` are written once on top of it.
pub trait IndexedStore {
    /// Owning object, for diagnostics
    fn owner(&self) -> ObjectHandle;

    /// Array `length`
    fn length(&self) -> u32;

    /// Whether `length` may change
    fn is_length_writable(&self) -> bool;

    /// Make `length` read-only (or writable again, while still configurable)
    fn set_length_writable(&mut self, writable: bool);

    /// Number of slots holding a property record
    fn property_records(&self) -> usize;

    /// Number of populated slots
    fn len(&self) -> usize;

    /// Whether no slot is populated
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot at `index`
    fn get(&self, index: u32) -> Option<&Slot>;

    /// Whether `index` is populated
    fn has(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    /// Make room for `index`, or ask for the other representation.
    fn expand(&mut self, index: u32, policy: &TransitionPolicy) -> Growth;

    /// Store `slot`, bumping `length` when needed. No attribute checks.
    fn put(&mut self, index: u32, slot: Slot) -> Option<Slot>;

    /// Remove the slot at `index`. No attribute checks; `length` unchanged.
    fn take(&mut self, index: u32) -> Option<Slot>;

    /// ArraySetLength on the stored elements.
    ///
    /// A shrink stops one past the highest non-configurable slot and reports
    /// `NotConfigurable`; everything above it has already been released.
    fn set_length(&mut self, new_len: u32) -> StorageResult<()>;

    /// Refuse new indices at or past a read-only `length`.
    fn check_length_for(&self, index: u32) -> StorageResult<()> {
        if index >= self.length() && !self.is_length_writable() {
            return Err(StorageError::invalid_length(format!(
                "Cannot add property {index}, object length is not writable"
            )));
        }
        Ok(())
    }

    /// Assign a value. Existing slots keep their attributes.
    fn set(&mut self, index: u32, value: Value, policy: &TransitionPolicy) -> StorageResult<Growth> {
        if let Some(slot) = self.get(index) {
            if !slot.is_writable() {
                return Err(StorageError::not_writable(format!(
                    "Cannot assign to read only property '{index}' of object"
                )));
            }
            let next = match slot {
                Slot::Value(_) => Slot::Value(value),
                Slot::Record(record) => {
                    let mut record = record.clone();
                    record.value = value;
                    Slot::Record(record)
                }
            };
            self.put(index, next);
            return Ok(Growth::Fits);
        }
        self.insert(index, Slot::Value(value), policy)
    }

    /// Define or redefine a slot from a descriptor.
    fn define_slot(
        &mut self,
        index: u32,
        desc: &PropertyDescriptor,
        policy: &TransitionPolicy,
    ) -> StorageResult<Growth> {
        desc.validate()?;
        if let Some(current) = self.get(index) {
            let next = apply_descriptor(index, current, desc)?;
            self.put(index, next);
            return Ok(Growth::Fits);
        }
        self.insert(index, Slot::from_record(desc.to_new_record()), policy)
    }

    /// Populate a currently-empty index.
    ///
    /// Returns `Handoff` without touching anything when the other
    /// representation should take the write.
    fn insert(&mut self, index: u32, slot: Slot, policy: &TransitionPolicy) -> StorageResult<Growth> {
        self.check_length_for(index)?;
        if self.expand(index, policy) == Growth::Handoff {
            return Ok(Growth::Handoff);
        }
        self.put(index, slot);
        Ok(Growth::Fits)
    }

    /// Delete a slot; absent indices succeed.
    fn delete(&mut self, index: u32) -> StorageResult<()> {
        match self.get(index) {
            Some(slot) if !slot.is_configurable() => Err(StorageError::not_configurable(format!(
                "Cannot delete property '{index}' of [object Array] {}",
                self.owner()
            ))),
            Some(_) => {
                self.take(index);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Run `$body` against whichever store is active, statically dispatched.
macro_rules! with_store {
    ($self:expr, $store:ident => $body:expr) => {
        match $self {
            ElementStore::Dense($store) => $body,
            ElementStore::Sparse($store) => $body,
        }
    };
}

/// The backing representation of an array's indexed properties
#[derive(Debug, Clone)]
pub enum ElementStore {
    /// Contiguous slots
    Dense(DenseStore),
    /// Sorted `(index, slot)` items
    Sparse(SparseStore),
}

impl ElementStore {
    /// New empty dense store
    pub fn new(owner: ObjectHandle) -> Self {
        Self::Dense(DenseStore::new(owner))
    }

    /// Whether the dense representation is active
    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }

    /// Whether the sparse representation is active
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Array `length`
    pub fn length(&self) -> u32 {
        with_store!(self, s => s.length())
    }

    /// Whether `length` may change
    pub fn is_length_writable(&self) -> bool {
        with_store!(self, s => s.is_length_writable())
    }

    /// Freeze `length`
    pub fn set_length_writable(&mut self, writable: bool) {
        with_store!(self, s => s.set_length_writable(writable));
    }

    /// Populated slot count
    pub fn len(&self) -> usize {
        with_store!(self, s => s.len())
    }

    /// Whether no slot is populated
    pub fn is_empty(&self) -> bool {
        with_store!(self, s => s.is_empty())
    }

    /// Slots holding property records
    pub fn property_records(&self) -> usize {
        with_store!(self, s => s.property_records())
    }

    /// Slot at `index`
    pub fn get(&self, index: u32) -> Option<&Slot> {
        with_store!(self, s => s.get(index))
    }

    /// Whether `index` is populated
    pub fn has(&self, index: u32) -> bool {
        with_store!(self, s => s.has(index))
    }

    /// Assign `value` at `index`
    pub fn set(&mut self, index: u32, value: Value, policy: &TransitionPolicy) -> StorageResult<()> {
        if with_store!(self, s => s.set(index, value.clone(), policy))? == Growth::Handoff {
            self.transition(index);
            with_store!(self, s => s.put(index, Slot::Value(value)));
        }
        Ok(())
    }

    /// Define `index` from a descriptor
    pub fn define(
        &mut self,
        index: u32,
        desc: &PropertyDescriptor,
        policy: &TransitionPolicy,
    ) -> StorageResult<()> {
        if with_store!(self, s => s.define_slot(index, desc, policy))? == Growth::Handoff {
            self.transition(index);
            with_store!(self, s => s.put(index, Slot::from_record(desc.to_new_record())));
        }
        Ok(())
    }

    /// Delete `index`
    pub fn delete(&mut self, index: u32) -> StorageResult<()> {
        with_store!(self, s => s.delete(index))
    }

    /// Change `length`
    pub fn set_length(&mut self, new_len: u32) -> StorageResult<()> {
        with_store!(self, s => s.set_length(new_len))
    }

    /// Make a populated slot non-configurable, and read-only as well when
    /// `freeze` is set. Accessors keep their setter.
    pub fn restrict(&mut self, index: u32, freeze: bool) {
        let Some(slot) = self.get(index) else {
            return;
        };
        let mut record = slot.to_record();
        record.flags.configurable = false;
        if freeze && !record.flags.accessor {
            record.flags.writable = false;
        }
        with_store!(self, s => s.put(index, Slot::from_record(record)));
    }

    /// Remove and return the slot at `index` without attribute checks.
    pub fn take(&mut self, index: u32) -> Option<Slot> {
        with_store!(self, s => s.take(index))
    }

    /// Swap to the other representation ahead of inserting `index`.
    fn transition(&mut self, index: u32) {
        let owner = with_store!(self, s => s.owner());
        let current = std::mem::replace(self, Self::Sparse(SparseStore::new(owner)));
        *self = match current {
            Self::Dense(dense) => Self::Sparse(transition::dense_to_sparse(dense)),
            Self::Sparse(sparse) => Self::Dense(transition::sparse_to_dense(sparse, index)),
        };
    }

    /// Populated `(index, slot)` pairs in ascending index order
    pub fn entries(&self) -> Entries<'_> {
        match self {
            Self::Dense(d) => Entries::Dense(d.iter_slots()),
            Self::Sparse(s) => Entries::Sparse(s.iter_items()),
        }
    }

    /// Populated indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries().map(|(i, _)| i)
    }
}

/// Ascending iterator over populated slots of either representation
#[derive(Debug, Clone)]
pub enum Entries<'a> {
    #[doc(hidden)]
    Dense(std::iter::Enumerate<std::slice::Iter<'a, Option<Slot>>>),
    #[doc(hidden)]
    Sparse(std::slice::Iter<'a, (u32, Slot)>),
}

impl<'a> Iterator for Entries<'a> {
    type Item = (u32, &'a Slot);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Dense(iter) => iter.find_map(|(i, s)| s.as_ref().map(|s| (i as u32, s))),
            Self::Sparse(iter) => iter.next().map(|(i, s)| (*i, s)),
        }
    }
}
