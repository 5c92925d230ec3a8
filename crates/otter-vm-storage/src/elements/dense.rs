//! Contiguous element storage
//!
//! Slots `0..slots.len()` are addressed directly; `None` marks a hole. The
//! slot vector never extends past `length`, and its capacity grows by half
//! again on reallocation so appends stay amortized O(1).

use super::transition::TransitionPolicy;
use super::{Growth, IndexedStore};
use crate::error::{StorageError, StorageResult};
use crate::property::Slot;
use crate::value::ObjectHandle;

/// Smallest allocation made when a dense store first grows
const MIN_CAPACITY: usize = 8;

/// Dense element store
#[derive(Debug, Clone)]
pub struct DenseStore {
    owner: ObjectHandle,
    slots: Vec<Option<Slot>>,
    length: u32,
    length_writable: bool,
    populated: usize,
    records: usize,
}

impl DenseStore {
    /// Create an empty store for `owner`
    pub fn new(owner: ObjectHandle) -> Self {
        Self {
            owner,
            slots: Vec::new(),
            length: 0,
            length_writable: true,
            populated: 0,
            records: 0,
        }
    }

    /// Rebuild a store from scattered slots, recounting population.
    pub(crate) fn from_slots(
        owner: ObjectHandle,
        slots: Vec<Option<Slot>>,
        length: u32,
        length_writable: bool,
    ) -> Self {
        let populated = slots.iter().filter(|s| s.is_some()).count();
        let records = slots.iter().flatten().filter(|s| s.is_record()).count();
        Self {
            owner,
            slots,
            length,
            length_writable,
            populated,
            records,
        }
    }

    pub(crate) fn into_slots(self) -> Vec<Option<Slot>> {
        self.slots
    }

    /// Number of populated slots
    pub fn populated(&self) -> usize {
        self.populated
    }

    /// Allocated slot capacity
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Slots currently addressable without growing
    pub fn slot_len(&self) -> usize {
        self.slots.len()
    }

    /// Iterate populated slots in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i as u32, s)))
    }

    pub(crate) fn iter_slots(&self) -> std::iter::Enumerate<std::slice::Iter<'_, Option<Slot>>> {
        self.slots.iter().enumerate()
    }

    fn grow_to(&mut self, required: usize) {
        if required > self.slots.capacity() {
            let cap = self.slots.capacity();
            let target = (cap + cap / 2).max(required).max(MIN_CAPACITY);
            self.slots.reserve_exact(target - self.slots.len());
        }
        self.slots.resize_with(required, || None);
    }

    fn release_tail(&mut self, keep: usize) {
        for slot in self.slots.drain(keep..).flatten() {
            self.populated -= 1;
            if slot.is_record() {
                self.records -= 1;
            }
        }
        if keep < self.slots.capacity() / 2 {
            self.slots.shrink_to(keep.max(MIN_CAPACITY));
        }
    }
}

impl IndexedStore for DenseStore {
    fn owner(&self) -> ObjectHandle {
        self.owner
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn is_length_writable(&self) -> bool {
        self.length_writable
    }

    fn set_length_writable(&mut self, writable: bool) {
        self.length_writable = writable;
    }

    fn property_records(&self) -> usize {
        self.records
    }

    fn len(&self) -> usize {
        self.populated
    }

    fn get(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)?.as_ref()
    }

    fn expand(&mut self, index: u32, policy: &TransitionPolicy) -> Growth {
        let required = index as usize + 1;
        if required <= self.slots.len() {
            return Growth::Fits;
        }
        if policy.prefers_sparse(index, self.populated) {
            return Growth::Handoff;
        }
        self.grow_to(required);
        Growth::Fits
    }

    fn put(&mut self, index: u32, slot: Slot) -> Option<Slot> {
        let i = index as usize;
        if i >= self.slots.len() {
            self.grow_to(i + 1);
        }
        if index >= self.length {
            self.length = index + 1;
        }
        if slot.is_record() {
            self.records += 1;
        }
        let previous = self.slots[i].replace(slot);
        match &previous {
            Some(old) if old.is_record() => self.records -= 1,
            Some(_) => {}
            None => self.populated += 1,
        }
        previous
    }

    fn take(&mut self, index: u32) -> Option<Slot> {
        let slot = self.slots.get_mut(index as usize)?.take()?;
        self.populated -= 1;
        if slot.is_record() {
            self.records -= 1;
        }
        Some(slot)
    }

    fn set_length(&mut self, new_len: u32) -> StorageResult<()> {
        if new_len == self.length {
            return Ok(());
        }
        if !self.length_writable {
            return Err(StorageError::invalid_length(
                "Cannot assign to read only property 'length' of object '[object Array]'",
            ));
        }
        if new_len > self.length {
            self.length = new_len;
            return Ok(());
        }

        let start = (new_len as usize).min(self.slots.len());
        let blocker = self.slots[start..]
            .iter()
            .rposition(|s| s.as_ref().is_some_and(|s| !s.is_configurable()))
            .map(|p| start + p);
        let keep = blocker.map_or(start, |b| b + 1);
        self.release_tail(keep);

        match blocker {
            Some(b) => {
                self.length = b as u32 + 1;
                Err(StorageError::not_configurable(format!(
                    "Cannot delete property '{b}' of [object Array] {}",
                    self.owner
                )))
            }
            None => {
                self.length = new_len;
                Ok(())
            }
        }
    }
}
