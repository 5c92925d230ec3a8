//! Sorted association-list element storage
//!
//! Used when populated indices are few relative to the index range. Items are
//! kept strictly ascending by index with no holes: an absent index simply has
//! no item.

use super::transition::TransitionPolicy;
use super::{Growth, IndexedStore};
use crate::error::{StorageError, StorageResult};
use crate::property::Slot;
use crate::value::ObjectHandle;

/// Sparse element store
#[derive(Debug, Clone)]
pub struct SparseStore {
    owner: ObjectHandle,
    items: Vec<(u32, Slot)>,
    length: u32,
    length_writable: bool,
    records: usize,
}

impl SparseStore {
    /// Create an empty store for `owner`
    pub fn new(owner: ObjectHandle) -> Self {
        Self {
            owner,
            items: Vec::new(),
            length: 0,
            length_writable: true,
            records: 0,
        }
    }

    /// Build a store from items already sorted by index.
    pub(crate) fn from_items(
        owner: ObjectHandle,
        items: Vec<(u32, Slot)>,
        length: u32,
        length_writable: bool,
    ) -> Self {
        debug_assert!(items.windows(2).all(|w| w[0].0 < w[1].0));
        let records = items.iter().filter(|(_, s)| s.is_record()).count();
        Self {
            owner,
            items,
            length,
            length_writable,
            records,
        }
    }

    pub(crate) fn into_items(self) -> Vec<(u32, Slot)> {
        self.items
    }

    /// Binary search for `index`: `Ok(position)` when present, otherwise
    /// `Err(insertion point)`.
    pub fn find_idx(&self, index: u32) -> Result<usize, usize> {
        self.items.binary_search_by_key(&index, |(i, _)| *i)
    }

    /// Highest populated index
    pub fn max_index(&self) -> Option<u32> {
        self.items.last().map(|(i, _)| *i)
    }

    /// Iterate items in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Slot)> + '_ {
        self.items.iter().map(|(i, s)| (*i, s))
    }

    pub(crate) fn iter_items(&self) -> std::slice::Iter<'_, (u32, Slot)> {
        self.items.iter()
    }

    /// Insert a new item keeping sort order; replaces an existing one.
    pub fn add(&mut self, index: u32, slot: Slot) -> Option<Slot> {
        if slot.is_record() {
            self.records += 1;
        }
        let previous = match self.find_idx(index) {
            Ok(pos) => Some(std::mem::replace(&mut self.items[pos].1, slot)),
            Err(pos) => {
                self.items.insert(pos, (index, slot));
                None
            }
        };
        if previous.as_ref().is_some_and(Slot::is_record) {
            self.records -= 1;
        }
        previous
    }
}

impl IndexedStore for SparseStore {
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
        self.items.len()
    }

    fn get(&self, index: u32) -> Option<&Slot> {
        let pos = self.find_idx(index).ok()?;
        Some(&self.items[pos].1)
    }

    fn expand(&mut self, index: u32, policy: &TransitionPolicy) -> Growth {
        if self.find_idx(index).is_ok() {
            return Growth::Fits;
        }
        if policy.prefers_dense(index, self.items.len(), self.max_index()) {
            Growth::Handoff
        } else {
            Growth::Fits
        }
    }

    fn put(&mut self, index: u32, slot: Slot) -> Option<Slot> {
        if index >= self.length {
            self.length = index + 1;
        }
        self.add(index, slot)
    }

    fn take(&mut self, index: u32) -> Option<Slot> {
        let pos = self.find_idx(index).ok()?;
        let (_, slot) = self.items.remove(pos);
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

        let start = self.items.partition_point(|(i, _)| *i < new_len);
        let blocker = self.items[start..]
            .iter()
            .rposition(|(_, s)| !s.is_configurable())
            .map(|p| start + p);
        let keep = blocker.map_or(start, |b| b + 1);
        for (_, slot) in self.items.drain(keep..) {
            if slot.is_record() {
                self.records -= 1;
            }
        }

        match blocker {
            Some(pos) => {
                let index = self.items[pos].0;
                self.length = index + 1;
                Err(StorageError::not_configurable(format!(
                    "Cannot delete property '{index}' of [object Array] {}",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyRecord;
    use crate::value::Value;

    fn store() -> SparseStore {
        SparseStore::new(ObjectHandle(2))
    }

    #[test]
    fn test_add_keeps_order() {
        let mut s = store();
        for i in [50, 10, 30, 20, 40] {
            s.put(i, Slot::Value(Value::int32(i as i32)));
        }
        let indices: Vec<u32> = s.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![10, 20, 30, 40, 50]);
        assert_eq!(s.length(), 51);
        assert_eq!(s.find_idx(30), Ok(2));
        assert_eq!(s.find_idx(35), Err(3));
    }

    #[test]
    fn test_take_removes_item() {
        let mut s = store();
        s.put(7, Slot::from_record(PropertyRecord::data(Value::int32(1), false, true, true)));
        assert_eq!(s.property_records(), 1);
        assert!(s.take(7).is_some());
        assert_eq!(s.len(), 0);
        assert_eq!(s.property_records(), 0);
        assert_eq!(s.length(), 8);
    }

    #[test]
    fn test_shrink_truncates_items() {
        let mut s = store();
        for i in [10, 100_000, 200_000] {
            s.put(i, Slot::Value(Value::int32(1)));
        }
        s.set_length(150_000).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.length(), 150_000);
        s.set_length(10).unwrap();
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_shrink_blocked_by_non_configurable() {
        let mut s = store();
        s.put(10, Slot::Value(Value::int32(1)));
        s.put(
            9000,
            Slot::from_record(PropertyRecord::data(Value::int32(2), true, true, false)),
        );
        s.put(20_000, Slot::Value(Value::int32(3)));

        assert!(matches!(s.set_length(0), Err(StorageError::NotConfigurable(_))));
        assert_eq!(s.length(), 9001);
        assert_eq!(s.len(), 2);
        assert!(s.get(10).is_some());
        assert!(s.get(20_000).is_none());
    }

    #[test]
    fn test_expand_hands_off_when_dense_enough() {
        let mut s = store();
        let policy = TransitionPolicy {
            dense_item_threshold: 4,
            ..TransitionPolicy::default()
        };
        for i in 0..3 {
            s.put(i, Slot::Value(Value::int32(1)));
        }
        assert_eq!(s.expand(3, &policy), Growth::Handoff);
        assert_eq!(s.expand(1, &policy), Growth::Fits);
        assert_eq!(s.expand(1000, &policy), Growth::Fits);
    }
}
