//! Dense <-> sparse conversion policy
//!
//! Neither store owns the decision. Dense growth asks
//! [`TransitionPolicy::prefers_sparse`] before reallocating, sparse insertion
//! asks [`TransitionPolicy::prefers_dense`] before shifting another item in.
//! Reads never consult the policy.

use serde::Deserialize;

use super::IndexedStore;
use super::dense::DenseStore;
use crate::error::{StorageError, StorageResult};
use super::sparse::SparseStore;

/// Thresholds for switching element representation.
///
/// The numbers are tuning heuristics; both conversions are correct for any
/// values that pass [`TransitionPolicy::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransitionPolicy {
    /// Dense growth past this index may go sparse
    pub sparse_index_threshold: u32,
    /// ...when `index / populated` exceeds this ratio
    pub sparse_density_ratio: u32,
    /// Sparse stores with at least this many items may go dense
    pub dense_item_threshold: usize,
    /// ...when `max_index >> dense_index_shift` is below the item count
    pub dense_index_shift: u32,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            sparse_index_threshold: 4096,
            sparse_density_ratio: 10,
            dense_item_threshold: 1024,
            dense_index_shift: 3,
        }
    }
}

impl TransitionPolicy {
    /// Policy that never leaves the dense representation
    pub fn always_dense() -> Self {
        Self {
            sparse_index_threshold: u32::MAX,
            ..Self::default()
        }
    }

    /// Whether growing a dense store to `index` should hand off to sparse.
    pub fn prefers_sparse(&self, index: u32, populated: usize) -> bool {
        if index <= self.sparse_index_threshold {
            return false;
        }
        populated == 0 || (index as usize / populated) > self.sparse_density_ratio as usize
    }

    /// Whether inserting `index` into a sparse store of `items` entries whose
    /// highest index is `max_index` should hand off to dense.
    pub fn prefers_dense(&self, index: u32, items: usize, max_index: Option<u32>) -> bool {
        let count = items + 1;
        if count < self.dense_item_threshold {
            return false;
        }
        let top = max_index.map_or(index, |m| m.max(index));
        top.checked_shr(self.dense_index_shift)
            .is_some_and(|scaled| (scaled as usize) < count)
    }

    /// Reject thresholds that make a conversion meaningless.
    pub fn validate(&self) -> StorageResult<()> {
        if self.dense_item_threshold == 0 {
            return Err(StorageError::InvalidConfig(
                "dense_item_threshold must be at least 1".to_string(),
            ));
        }
        if self.dense_index_shift >= u32::BITS {
            return Err(StorageError::InvalidConfig(format!(
                "dense_index_shift must be below {}, got {}",
                u32::BITS,
                self.dense_index_shift
            )));
        }
        Ok(())
    }
}

/// Re-home every populated dense slot into a sorted item list.
pub fn dense_to_sparse(dense: DenseStore) -> SparseStore {
    let owner = dense.owner();
    let length = dense.length();
    let length_writable = dense.is_length_writable();
    let populated = dense.populated();
    let items: Vec<_> = dense
        .into_slots()
        .into_iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.map(|s| (i as u32, s)))
        .collect();
    debug_assert_eq!(items.len(), populated);
    tracing::debug!(
        owner = %owner,
        length,
        items = items.len(),
        "array elements converted to sparse"
    );
    SparseStore::from_items(owner, items, length, length_writable)
}

/// Scatter sparse items into a contiguous slot array.
///
/// The array covers the highest populated index and `index`, the insertion
/// that triggered the conversion.
pub fn sparse_to_dense(sparse: SparseStore, index: u32) -> DenseStore {
    let owner = sparse.owner();
    let length = sparse.length();
    let length_writable = sparse.is_length_writable();
    let top = sparse.max_index().map_or(index, |m| m.max(index));
    let items = sparse.into_items();
    let count = items.len();

    let mut slots = Vec::with_capacity(top as usize + 1);
    slots.resize_with(top as usize + 1, || None);
    for (i, slot) in items {
        slots[i as usize] = Some(slot);
    }
    tracing::debug!(
        owner = %owner,
        length,
        items = count,
        slots = slots.len(),
        "array elements converted to dense"
    );
    DenseStore::from_slots(owner, slots, length, length_writable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_sparse() {
        let policy = TransitionPolicy::default();
        assert!(!policy.prefers_sparse(4096, 0));
        assert!(policy.prefers_sparse(4097, 0));
        assert!(policy.prefers_sparse(5000, 10));
        assert!(!policy.prefers_sparse(5000, 1000));
        assert!(!TransitionPolicy::always_dense().prefers_sparse(u32::MAX - 1, 0));
    }

    #[test]
    fn test_prefers_dense() {
        let policy = TransitionPolicy::default();
        assert!(!policy.prefers_dense(10, 100, Some(200)));
        // 1024 items spread over 5001 slots: 5000 >> 3 == 625 < 1024
        assert!(policy.prefers_dense(1023, 1023, Some(5000)));
        // 1024 items spread over a million slots stays sparse
        assert!(!policy.prefers_dense(1023, 1023, Some(1_000_000)));
    }

    #[test]
    fn test_oversized_shift_stays_sparse() {
        let policy = TransitionPolicy {
            dense_item_threshold: 1,
            dense_index_shift: 40,
            ..TransitionPolicy::default()
        };
        assert!(!policy.prefers_dense(7, 1, Some(3)));
        assert!(policy.validate().is_err());
        assert!(TransitionPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_policy_from_json() {
        let policy: TransitionPolicy =
            serde_json::from_str(r#"{"sparse_index_threshold": 64}"#).unwrap();
        assert_eq!(policy.sparse_index_threshold, 64);
        assert_eq!(policy.dense_item_threshold, 1024);
    }
}
