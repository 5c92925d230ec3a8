//! Element store transition tests
//!
//! Exercise arrays whose index distribution forces the dense <-> sparse
//! conversions, and check that nothing observable changes across them.

use otter_vm_storage::{
    ArrayObject, IndexedProperties, ObjectHandle, ObjectTable, PropertyDescriptor, StorageConfig,
    TransitionPolicy, Value,
};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open(value: i32) -> PropertyDescriptor {
    PropertyDescriptor::data_with(Value::int32(value), true, true, true)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_far_define_goes_sparse_and_back() {
    init_tracing();
    let mut table = ObjectTable::new(StorageConfig::default());
    let handle = table.create_array();
    let array = table.array_mut(handle).unwrap();

    assert!(array.define_indexed(5000, open(1), true).unwrap());
    assert!(array.elements().is_sparse());
    assert_eq!(array.length(), 5001);

    for i in 0..5000 {
        array.define_indexed(i, open(i as i32 + 10), true).unwrap();
    }
    assert!(array.elements().is_dense());
    assert_eq!(array.length(), 5001);
    assert_eq!(array.get_indexed_value(5000).unwrap().as_number(), Some(1.0));
    assert_eq!(array.get_indexed_value(0).unwrap().as_number(), Some(10.0));
    assert_eq!(array.get_indexed_value(4999).unwrap().as_number(), Some(5009.0));
    assert_eq!(array.elements().len(), 5001);
}

#[test]
fn test_descriptors_survive_transition() {
    let mut array = ArrayObject::new(ObjectHandle(7), TransitionPolicy::default());
    let locked = PropertyDescriptor::data_with(Value::string("x"), false, false, false);
    array.define_indexed(3, locked, true).unwrap();
    array.set_own_indexed(100_000, Value::int32(1), true).unwrap();
    assert!(array.elements().is_sparse());

    let desc = array.get_own_indexed(3).unwrap().unwrap();
    assert_eq!(desc.writable, Some(false));
    assert_eq!(desc.enumerable, Some(false));
    assert_eq!(desc.configurable, Some(false));
    assert!(!array.set_own_indexed(3, Value::int32(2), false).unwrap());
    assert!(array.delete_indexed(3, true).is_err());
}

#[test]
fn test_always_dense_policy() {
    let config = StorageConfig::default().with_transition(TransitionPolicy::always_dense());
    let mut table = ObjectTable::new(config);
    let handle = table.create_array();
    let array = table.array_mut(handle).unwrap();
    array.set_own_indexed(10_000, Value::int32(1), true).unwrap();
    assert!(array.elements().is_dense());
    assert_eq!(array.length(), 10_001);
}

#[test]
fn test_sparse_length_shrink_drops_items() {
    let mut array = ArrayObject::new(ObjectHandle(0), TransitionPolicy::default());
    array.set_own_indexed(0, Value::int32(0), true).unwrap();
    array.set_own_indexed(50_000, Value::int32(1), true).unwrap();
    array.set_own_indexed(90_000, Value::int32(2), true).unwrap();
    assert!(array.elements().is_sparse());

    array.set_length_value(&Value::number(60_000.0), true).unwrap();
    assert_eq!(array.indexed_keys(), vec![0, 50_000]);
    assert!(array.get_indexed_value(90_000).unwrap().is_undefined());
}

#[test]
fn test_record_flags_survive_round_trip() {
    init_tracing();
    let mut array = ArrayObject::new(ObjectHandle(0), TransitionPolicy::default());
    let pinned = PropertyDescriptor::data_with(Value::int32(1), false, false, false);
    assert!(array.define_indexed(5000, pinned, true).unwrap());
    assert!(array.elements().is_sparse());
    assert_eq!(array.elements().property_records(), 1);

    for i in 0..5000 {
        array.define_indexed(i, open(i as i32), true).unwrap();
    }
    assert!(array.elements().is_dense());
    assert_eq!(array.elements().property_records(), 1);

    let desc = array.get_own_indexed(5000).unwrap().unwrap();
    assert_eq!(desc.value.as_ref().and_then(Value::as_number), Some(1.0));
    assert_eq!(desc.writable, Some(false));
    assert_eq!(desc.enumerable, Some(false));
    assert_eq!(desc.configurable, Some(false));
    assert!(!array.set_own_indexed(5000, Value::int32(2), false).unwrap());
    assert!(array.delete_indexed(5000, true).is_err());
}

// ============================================================================
// Properties
// ============================================================================

fn arb_writes() -> impl Strategy<Value = Vec<(u32, i32)>> {
    prop::collection::vec(
        (prop_oneof![0u32..64, 4000u32..20_000, 1_000_000u32..1_000_010], any::<i32>()),
        0..200,
    )
}

proptest! {
    #[test]
    fn test_representation_is_unobservable(writes in arb_writes()) {
        let mut mixed = ArrayObject::new(ObjectHandle(0), TransitionPolicy::default());
        let mut dense = ArrayObject::new(ObjectHandle(1), TransitionPolicy::always_dense());
        for &(index, value) in &writes {
            mixed.set_own_indexed(index, Value::int32(value), true).unwrap();
        }
        // A pure-dense mirror of the small writes only; the far ones would
        // allocate a megabyte of slots each.
        for &(index, value) in writes.iter().filter(|(i, _)| *i < 64) {
            dense.set_own_indexed(index, Value::int32(value), true).unwrap();
        }

        let keys = mixed.indexed_keys();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        let expected_len = writes.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
        prop_assert_eq!(mixed.length(), expected_len);

        for &(index, _) in &writes {
            let last = writes.iter().rev().find(|(i, _)| *i == index).map(|(_, v)| *v);
            prop_assert_eq!(
                mixed.get_indexed_value(index).unwrap().as_number(),
                last.map(f64::from)
            );
        }
        for index in 0..64 {
            prop_assert_eq!(
                mixed.get_indexed_value(index).unwrap().as_number(),
                dense.get_indexed_value(index).unwrap().as_number()
            );
        }
    }

    #[test]
    fn test_delete_then_reinsert(indices in prop::collection::btree_set(0u32..30_000, 1..100)) {
        let mut array = ArrayObject::new(ObjectHandle(0), TransitionPolicy::default());
        for &i in &indices {
            array.set_own_indexed(i, Value::int32(i as i32), true).unwrap();
        }
        for &i in &indices {
            prop_assert!(array.delete_indexed(i, true).unwrap());
        }
        prop_assert!(array.elements().is_empty());
        for &i in indices.iter().rev() {
            array.set_own_indexed(i, Value::int32(-(i as i32)), true).unwrap();
        }
        let keys: Vec<u32> = indices.iter().copied().collect();
        prop_assert_eq!(array.indexed_keys(), keys);
    }
}
