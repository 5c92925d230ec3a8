//! Typed array views over shared, detachable and resizable buffers

use std::rc::Rc;

use otter_vm_storage::{
    IndexedProperties, IntrinsicSpecies, JsArrayBuffer, JsTypedArray, PropertyKey,
    StorageConfig, StorageError, TypedArrayKind, Value,
};

fn buffer(len: usize) -> Rc<JsArrayBuffer> {
    Rc::new(JsArrayBuffer::new(len))
}

#[test]
fn test_detach_hides_written_bits() {
    let buf = buffer(16);
    let view = JsTypedArray::new(buf.clone(), TypedArrayKind::Uint32, 0, Some(4)).unwrap();
    view.set(0, 4294967295.0).unwrap();
    assert_eq!(view.get(0).unwrap(), 4294967295.0);

    assert!(buf.detach());
    assert!(matches!(view.get(0), Err(StorageError::DetachedBuffer(_))));
    assert!(view.get_element(0.0).is_undefined());
    assert_eq!(view.length(), 0);
    assert_eq!(view.byte_length(), 0);
    assert!(view.get_own_indexed(0).unwrap().is_none());
    assert!(!buf.detach());
}

#[test]
fn test_sort_float_special_values() {
    let view = JsTypedArray::from_numbers(
        TypedArrayKind::Float32,
        &[f64::NAN, 1.0, -0.0, 0.0, -1.0],
        &StorageConfig::default(),
    )
    .unwrap();
    view.sort().unwrap();
    let out = view.to_vec().unwrap();
    assert_eq!(out[0], -1.0);
    assert!(out[1] == 0.0 && out[1].is_sign_negative());
    assert!(out[2] == 0.0 && out[2].is_sign_positive());
    assert_eq!(out[3], 1.0);
    assert!(out[4].is_nan());
}

#[test]
fn test_aliased_views_share_bytes() {
    let buf = buffer(8);
    let bytes = JsTypedArray::new(buf.clone(), TypedArrayKind::Uint8, 0, None).unwrap();
    let words = JsTypedArray::new(buf.clone(), TypedArrayKind::Uint16, 2, Some(2)).unwrap();
    words.set(0, 0x0102 as f64).unwrap();
    let expected = if cfg!(target_endian = "little") {
        [2.0, 1.0]
    } else {
        [1.0, 2.0]
    };
    assert_eq!(bytes.get(2).unwrap(), expected[0]);
    assert_eq!(bytes.get(3).unwrap(), expected[1]);
    assert_eq!(words.byte_offset(), 2);
}

#[test]
fn test_element_coercion() {
    let config = StorageConfig::default();
    let clamped = JsTypedArray::with_length(TypedArrayKind::Uint8Clamped, 3, &config).unwrap();
    clamped.set_element(0.0, &Value::number(300.0));
    clamped.set_element(1.0, &Value::number(-5.0));
    clamped.set_element(2.0, &Value::number(2.5));
    assert_eq!(clamped.to_vec().unwrap(), vec![255.0, 0.0, 2.0]);

    let signed = JsTypedArray::with_length(TypedArrayKind::Int8, 2, &config).unwrap();
    signed.set_element(0.0, &Value::number(200.0));
    signed.set_element(1.0, &Value::string("-129"));
    assert_eq!(signed.to_vec().unwrap(), vec![-56.0, 127.0]);
}

#[test]
fn test_numeric_string_keys() {
    let view = JsTypedArray::from_numbers(TypedArrayKind::Int16, &[1.0, 2.0], &StorageConfig::default())
        .unwrap();
    assert_eq!(view.get_by_key(&PropertyKey::from("1")).unwrap().as_number(), Some(2.0));
    assert!(view.get_by_key(&PropertyKey::from("-0")).unwrap().is_undefined());
    assert!(view.get_by_key(&PropertyKey::from("1.5")).unwrap().is_undefined());
    assert!(view.get_by_key(&PropertyKey::from("01")).is_none());
    assert!(view.get_by_key(&PropertyKey::from("foo")).is_none());

    // Out-of-range numeric keys are swallowed, never created.
    assert!(view.set_by_key(&PropertyKey::from("7"), &Value::int32(9)));
    assert_eq!(view.to_vec().unwrap(), vec![1.0, 2.0]);
}

#[test]
fn test_length_tracking_on_resizable_buffer() {
    let config = StorageConfig::default();
    let buf = Rc::new(JsArrayBuffer::allocate_resizable(8, 64, &config).unwrap());
    let tracking = JsTypedArray::new(buf.clone(), TypedArrayKind::Uint32, 4, None).unwrap();
    let fixed = JsTypedArray::new(buf.clone(), TypedArrayKind::Uint8, 0, Some(8)).unwrap();
    assert!(tracking.is_length_tracking());
    assert_eq!(tracking.length(), 1);

    buf.resize(20).unwrap();
    assert_eq!(tracking.length(), 4);
    assert_eq!(fixed.length(), 8);

    buf.resize(6).unwrap();
    assert_eq!(tracking.length(), 0);
    assert!(fixed.is_out_of_bounds());
    assert!(matches!(fixed.validate(), Err(StorageError::DetachedBuffer(_))));

    buf.resize(2).unwrap();
    assert!(tracking.is_out_of_bounds());
}

#[test]
fn test_construction_errors() {
    let buf = buffer(10);
    assert!(matches!(
        JsTypedArray::new(buf.clone(), TypedArrayKind::Int32, 2, None),
        Err(StorageError::InvalidLength(_))
    ));
    assert!(matches!(
        JsTypedArray::new(buf.clone(), TypedArrayKind::Int16, 0, None),
        Ok(view) if view.length() == 5
    ));
    assert!(matches!(
        JsTypedArray::new(buf.clone(), TypedArrayKind::Int32, 0, None),
        Err(StorageError::InvalidLength(_))
    ));
    assert!(matches!(
        JsTypedArray::new(buf.clone(), TypedArrayKind::Uint8, 12, None),
        Err(StorageError::InvalidIndex(_))
    ));
    buf.detach();
    assert!(matches!(
        JsTypedArray::new(buf, TypedArrayKind::Uint8, 0, None),
        Err(StorageError::DetachedBuffer(_))
    ));
}

#[test]
fn test_derived_arrays() {
    let species = IntrinsicSpecies::default();
    let view = JsTypedArray::from_numbers(
        TypedArrayKind::Int32,
        &[5.0, 6.0, 7.0, 8.0],
        &StorageConfig::default(),
    )
    .unwrap();

    let doubled = view.map(&species, |v, _| Ok(Value::number(v.to_number() * 2.0))).unwrap();
    assert_eq!(doubled.to_vec().unwrap(), vec![10.0, 12.0, 14.0, 16.0]);

    let even = view
        .filter(&species, |v, _| Ok(v.to_number() as i64 % 2 == 0))
        .unwrap();
    assert_eq!(even.to_vec().unwrap(), vec![6.0, 8.0]);

    let sub = view.subarray(&Value::int32(1), Some(&Value::int32(-1))).unwrap();
    assert!(Rc::ptr_eq(sub.buffer(), view.buffer()));
    assert_eq!(sub.to_vec().unwrap(), vec![6.0, 7.0]);

    let copy = view.slice(&species, &Value::int32(2), None).unwrap();
    assert!(!Rc::ptr_eq(copy.buffer(), view.buffer()));
    assert_eq!(copy.to_vec().unwrap(), vec![7.0, 8.0]);
}

#[test]
fn test_search_with_nan() {
    let view = JsTypedArray::from_numbers(
        TypedArrayKind::Float64,
        &[1.0, f64::NAN, -0.0],
        &StorageConfig::default(),
    )
    .unwrap();
    assert_eq!(view.index_of(&Value::number(f64::NAN), None).unwrap(), None);
    assert!(view.includes(&Value::number(f64::NAN), None).unwrap());
    assert_eq!(view.index_of(&Value::number(0.0), None).unwrap(), Some(2));
    assert_eq!(view.last_index_of(&Value::string("1"), None).unwrap(), None);
}
