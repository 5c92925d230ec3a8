//! `%TypedArray%.prototype.sort`
//!
//! Without a comparator the elements are heap-sorted in place on their bit
//! patterns, so no value is ever materialized. With a comparator the values
//! are copied out first: the comparator is arbitrary code and may detach or
//! shrink the buffer, and the write-back then skips whatever became invalid.

use super::JsTypedArray;
use super::kind::TypedArrayKind;
use crate::bytes::{Endianness, read_bits, write_bits};
use crate::error::StorageResult;
use crate::value::Value;

/// Mutable element window over a buffer's bytes
struct Elements<'a> {
    data: &'a mut [u8],
    start: usize,
    size: usize,
    kind: TypedArrayKind,
}

impl Elements<'_> {
    fn bits(&self, i: usize) -> u64 {
        read_bits(self.data, self.start + i * self.size, self.size, Endianness::Native)
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.kind.compare_bits(self.bits(i), self.bits(j)).is_lt()
    }

    fn swap(&mut self, i: usize, j: usize) {
        let (a, b) = (self.bits(i), self.bits(j));
        write_bits(self.data, self.start + i * self.size, self.size, b, Endianness::Native);
        write_bits(self.data, self.start + j * self.size, self.size, a, Endianness::Native);
    }

    fn sift_down(&mut self, mut root: usize, end: usize) {
        loop {
            let mut child = 2 * root + 1;
            if child >= end {
                break;
            }
            if child + 1 < end && self.less(child, child + 1) {
                child += 1;
            }
            if !self.less(root, child) {
                break;
            }
            self.swap(root, child);
            root = child;
        }
    }

    fn heapsort(&mut self, len: usize) {
        for start in (0..len / 2).rev() {
            self.sift_down(start, len);
        }
        for end in (1..len).rev() {
            self.swap(0, end);
            self.sift_down(0, end);
        }
    }
}

/// Stable bottom-up merge sort that lets the comparator fail.
///
/// `compare(a, b) < 0` puts `a` first; NaN and zero keep the input order.
fn merge_sort<F>(mut items: Vec<Value>, compare: &mut F) -> StorageResult<Vec<Value>>
where
    F: FnMut(&Value, &Value) -> StorageResult<f64>,
{
    let len = items.len();
    let mut scratch = Vec::with_capacity(len);
    let mut width = 1;
    while width < len {
        scratch.clear();
        let mut lo = 0;
        while lo < len {
            let mid = (lo + width).min(len);
            let hi = (lo + 2 * width).min(len);
            let (mut i, mut j) = (lo, mid);
            while i < mid && j < hi {
                if compare(&items[j], &items[i])? < 0.0 {
                    scratch.push(items[j].clone());
                    j += 1;
                } else {
                    scratch.push(items[i].clone());
                    i += 1;
                }
            }
            scratch.extend_from_slice(&items[i..mid]);
            scratch.extend_from_slice(&items[j..hi]);
            lo = hi;
        }
        std::mem::swap(&mut items, &mut scratch);
        width *= 2;
    }
    Ok(items)
}

impl JsTypedArray {
    /// Numeric sort: NaN last, `-0` before `+0`
    pub fn sort(&self) -> StorageResult<()> {
        let len = self.validate()?;
        let (start, size, kind) = (self.byte_index(0), self.kind.element_size(), self.kind);
        self.buffer.with_bytes_mut(|data| {
            Elements {
                data,
                start,
                size,
                kind,
            }
            .heapsort(len)
        })
    }

    /// Sort with a caller comparator.
    ///
    /// A comparator error aborts the sort and leaves the elements untouched.
    pub fn sort_by<F>(&self, mut compare: F) -> StorageResult<()>
    where
        F: FnMut(&Value, &Value) -> StorageResult<f64>,
    {
        let len = self.validate()?;
        let values = (0..len).map(|k| self.get_element(k as f64)).collect();
        let sorted = merge_sort(values, &mut compare)?;
        for (k, value) in sorted.iter().enumerate() {
            self.set_element(k as f64, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::StorageError;

    fn floats(values: &[f64]) -> JsTypedArray {
        JsTypedArray::from_numbers(TypedArrayKind::Float64, values, &StorageConfig::default()).unwrap()
    }

    #[test]
    fn test_sort_integers() {
        let arr = JsTypedArray::from_numbers(
            TypedArrayKind::Int16,
            &[5.0, -3.0, 200.0, 0.0, -3.0, 7.0],
            &StorageConfig::default(),
        )
        .unwrap();
        arr.sort().unwrap();
        assert_eq!(arr.to_vec().unwrap(), vec![-3.0, -3.0, 0.0, 5.0, 7.0, 200.0]);
    }

    #[test]
    fn test_sort_floats_nan_and_zeros() {
        let arr = floats(&[f64::NAN, 1.0, -0.0, 0.0, -1.0]);
        arr.sort().unwrap();
        let out = arr.to_vec().unwrap();
        assert_eq!(out[0], -1.0);
        assert!(out[1] == 0.0 && out[1].is_sign_negative());
        assert!(out[2] == 0.0 && out[2].is_sign_positive());
        assert_eq!(out[3], 1.0);
        assert!(out[4].is_nan());
    }

    #[test]
    fn test_sort_by_descending() {
        let arr = floats(&[1.0, 3.0, 2.0]);
        arr.sort_by(|a, b| Ok(b.to_number() - a.to_number())).unwrap();
        assert_eq!(arr.to_vec().unwrap(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_sort_by_error_leaves_elements() {
        let arr = floats(&[2.0, 1.0]);
        let result = arr.sort_by(|_, _| Err(StorageError::not_writable("comparator threw")));
        assert!(result.is_err());
        assert_eq!(arr.to_vec().unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_sort_by_detach_in_comparator() {
        let arr = floats(&[3.0, 2.0, 1.0]);
        let buffer = arr.buffer().clone();
        arr.sort_by(|a, b| {
            buffer.detach();
            Ok(a.to_number() - b.to_number())
        })
        .unwrap();
        assert!(arr.is_detached());
        assert_eq!(arr.length(), 0);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items = vec![Value::int32(2), Value::string("a"), Value::int32(1), Value::string("b")];
        // Strings compare equal to everything.
        let sorted = merge_sort(items, &mut |a: &Value, b: &Value| match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Ok(x - y),
            _ => Ok(0.0),
        })
        .unwrap();
        let strings: Vec<&str> = sorted.iter().filter_map(Value::as_str).collect();
        assert_eq!(strings, vec!["a", "b"]);
    }
}
