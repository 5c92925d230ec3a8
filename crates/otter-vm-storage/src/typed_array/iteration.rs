//! Element-range operations of `%TypedArray%.prototype`
//!
//! Operations that call back into caller code (`for_each`, `map`, `filter`)
//! read every element through [`JsTypedArray::get_element`], which rechecks
//! the buffer each time. An element that stopped existing reads as
//! `undefined`, and a write to it is dropped.

use std::rc::Rc;

use super::JsTypedArray;
use crate::bytes::{Endianness, read_bits, write_bits};
use crate::convert::{relative_bound, to_integer_or_infinity};
use crate::error::StorageResult;
use crate::species::{Species, typed_array_species_create};
use crate::value::Value;

impl JsTypedArray {
    /// Store `value` at every index of `start..end`
    pub fn fill(&self, value: &Value, start: Option<&Value>, end: Option<&Value>) -> StorageResult<()> {
        let len = self.validate()?;
        let bits = self.kind.encode(value.to_number());
        let first = relative_bound(start, len, 0);
        let last = relative_bound(end, len, len);

        // Coercion may have shrunk the buffer.
        let last = last.min(self.validate()?);
        if first >= last {
            return Ok(());
        }
        let size = self.kind.element_size();
        let base = self.byte_index(0);
        self.buffer.with_bytes_mut(|data| {
            for k in first..last {
                write_bits(data, base + k * size, size, bits, Endianness::Native);
            }
        })
    }

    /// Copy `start..end` to `target` within this view, as `memmove`
    pub fn copy_within(&self, target: &Value, start: &Value, end: Option<&Value>) -> StorageResult<()> {
        let len = self.validate()?;
        let to = relative_bound(Some(target), len, 0);
        let from = relative_bound(Some(start), len, 0);
        let last = relative_bound(end, len, len);
        let count = last.saturating_sub(from).min(len - to);
        if count == 0 {
            return Ok(());
        }

        let len = self.validate()?;
        let count = count
            .min(len.saturating_sub(from))
            .min(len.saturating_sub(to));
        let size = self.kind.element_size();
        let (from, to) = (self.byte_index(from), self.byte_index(to));
        self.buffer
            .with_bytes_mut(|data| data.copy_within(from..from + count * size, to))
    }

    /// Reverse the elements in place
    pub fn reverse(&self) -> StorageResult<()> {
        let len = self.validate()?;
        let size = self.kind.element_size();
        let start = self.byte_index(0);
        self.buffer.with_bytes_mut(|data| {
            let region = &mut data[start..start + len * size];
            region.reverse();
            for element in region.chunks_exact_mut(size) {
                element.reverse();
            }
        })
    }

    fn scan<P>(&self, indices: impl Iterator<Item = usize>, mut matches: P) -> Option<usize>
    where
        P: FnMut(f64) -> bool,
    {
        let live = self.length();
        let size = self.kind.element_size();
        let base = self.byte_index(0);
        let kind = self.kind;
        self.buffer
            .with_bytes(|data| {
                indices
                    .take_while(|&k| k < live)
                    .find(|&k| matches(kind.decode(read_bits(data, base + k * size, size, Endianness::Native))))
            })
            .ok()
            .flatten()
    }

    /// First index holding a value strictly equal to `search`
    pub fn index_of(&self, search: &Value, from: Option<&Value>) -> StorageResult<Option<usize>> {
        let len = self.validate()?;
        if len == 0 || !self.type_match(search) {
            return Ok(None);
        }
        let first = relative_bound(from, len, 0);
        let Some(n) = search.as_number() else {
            return Ok(None);
        };
        Ok(self.scan(first..len, |v| v == n))
    }

    /// Last index holding a value strictly equal to `search`
    pub fn last_index_of(&self, search: &Value, from: Option<&Value>) -> StorageResult<Option<usize>> {
        let len = self.validate()?;
        if len == 0 || !self.type_match(search) {
            return Ok(None);
        }
        let start = match from {
            None => len - 1,
            Some(v) => {
                let n = to_integer_or_infinity(v);
                if n == f64::NEG_INFINITY {
                    return Ok(None);
                }
                if n >= 0.0 {
                    n.min((len - 1) as f64) as usize
                } else if len as f64 + n < 0.0 {
                    return Ok(None);
                } else {
                    (len as f64 + n) as usize
                }
            }
        };
        let Some(n) = search.as_number() else {
            return Ok(None);
        };
        // Indices past the live length are skipped, not fatal.
        let live = self.length();
        if live == 0 {
            return Ok(None);
        }
        let top = start.min(live - 1);
        Ok(self.scan((0..=top).rev(), |v| v == n))
    }

    /// Whether some element is SameValueZero to `search`
    pub fn includes(&self, search: &Value, from: Option<&Value>) -> StorageResult<bool> {
        let len = self.validate()?;
        if len == 0 || !self.type_match(search) {
            return Ok(false);
        }
        let first = relative_bound(from, len, 0);
        let Some(n) = search.as_number() else {
            return Ok(false);
        };
        Ok(self.scan(first..len, |v| v == n || (v.is_nan() && n.is_nan())).is_some())
    }

    /// Call `f(value, index)` for every index present at the start
    pub fn for_each<F>(&self, mut f: F) -> StorageResult<()>
    where
        F: FnMut(Value, usize) -> StorageResult<()>,
    {
        let len = self.validate()?;
        for k in 0..len {
            f(self.get_element(k as f64), k)?;
        }
        Ok(())
    }

    /// New typed array of `f(value, index)` for every element
    pub fn map<S, F>(&self, species: &S, mut f: F) -> StorageResult<JsTypedArray>
    where
        S: Species + ?Sized,
        F: FnMut(Value, usize) -> StorageResult<Value>,
    {
        let len = self.validate()?;
        let result = typed_array_species_create(species, self.kind, len)?;
        for k in 0..len {
            let mapped = f(self.get_element(k as f64), k)?;
            result.set_element(k as f64, &mapped);
        }
        Ok(result)
    }

    /// New typed array of the elements `predicate` keeps
    pub fn filter<S, F>(&self, species: &S, mut predicate: F) -> StorageResult<JsTypedArray>
    where
        S: Species + ?Sized,
        F: FnMut(&Value, usize) -> StorageResult<bool>,
    {
        let len = self.validate()?;
        let mut kept = Vec::new();
        for k in 0..len {
            let value = self.get_element(k as f64);
            if predicate(&value, k)? {
                kept.push(value);
            }
        }
        let result = typed_array_species_create(species, self.kind, kept.len())?;
        for (n, value) in kept.iter().enumerate() {
            result.set_element(n as f64, value);
        }
        Ok(result)
    }

    /// New view of `begin..end` over the same buffer.
    ///
    /// A length-tracking view with no `end` yields a length-tracking view.
    pub fn subarray(&self, begin: &Value, end: Option<&Value>) -> StorageResult<JsTypedArray> {
        let src_len = self.length();
        let first = relative_bound(Some(begin), src_len, 0);
        let length = match end {
            None | Some(Value::Undefined) if self.is_length_tracking() => None,
            _ => Some(relative_bound(end, src_len, src_len).saturating_sub(first)),
        };
        let byte_offset = (self.element_offset + first) * self.kind.element_size();
        JsTypedArray::new(self.buffer.clone(), self.kind, byte_offset, length)
    }

    /// New typed array holding a copy of `start..end`
    pub fn slice<S: Species + ?Sized>(
        &self,
        species: &S,
        start: &Value,
        end: Option<&Value>,
    ) -> StorageResult<JsTypedArray> {
        let len = self.validate()?;
        let first = relative_bound(Some(start), len, 0);
        let last = relative_bound(end, len, len);
        let count = last.saturating_sub(first);
        let result = typed_array_species_create(species, self.kind, count)?;
        if count == 0 {
            return Ok(result);
        }

        // The species constructor may have detached or shrunk this view.
        let live = self.validate()?;
        let first = first.min(live);
        let last = last.min(live).max(first);
        if result.kind == self.kind {
            let (from, to) = (self.byte_index(first), self.byte_index(last));
            let bytes = self.buffer.with_bytes(|data| data[from..to].to_vec())?;
            let target = result.byte_index(0);
            if Rc::ptr_eq(&self.buffer, &result.buffer) {
                result.buffer.with_bytes_mut(|data| {
                    data[target..target + bytes.len()].copy_from_slice(&bytes)
                })?;
            } else {
                result.buffer.write_bytes(target, &bytes)?;
            }
        } else {
            for (n, k) in (first..last).enumerate() {
                result.set_element(n as f64, &self.get_element(k as f64));
            }
        }
        Ok(result)
    }
}
