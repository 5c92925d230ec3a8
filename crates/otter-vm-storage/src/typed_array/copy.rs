//! `%TypedArray%.prototype.set`
//!
//! Copying between two views of the same buffer must behave as if the source
//! had been read out completely before the first write. Bit-compatible kinds
//! get a single `memmove`. Otherwise each element is converted on its own and
//! the iteration order is chosen so that no write lands on source bytes that
//! have not been read yet.

use std::ops::Range;
use std::rc::Rc;

use super::JsTypedArray;
use super::kind::TypedArrayKind;
use crate::bytes::{Endianness, read_bits, write_bits};
use crate::error::{StorageError, StorageResult};
use crate::value::Value;

/// Geometry of one side of a copy, in bytes
#[derive(Debug, Clone, Copy)]
struct Side {
    start: usize,
    size: usize,
    kind: TypedArrayKind,
}

impl Side {
    fn of(view: &JsTypedArray, first: usize) -> Self {
        Self {
            start: view.byte_index(first),
            size: view.kind.element_size(),
            kind: view.kind,
        }
    }

    fn at(&self, k: usize) -> usize {
        self.start + k * self.size
    }
}

fn convert_one(src_data: &[u8], src: Side, dst_data: &mut [u8], dst: Side, k: usize) {
    let bits = read_bits(src_data, src.at(k), src.size, Endianness::Native);
    let value = src.kind.decode(bits);
    write_bits(dst_data, dst.at(k), dst.size, dst.kind.encode(value), Endianness::Native);
}

fn convert_in_place(data: &mut [u8], src: Side, dst: Side, k: usize) {
    let bits = read_bits(data, src.at(k), src.size, Endianness::Native);
    let value = src.kind.decode(bits);
    write_bits(data, dst.at(k), dst.size, dst.kind.encode(value), Endianness::Native);
}

/// First `k` in `0..n` for which `pred` holds, given `pred` is monotone
/// (false...false true...true).
fn first_where(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Split `0..count` into the part that must be copied back to front and the
/// part that must be copied front to back, for a same-buffer copy.
///
/// With `gap(k)` the distance from source element `k` to destination element
/// `k`, elements whose destination starts at or after their source (`gap >= 0`)
/// are safe when processed backward, all others when processed forward. `gap`
/// is monotone in `k`, so each part is a single range. The backward part is
/// copied first.
fn direction_split(src: Side, dst: Side, count: usize) -> (Range<usize>, Range<usize>) {
    let base = dst.start as i128 - src.start as i128;
    let step = dst.size as i128 - src.size as i128;
    let gap = |k: usize| base + k as i128 * step;
    if step > 0 {
        let c = first_where(count, |k| gap(k) >= 0);
        (c..count, 0..c)
    } else if step < 0 {
        let c = first_where(count, |k| gap(k) < 0);
        (0..c, c..count)
    } else if base >= 0 {
        (0..count, 0..0)
    } else {
        (0..0, 0..count)
    }
}

impl JsTypedArray {
    /// Store `values` starting at element `offset`.
    ///
    /// Each value is coerced before its write; writes that became invalid
    /// are skipped.
    pub fn set_from_values(&self, values: &[Value], offset: usize) -> StorageResult<()> {
        let target_len = self.validate()?;
        if offset
            .checked_add(values.len())
            .is_none_or(|end| end > target_len)
        {
            return Err(StorageError::invalid_index("offset is out of bounds"));
        }
        for (k, value) in values.iter().enumerate() {
            self.set_element((offset + k) as f64, value);
        }
        Ok(())
    }

    /// Copy every element of `source` into this view starting at `offset`.
    ///
    /// Behaves as if `source` were first copied to a temporary, even when both
    /// views alias the same bytes with different element widths.
    pub fn set_from_typed_array(&self, source: &JsTypedArray, offset: usize) -> StorageResult<()> {
        let target_len = self.validate()?;
        let count = source.validate()?;
        if offset.checked_add(count).is_none_or(|end| end > target_len) {
            return Err(StorageError::invalid_index("offset is out of bounds"));
        }
        if count == 0 {
            return Ok(());
        }

        let src = Side::of(source, 0);
        let dst = Side::of(self, offset);
        let bulk = self.kind.is_bit_compatible(source.kind);

        if Rc::ptr_eq(&self.buffer, &source.buffer) {
            return self.buffer.with_bytes_mut(|data| {
                if bulk {
                    data.copy_within(src.start..src.at(count), dst.start);
                    return;
                }
                let (backward, forward) = direction_split(src, dst, count);
                if !backward.is_empty() && !forward.is_empty() {
                    tracing::debug!(
                        backward = ?backward,
                        forward = ?forward,
                        "overlapping typed array copy split"
                    );
                }
                for k in backward.rev() {
                    convert_in_place(data, src, dst, k);
                }
                for k in forward {
                    convert_in_place(data, src, dst, k);
                }
            });
        }

        source.buffer.with_bytes(|src_data| {
            self.buffer.with_bytes_mut(|dst_data| {
                if bulk {
                    dst_data[dst.start..dst.at(count)]
                        .copy_from_slice(&src_data[src.start..src.at(count)]);
                } else {
                    for k in 0..count {
                        convert_one(src_data, src, dst_data, dst, k);
                    }
                }
            })
        })?
    }
}
