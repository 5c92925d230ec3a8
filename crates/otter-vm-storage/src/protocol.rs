//! Indexed-property entry points consumed by the object model.
//!
//! The generic property dispatch calls these for canonical array-index keys.
//! Accessor slots are reported through `get_own_indexed`; invoking the getter
//! or setter is the caller's job, so assigning through `set_own_indexed` to an
//! accessor slot is a rejection.

use crate::error::StorageResult;
use crate::property::PropertyDescriptor;
use crate::value::Value;

/// Own indexed properties of an array-like object
pub trait IndexedProperties {
    /// `[[GetOwnProperty]]` for an index
    fn get_own_indexed(&self, index: u32) -> StorageResult<Option<PropertyDescriptor>>;

    /// Assign to an own index; `Ok(false)` reports a silent rejection
    fn set_own_indexed(&mut self, index: u32, value: Value, throw: bool) -> StorageResult<bool>;

    /// `[[DefineOwnProperty]]` for an index
    fn define_indexed(
        &mut self,
        index: u32,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> StorageResult<bool>;

    /// `[[Delete]]` for an index
    fn delete_indexed(&mut self, index: u32, throw: bool) -> StorageResult<bool>;

    /// Own indices in ascending order
    fn indexed_keys(&self) -> Vec<u32>;

    /// Value at `index`, or `undefined` when absent or an accessor
    fn get_indexed_value(&self, index: u32) -> StorageResult<Value> {
        Ok(self
            .get_own_indexed(index)?
            .and_then(|d| d.value)
            .unwrap_or_default())
    }
}
