//! Array objects and the table that owns them
//!
//! An [`ArrayObject`] routes indexed keys to its [`ElementStore`] and keeps
//! everything else (besides the virtual `length`) in an insertion-ordered map.
//! Stores only hold the owner's [`ObjectHandle`], never the object itself.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::config::StorageConfig;
use crate::convert::to_uint32;
use crate::elements::{ElementStore, Entries, TransitionPolicy};
use crate::error::{StorageError, StorageResult, reject_or_throw};
use crate::property::{PropertyDescriptor, PropertyKey, Slot, apply_descriptor};
use crate::protocol::IndexedProperties;
use crate::value::{ObjectHandle, Value};

/// A JavaScript Array
#[derive(Debug, Clone)]
pub struct ArrayObject {
    handle: ObjectHandle,
    elements: ElementStore,
    named: IndexMap<Rc<str>, Slot>,
    extensible: bool,
    policy: TransitionPolicy,
}

impl ArrayObject {
    /// Create an empty array
    pub fn new(handle: ObjectHandle, policy: TransitionPolicy) -> Self {
        Self {
            handle,
            elements: ElementStore::new(handle),
            named: IndexMap::new(),
            extensible: true,
            policy,
        }
    }

    /// Create an array holding `values` at indices `0..`
    pub fn from_values(
        handle: ObjectHandle,
        policy: TransitionPolicy,
        values: impl IntoIterator<Item = Value>,
    ) -> StorageResult<Self> {
        let mut array = Self::new(handle, policy);
        for value in values {
            array.push(value)?;
        }
        Ok(array)
    }

    /// Handle of this array in its object table
    pub fn handle(&self) -> ObjectHandle {
        self.handle
    }

    /// Backing element store
    pub fn elements(&self) -> &ElementStore {
        &self.elements
    }

    /// Array `length`
    pub fn length(&self) -> u32 {
        self.elements.length()
    }

    /// `[[IsExtensible]]`
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// `[[PreventExtensions]]`
    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }

    /// Property lookup by key, without walking any prototype.
    pub fn get(&self, key: &PropertyKey) -> Value {
        match key {
            PropertyKey::Index(i) => self.get_indexed_value(*i).unwrap_or_default(),
            PropertyKey::String(s) if &**s == "length" => Value::number(self.length() as f64),
            PropertyKey::String(s) => self
                .named
                .get(s)
                .and_then(|slot| slot.value().cloned())
                .unwrap_or_default(),
        }
    }

    /// Assignment by key.
    pub fn set(&mut self, key: &PropertyKey, value: Value, throw: bool) -> StorageResult<bool> {
        match key {
            PropertyKey::Index(i) => self.set_own_indexed(*i, value, throw),
            PropertyKey::String(s) if &**s == "length" => self.set_length_value(&value, throw),
            PropertyKey::String(s) => {
                let result = match self.named.get_mut(s) {
                    Some(slot) if !slot.is_writable() => Err(StorageError::not_writable(format!(
                        "Cannot assign to read only property '{s}' of object"
                    ))),
                    Some(Slot::Value(v)) => {
                        *v = value;
                        Ok(())
                    }
                    Some(Slot::Record(record)) => {
                        record.value = value;
                        Ok(())
                    }
                    None if !self.extensible => Err(StorageError::not_extensible(format!(
                        "Cannot add property {s}, object is not extensible"
                    ))),
                    None => {
                        self.named.insert(s.clone(), Slot::Value(value));
                        Ok(())
                    }
                };
                reject_or_throw(result, throw)
            }
        }
    }

    /// `[[DefineOwnProperty]]` by key.
    pub fn define(
        &mut self,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> StorageResult<bool> {
        match key {
            PropertyKey::Index(i) => self.define_indexed(*i, desc, throw),
            PropertyKey::String(s) if &**s == "length" => self.define_length(&desc, throw),
            PropertyKey::String(s) => {
                desc.validate()?;
                let next = match self.named.get(s) {
                    Some(current) => apply_descriptor(0, current, &desc).map_err(|_| {
                        StorageError::not_configurable(format!("Cannot redefine property: {s}"))
                    }),
                    None if !self.extensible => Err(StorageError::not_extensible(format!(
                        "Cannot define property {s}, object is not extensible"
                    ))),
                    None => Ok(Slot::from_record(desc.to_new_record())),
                };
                let result = next.map(|slot| {
                    self.named.insert(s.clone(), slot);
                });
                reject_or_throw(result, throw)
            }
        }
    }

    /// `[[Delete]]` by key.
    pub fn delete(&mut self, key: &PropertyKey, throw: bool) -> StorageResult<bool> {
        match key {
            PropertyKey::Index(i) => self.delete_indexed(*i, throw),
            PropertyKey::String(s) if &**s == "length" => reject_or_throw(
                Err(StorageError::not_configurable(
                    "Cannot delete property 'length' of [object Array]",
                )),
                throw,
            ),
            PropertyKey::String(s) => {
                let result = match self.named.get(s) {
                    Some(slot) if !slot.is_configurable() => Err(StorageError::not_configurable(
                        format!("Cannot delete property '{s}' of [object Array]"),
                    )),
                    Some(_) => {
                        self.named.shift_remove(s);
                        Ok(())
                    }
                    None => Ok(()),
                };
                reject_or_throw(result, throw)
            }
        }
    }

    /// Assignment to `length` from an arbitrary value (ArraySetLength).
    ///
    /// A length that is not a uint32 is always a `RangeError`, even for
    /// non-throwing callers.
    pub fn set_length_value(&mut self, value: &Value, throw: bool) -> StorageResult<bool> {
        let new_len = coerce_length(value)?;
        reject_or_throw(self.elements.set_length(new_len), throw)
    }

    /// Redefine `length` (value and/or writability).
    pub fn define_length(&mut self, desc: &PropertyDescriptor, throw: bool) -> StorageResult<bool> {
        desc.validate()?;
        let new_len = desc.value.as_ref().map(coerce_length).transpose()?;
        let result = self.apply_length_descriptor(desc, new_len);
        reject_or_throw(result, throw)
    }

    fn apply_length_descriptor(
        &mut self,
        desc: &PropertyDescriptor,
        new_len: Option<u32>,
    ) -> StorageResult<()> {
        let refuse = || Err(StorageError::not_configurable("Cannot redefine property: length"));
        if desc.configurable == Some(true) || desc.enumerable == Some(true) || desc.is_accessor() {
            return refuse();
        }
        if !self.elements.is_length_writable() && desc.writable == Some(true) {
            return refuse();
        }
        let shrink = match new_len {
            Some(len) => self.elements.set_length(len),
            None => Ok(()),
        };
        // The write-protect applies even when the shrink was blocked part way.
        if desc.writable == Some(false) {
            self.elements.set_length_writable(false);
        }
        shrink
    }

    /// `Array.prototype.push` for a single value
    pub fn push(&mut self, value: Value) -> StorageResult<u32> {
        let len = self.length();
        if len == u32::MAX {
            return Err(StorageError::invalid_length("Invalid array length"));
        }
        self.set_own_indexed(len, value, true)?;
        Ok(self.length())
    }

    /// `Array.prototype.pop`
    pub fn pop(&mut self) -> StorageResult<Value> {
        let len = self.length();
        if len == 0 {
            return Ok(Value::undefined());
        }
        let index = len - 1;
        let value = self.get_indexed_value(index)?;
        self.delete_indexed(index, true)?;
        self.set_length_value(&Value::number(index as f64), true)?;
        Ok(value)
    }

    /// `Object.seal`
    pub fn seal(&mut self) {
        self.restrict(false);
    }

    /// `Object.freeze`
    pub fn freeze(&mut self) {
        self.restrict(true);
    }

    fn restrict(&mut self, freeze: bool) {
        self.extensible = false;
        let indices: Vec<u32> = self.elements.indices().collect();
        for index in indices {
            self.elements.restrict(index, freeze);
        }
        for slot in self.named.values_mut() {
            let mut record = slot.to_record();
            record.flags.configurable = false;
            if freeze && !record.flags.accessor {
                record.flags.writable = false;
            }
            *slot = Slot::from_record(record);
        }
        if freeze {
            self.elements.set_length_writable(false);
        }
    }

    /// `Object.isFrozen`
    pub fn is_frozen(&self) -> bool {
        !self.extensible
            && !self.elements.is_length_writable()
            && self
                .elements
                .entries()
                .chain(self.named.values().map(|s| (0, s)))
                .all(|(_, s)| !s.is_configurable() && !s.is_writable())
    }

    /// Populated `(index, slot)` pairs, ascending
    pub fn entries(&self) -> Entries<'_> {
        self.elements.entries()
    }

    /// OrdinaryOwnPropertyKeys: indices ascending, then `length`, then named
    /// keys in insertion order. Lazily produced.
    pub fn own_keys(&self) -> impl Iterator<Item = PropertyKey> + '_ {
        self.elements
            .indices()
            .map(PropertyKey::Index)
            .chain(std::iter::once(PropertyKey::String(Rc::from("length"))))
            .chain(self.named.keys().map(|k| PropertyKey::String(k.clone())))
    }

    /// Enumerable own keys, in the same order as [`Self::own_keys`]
    pub fn enumerable_keys(&self) -> impl Iterator<Item = PropertyKey> + '_ {
        self.elements
            .entries()
            .filter(|(_, s)| s.flags().enumerable)
            .map(|(i, _)| PropertyKey::Index(i))
            .chain(
                self.named
                    .iter()
                    .filter(|(_, s)| s.flags().enumerable)
                    .map(|(k, _)| PropertyKey::String(k.clone())),
            )
    }
}

/// ToUint32(v) must equal ToNumber(v).
fn coerce_length(value: &Value) -> StorageResult<u32> {
    let number = value.to_number();
    let len = to_uint32(number);
    if len as f64 != number {
        return Err(StorageError::invalid_length("Invalid array length"));
    }
    Ok(len)
}

impl IndexedProperties for ArrayObject {
    fn get_own_indexed(&self, index: u32) -> StorageResult<Option<PropertyDescriptor>> {
        Ok(self.elements.get(index).map(Slot::to_descriptor))
    }

    fn set_own_indexed(&mut self, index: u32, value: Value, throw: bool) -> StorageResult<bool> {
        let result = match self.elements.get(index) {
            Some(slot) if slot.flags().accessor => Err(StorageError::not_writable(format!(
                "Cannot set property {index} of [object Array] which has only a getter"
            ))),
            Some(_) => self.elements.set(index, value, &self.policy),
            None if !self.extensible => Err(StorageError::not_extensible(format!(
                "Cannot add property {index}, object is not extensible"
            ))),
            None => self.elements.set(index, value, &self.policy),
        };
        reject_or_throw(result, throw)
    }

    fn define_indexed(
        &mut self,
        index: u32,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> StorageResult<bool> {
        let result = if !self.extensible && !self.elements.has(index) {
            Err(StorageError::not_extensible(format!(
                "Cannot define property {index}, object is not extensible"
            )))
        } else {
            self.elements.define(index, &desc, &self.policy)
        };
        reject_or_throw(result, throw)
    }

    fn delete_indexed(&mut self, index: u32, throw: bool) -> StorageResult<bool> {
        reject_or_throw(self.elements.delete(index), throw)
    }

    fn indexed_keys(&self) -> Vec<u32> {
        self.elements.indices().collect()
    }
}

/// Owner of every array, addressed by [`ObjectHandle`]
#[derive(Debug, Default)]
pub struct ObjectTable {
    config: StorageConfig,
    arrays: Vec<Option<ArrayObject>>,
}

impl ObjectTable {
    /// Create a table with the given configuration
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            arrays: Vec::new(),
        }
    }

    /// Configuration shared by every object in this table
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Allocate a new empty array
    pub fn create_array(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.arrays.len() as u32);
        self.arrays
            .push(Some(ArrayObject::new(handle, self.config.transition)));
        handle
    }

    /// Allocate an array holding `values`
    pub fn create_array_from(
        &mut self,
        values: impl IntoIterator<Item = Value>,
    ) -> StorageResult<ObjectHandle> {
        let handle = ObjectHandle(self.arrays.len() as u32);
        let array = ArrayObject::from_values(handle, self.config.transition, values)?;
        self.arrays.push(Some(array));
        Ok(handle)
    }

    /// Look up an array
    pub fn array(&self, handle: ObjectHandle) -> Option<&ArrayObject> {
        self.arrays.get(handle.index())?.as_ref()
    }

    /// Look up an array mutably
    pub fn array_mut(&mut self, handle: ObjectHandle) -> Option<&mut ArrayObject> {
        self.arrays.get_mut(handle.index())?.as_mut()
    }

    /// Drop an array; its handle is never reused.
    pub fn release(&mut self, handle: ObjectHandle) -> Option<ArrayObject> {
        self.arrays.get_mut(handle.index())?.take()
    }

    /// Number of live arrays
    pub fn len(&self) -> usize {
        self.arrays.iter().filter(|a| a.is_some()).count()
    }

    /// Whether no array is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
