//! Property keys, slots, and descriptors for indexed storage
//!
//! A [`Slot`] is what an element store keeps per index. Plain values are the
//! common case and are stored inline; anything with non-default attributes or
//! an accessor pair is boxed into a [`PropertyRecord`].

use std::rc::Rc;

use crate::error::{StorageError, StorageResult};
use crate::value::{Value, number_to_string, string_to_number};

/// Largest valid array index (2^32 - 2)
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// Property key as seen by indexed dispatch
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Canonical array index
    Index(u32),
    /// Any other string key, including non-canonical numerals like `"01"`
    String(Rc<str>),
}

impl PropertyKey {
    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Classify a string key.
    ///
    /// Only canonical numerals below 2^32 - 1 become indices; `"01"`, `"-1"`,
    /// `"1.0"` and `"4294967295"` stay named.
    pub fn from_string(s: &str) -> Self {
        match parse_array_index(s) {
            Some(i) => Self::Index(i),
            None => Self::String(Rc::from(s)),
        }
    }

    /// Get the index if this key is one
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            Self::String(_) => None,
        }
    }

    /// Get the string form of a named key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Index(_) => None,
            Self::String(s) => Some(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/// Parse a canonical array index.
pub fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n: u64 = s.parse().ok()?;
    if n > MAX_ARRAY_INDEX as u64 {
        return None;
    }
    Some(n as u32)
}

/// CanonicalNumericIndexString.
///
/// Returns the number a string denotes when `ToString(ToNumber(s)) == s`, or
/// `"-0"`. Typed arrays treat every such key as integer-indexed, valid or not.
pub fn canonical_numeric_index(s: &str) -> Option<f64> {
    if s == "-0" {
        return Some(-0.0);
    }
    let n = string_to_number(s);
    if number_to_string(n) == s { Some(n) } else { None }
}

/// Attribute bits of a property record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Value can be changed by assignment
    pub writable: bool,
    /// Shows up in enumeration
    pub enumerable: bool,
    /// Can be deleted or redefined
    pub configurable: bool,
    /// Getter/setter pair instead of a value
    pub accessor: bool,
}

impl PropertyFlags {
    /// Flags of a plain value slot
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
            accessor: false,
        }
    }

    /// Whether a plain value slot can stand in for these flags
    pub fn is_plain(&self) -> bool {
        *self == Self::data()
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::data()
    }
}

/// Full property record for slots with attributes or accessors
#[derive(Clone, Debug)]
pub struct PropertyRecord {
    /// Data value (undefined for accessors)
    pub value: Value,
    /// Getter, when `flags.accessor`
    pub getter: Option<Value>,
    /// Setter, when `flags.accessor`
    pub setter: Option<Value>,
    /// Attribute bits
    pub flags: PropertyFlags,
}

impl PropertyRecord {
    /// Data record with explicit attributes
    pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value,
            getter: None,
            setter: None,
            flags: PropertyFlags {
                writable,
                enumerable,
                configurable,
                accessor: false,
            },
        }
    }

    /// Accessor record
    pub fn accessor(
        getter: Option<Value>,
        setter: Option<Value>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value: Value::undefined(),
            getter,
            setter,
            flags: PropertyFlags {
                writable: false,
                enumerable,
                configurable,
                accessor: true,
            },
        }
    }
}

/// Content of one populated index
#[derive(Clone, Debug)]
pub enum Slot {
    /// Writable, enumerable, configurable data value
    Value(Value),
    /// Anything else
    Record(Box<PropertyRecord>),
}

impl Slot {
    /// Build the cheapest slot that represents `record`
    pub fn from_record(record: PropertyRecord) -> Self {
        if record.flags.is_plain() {
            Self::Value(record.value)
        } else {
            Self::Record(Box::new(record))
        }
    }

    /// Whether this slot carries a property record
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Attribute bits
    pub fn flags(&self) -> PropertyFlags {
        match self {
            Self::Value(_) => PropertyFlags::data(),
            Self::Record(r) => r.flags,
        }
    }

    /// Data value; `None` for accessors
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Record(r) if r.flags.accessor => None,
            Self::Record(r) => Some(&r.value),
        }
    }

    /// Whether delete / shrink may remove this slot
    pub fn is_configurable(&self) -> bool {
        self.flags().configurable
    }

    /// Whether plain assignment may replace the value
    pub fn is_writable(&self) -> bool {
        let flags = self.flags();
        !flags.accessor && flags.writable
    }

    /// Expand into a full record
    pub fn to_record(&self) -> PropertyRecord {
        match self {
            Self::Value(v) => PropertyRecord::data(v.clone(), true, true, true),
            Self::Record(r) => (**r).clone(),
        }
    }

    /// Complete descriptor for this slot
    pub fn to_descriptor(&self) -> PropertyDescriptor {
        let record = self.to_record();
        if record.flags.accessor {
            PropertyDescriptor {
                get: Some(record.getter.unwrap_or_default()),
                set: Some(record.setter.unwrap_or_default()),
                enumerable: Some(record.flags.enumerable),
                configurable: Some(record.flags.configurable),
                ..Default::default()
            }
        } else {
            PropertyDescriptor {
                value: Some(record.value),
                writable: Some(record.flags.writable),
                enumerable: Some(record.flags.enumerable),
                configurable: Some(record.flags.configurable),
                ..Default::default()
            }
        }
    }
}

/// Possibly-partial property descriptor
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]`; `undefined` means "no getter"
    pub get: Option<Value>,
    /// `[[Set]]`; `undefined` means "no setter"
    pub set: Option<Value>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Writable, enumerable, configurable data descriptor
    pub fn data(value: Value) -> Self {
        Self::data_with(value, true, true, true)
    }

    /// Data descriptor with explicit attributes
    pub fn data_with(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// Accessor descriptor
    pub fn accessor(get: Value, set: Value, enumerable: bool, configurable: bool) -> Self {
        Self {
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// IsAccessorDescriptor
    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsDataDescriptor
    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }

    /// Reject descriptors that mix data and accessor fields
    pub fn validate(&self) -> StorageResult<()> {
        if self.is_accessor() && self.is_data() {
            return Err(StorageError::InvalidDescriptor(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Record for a property that does not exist yet; absent fields default
    /// to `false` / `undefined`.
    pub fn to_new_record(&self) -> PropertyRecord {
        let enumerable = self.enumerable.unwrap_or(false);
        let configurable = self.configurable.unwrap_or(false);
        if self.is_accessor() {
            PropertyRecord::accessor(
                self.get.clone().filter(|g| !g.is_undefined()),
                self.set.clone().filter(|s| !s.is_undefined()),
                enumerable,
                configurable,
            )
        } else {
            PropertyRecord::data(
                self.value.clone().unwrap_or_default(),
                self.writable.unwrap_or(false),
                enumerable,
                configurable,
            )
        }
    }
}

fn same_optional(a: &Option<Value>, b: &Value) -> bool {
    a.as_ref().unwrap_or(&Value::Undefined).same_value(b)
}

/// ValidateAndApplyPropertyDescriptor for an existing slot.
///
/// Returns the replacement slot, or the reason the redefinition is refused.
/// `index` is only used for the error message.
pub fn apply_descriptor(index: u32, current: &Slot, desc: &PropertyDescriptor) -> StorageResult<Slot> {
    desc.validate()?;
    let record = current.to_record();
    let flags = record.flags;

    if !flags.configurable {
        let refuse = || {
            Err(StorageError::not_configurable(format!(
                "Cannot redefine property: {index}"
            )))
        };
        if desc.configurable == Some(true) {
            return refuse();
        }
        if desc.enumerable.is_some_and(|e| e != flags.enumerable) {
            return refuse();
        }
        if !desc.is_generic() && desc.is_accessor() != flags.accessor {
            return refuse();
        }
        if flags.accessor {
            let getter = record.getter.clone().unwrap_or_default();
            let setter = record.setter.clone().unwrap_or_default();
            if desc.get.as_ref().is_some_and(|g| !g.same_value(&getter))
                || desc.set.as_ref().is_some_and(|s| !s.same_value(&setter))
            {
                return refuse();
            }
        } else if !flags.writable {
            if desc.writable == Some(true) {
                return refuse();
            }
            if desc.value.is_some() && !same_optional(&desc.value, &record.value) {
                return refuse();
            }
        }
    }

    let enumerable = desc.enumerable.unwrap_or(flags.enumerable);
    let configurable = desc.configurable.unwrap_or(flags.configurable);

    let next = if desc.is_accessor() {
        let (getter, setter) = if flags.accessor {
            (record.getter, record.setter)
        } else {
            (None, None)
        };
        PropertyRecord::accessor(
            match &desc.get {
                Some(g) if g.is_undefined() => None,
                Some(g) => Some(g.clone()),
                None => getter,
            },
            match &desc.set {
                Some(s) if s.is_undefined() => None,
                Some(s) => Some(s.clone()),
                None => setter,
            },
            enumerable,
            configurable,
        )
    } else if desc.is_data() || !flags.accessor {
        // Switching accessor -> data resets the value and writability.
        let (value, writable) = if flags.accessor {
            (Value::undefined(), false)
        } else {
            (record.value, flags.writable)
        };
        PropertyRecord::data(
            desc.value.clone().unwrap_or(value),
            desc.writable.unwrap_or(writable),
            enumerable,
            configurable,
        )
    } else {
        PropertyRecord::accessor(record.getter, record.setter, enumerable, configurable)
    };

    Ok(Slot::from_record(next))
}
