//! Storage error types

use thiserror::Error;

/// Failures raised by indexed-property stores and binary views.
///
/// Every variant is recoverable: the calling layer decides whether to turn it
/// into a visible exception or to report a silent `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Length violated a non-writable length or is not representable
    #[error("RangeError: {0}")]
    InvalidLength(String),

    /// Index outside of the declared bounds, or negative where disallowed
    #[error("RangeError: {0}")]
    InvalidIndex(String),

    /// Access through a detached buffer
    #[error("TypeError: {0}")]
    DetachedBuffer(String),

    /// New indexed property on a non-extensible object
    #[error("TypeError: {0}")]
    NotExtensible(String),

    /// Delete or redefinition of a non-configurable slot
    #[error("TypeError: {0}")]
    NotConfigurable(String),

    /// Assignment to a read-only slot
    #[error("TypeError: {0}")]
    NotWritable(String),

    /// A species constructor returned an unusable object
    #[error("TypeError: {0}")]
    InvalidSpecies(String),

    /// Descriptor mixing accessor and data fields
    #[error("TypeError: {0}")]
    InvalidDescriptor(String),

    /// The allocator refused a buffer allocation
    #[error("RangeError: Array buffer allocation failed ({0} bytes)")]
    OutOfMemory(usize),

    /// Configuration document could not be parsed
    #[error("Invalid storage config: {0}")]
    InvalidConfig(String),
}

impl StorageError {
    /// Create an invalid-length error
    pub fn invalid_length(msg: impl Into<String>) -> Self {
        Self::InvalidLength(msg.into())
    }

    /// Create an invalid-index error
    pub fn invalid_index(msg: impl Into<String>) -> Self {
        Self::InvalidIndex(msg.into())
    }

    /// Create a detached-buffer error
    pub fn detached(msg: impl Into<String>) -> Self {
        Self::DetachedBuffer(msg.into())
    }

    /// Create a not-extensible error
    pub fn not_extensible(msg: impl Into<String>) -> Self {
        Self::NotExtensible(msg.into())
    }

    /// Create a not-configurable error
    pub fn not_configurable(msg: impl Into<String>) -> Self {
        Self::NotConfigurable(msg.into())
    }

    /// Create a not-writable error
    pub fn not_writable(msg: impl Into<String>) -> Self {
        Self::NotWritable(msg.into())
    }

    /// The JS error constructor this failure maps to.
    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidLength(_) | Self::InvalidIndex(_) | Self::OutOfMemory(_) => "RangeError",
            Self::DetachedBuffer(_)
            | Self::NotExtensible(_)
            | Self::NotConfigurable(_)
            | Self::NotWritable(_)
            | Self::InvalidSpecies(_)
            | Self::InvalidDescriptor(_) => "TypeError",
            Self::InvalidConfig(_) => "Error",
        }
    }

    /// Whether a non-throwing caller may swallow this failure as `false`.
    ///
    /// Detached buffers and coercion failures always propagate.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidLength(_)
                | Self::NotExtensible(_)
                | Self::NotConfigurable(_)
                | Self::NotWritable(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Map a store-level outcome onto the caller's throwing mode.
///
/// `Ok(())` becomes `Ok(true)`. A rejection becomes `Ok(false)` when `throw` is
/// off, and every other error is returned unchanged.
pub fn reject_or_throw(result: StorageResult<()>, throw: bool) -> StorageResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if !throw && err.is_rejection() => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_class() {
        let err = StorageError::detached("ArrayBuffer is detached");
        assert_eq!(err.to_string(), "TypeError: ArrayBuffer is detached");
        assert_eq!(err.class(), "TypeError");
        assert_eq!(StorageError::OutOfMemory(8).class(), "RangeError");
    }

    #[test]
    fn test_reject_or_throw() {
        let rejected = Err(StorageError::not_configurable("x"));
        assert_eq!(reject_or_throw(rejected.clone(), false), Ok(false));
        assert!(reject_or_throw(rejected, true).is_err());

        let detached = Err(StorageError::detached("x"));
        assert!(reject_or_throw(detached, false).is_err());
        let malformed = Err(StorageError::InvalidDescriptor("x".to_string()));
        assert!(reject_or_throw(malformed, false).is_err());
        assert_eq!(reject_or_throw(Ok(()), true), Ok(true));
    }
}
