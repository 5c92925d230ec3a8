//! # Otter VM Storage
//!
//! Indexed-property and binary-memory storage for the Otter VM.
//!
//! ## Design
//!
//! - **Element stores**: arrays keep their indexed properties in a dense slot
//!   vector or a sorted sparse list, switching between the two as the index
//!   distribution changes
//! - **Binary buffers**: `ArrayBuffer` bytes with a one-way detached state,
//!   viewed through typed arrays and DataViews
//! - **Explicit byte access**: every multi-byte element is assembled from
//!   bytes with an explicit width and byte order
//!
//! Everything here is single-threaded; views share buffers through `Rc`.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array;
pub mod array_buffer;
pub mod bytes;
pub mod config;
pub mod convert;
pub mod data_view;
pub mod elements;
pub mod error;
pub mod property;
pub mod protocol;
pub mod species;
pub mod typed_array;
pub mod value;

pub use array::{ArrayObject, ObjectTable};
pub use array_buffer::{BufferRef, JsArrayBuffer};
pub use bytes::Endianness;
pub use config::StorageConfig;
pub use data_view::JsDataView;
pub use elements::{ElementStore, TransitionPolicy};
pub use error::{StorageError, StorageResult};
pub use property::{PropertyDescriptor, PropertyKey, Slot};
pub use protocol::IndexedProperties;
pub use species::{IntrinsicSpecies, Species};
pub use typed_array::{JsTypedArray, TypedArrayKind};
pub use value::{ObjectHandle, Value};
