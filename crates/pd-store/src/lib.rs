//! pd-store: identifier-addressed image storage on local disk.
//!
//! Uploaded bytes are written to a flat directory under the name
//! `<8-hex-id><original-extension>`. Lookups go through an in-memory
//! identifier index rebuilt at startup, falling back to a directory scan so
//! that files placed in the directory by other means are still found.

mod store;

pub use store::{StoreOptions, StoredImage, UploadStore, TEMP_PREFIX};
