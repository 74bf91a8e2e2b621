//! prism-storage
//!
//! The key/value persistence capability injected into the session layer,
//! with in-memory, local-filesystem and S3 backends.

pub mod client;
pub mod error;
pub mod file;
pub mod json;
pub mod memory;
pub mod s3;
pub mod store;

pub use crate::error::StorageError;
pub use crate::file::FileStore;
pub use crate::memory::MemoryStore;
pub use crate::s3::S3Store;
pub use crate::store::{KeyValueStore, ObjectMeta};
