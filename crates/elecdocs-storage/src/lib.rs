//! elecdocs storage library
//!
//! The [`Storage`] trait is the boundary to the object store that holds the
//! documents. It enumerates a folder, resolves time-bounded retrieval URLs,
//! reads object metadata, performs chunked uploads that report progress and
//! deletes objects. Implementations exist for S3-compatible stores and the
//! local filesystem.
//!
//! # Storage key format
//!
//! Every object lives directly inside its category folder: `{folder}/{file_name}`.
//! Keys must not contain `..` or a leading `/`. Key construction is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use elecdocs_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::{TokenError, UrlSigner};
pub use traits::{
    ByteStream, ObjectHandle, ObjectMetadata, ProgressSender, Storage, StorageError,
    StorageResult, TransferProgress,
};
