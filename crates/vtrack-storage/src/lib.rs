//! Blob storage for source videos and subject crops.
//!
//! This crate provides:
//! - The `BlobStore` abstraction (upload, download, connectivity check)
//! - An S3-compatible client (R2, GCS interoperability, MinIO)
//! - An in-memory store for tests (`test-util` feature)

pub mod client;
pub mod error;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use client::{S3BlobStore, S3Config};
pub use error::{StorageError, StorageResult};
pub use store::BlobStore;

#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryBlobStore, StoredObject};
