//! Durable storage network capability.
//!
//! The pipeline never talks to the network directly; it goes through the
//! [`StorageClient`] trait so tests can run against [`MockStorageNetwork`]
//! and production can plug in a gateway-backed client.

pub mod mock;
pub mod traits;

pub use mock::MockStorageNetwork;
pub use traits::{
    winston_to_ar, ContentPointer, PostReceipt, SignedTransaction, StorageClient, StorageError,
    StorageResult, StorageTransaction, Tag, WINSTON_PER_AR,
};
