//! Trait abstraction for the durable storage network.
//!
//! Models the capability surface the pipeline consumes: build a data
//! transaction with a quoted fee, post it, fetch blobs back by pointer,
//! and query funding balances. Enables mock implementations for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One AR in winston (the network's smallest funding unit).
pub const WINSTON_PER_AR: u64 = 1_000_000_000_000;

/// Convert a winston amount to AR units for display.
pub fn winston_to_ar(winston: u64) -> f64 {
    winston as f64 / WINSTON_PER_AR as f64
}

/// Opaque identifier locating an uploaded blob on the storage network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentPointer(String);

impl ContentPointer {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name/value metadata tag attached to an upload transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An unsigned data transaction wrapping opaque envelope bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageTransaction {
    pub data: Vec<u8>,
    pub tags: Vec<Tag>,

    /// Address that signs and pays for the transaction.
    pub owner_address: String,

    /// Network-quoted fee for this data size, in winston.
    pub reward: u64,
}

/// A wallet-signed transaction ready to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: StorageTransaction,
    pub signature: Vec<u8>,

    /// Transaction id assigned at signing; becomes the content pointer
    /// once the network accepts the post.
    pub id: String,
}

/// Outcome of posting a signed transaction.
#[derive(Debug, Clone)]
pub struct PostReceipt {
    /// HTTP-style status from the network.
    pub status: u16,
    pub pointer: ContentPointer,
}

impl PostReceipt {
    pub fn accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage network errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("transaction build failed: {0}")]
    BuildFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("storage network rejected the transaction: status {status}")]
    Rejected { status: u16 },

    #[error("no blob at pointer {0}")]
    NotFound(ContentPointer),
}

/// Storage network capability consumed by the pipeline.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Quote a fee and wrap `data` plus `tags` as an unsigned transaction.
    async fn create_transaction(
        &self,
        data: Vec<u8>,
        tags: Vec<Tag>,
        owner_address: &str,
    ) -> StorageResult<StorageTransaction>;

    /// Submit a signed transaction.
    ///
    /// Transport failures are `Network` errors; a reachable network that
    /// declines the transaction is reported through the receipt status.
    async fn post(&self, signed: &SignedTransaction) -> StorageResult<PostReceipt>;

    /// Fetch raw blob bytes by content pointer.
    async fn fetch(&self, pointer: &ContentPointer) -> StorageResult<Vec<u8>>;

    /// Funding balance of `address` in winston.
    async fn balance(&self, address: &str) -> StorageResult<u64>;
}
