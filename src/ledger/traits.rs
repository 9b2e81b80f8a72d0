//! Trait abstraction for the anchor ledger program.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::ContentPointer;

/// Structured ledger entry binding an owner, a note id, and a content
/// pointer plus a permanence flag.
///
/// Invariant: `permanent == true` implies `content_pointer.is_some()`.
/// The inverse does not hold: a pointer may exist while the optional
/// permanence transaction is still pending or skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub owner_address: String,

    /// Caller-assigned, monotonic, unique per owner.
    pub note_id: u64,

    /// Set only after a successful upload.
    pub content_pointer: Option<ContentPointer>,

    /// Monotonic false → true, never reset.
    pub permanent: bool,

    /// Unix seconds at record creation.
    pub created_at: i64,
}

/// Owner filter for record enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub owner_address: String,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger program errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no anchor record for note {note_id}")]
    RecordNotFound { note_id: u64 },

    #[error("anchor record already exists for note {note_id}")]
    RecordExists { note_id: u64 },

    /// The note id does not match the record at the derived address.
    #[error("invalid note id")]
    InvalidNoteId,

    #[error("ledger network error: {0}")]
    Network(String),

    #[error("ledger transaction rejected: {0}")]
    Rejected(String),
}

/// Ledger program capability consumed by the pipeline.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Create the anchor record for a note with `permanent = false`.
    async fn create_record(
        &self,
        owner_address: &str,
        note_id: u64,
        content_pointer: Option<ContentPointer>,
        created_at: i64,
    ) -> LedgerResult<()>;

    /// Flip the permanence flag to true. Separately fee-bearing and
    /// optional; calling it on an already-permanent record succeeds.
    async fn set_permanent(&self, owner_address: &str, note_id: u64) -> LedgerResult<()>;

    /// Enumerate all anchor records owned by the filtered address.
    async fn query_records(&self, filter: &RecordFilter) -> LedgerResult<Vec<AnchorRecord>>;
}
