//! Retrieval reconciliation: ledger records back into a note list.
//!
//! Partial-success policy: one unreadable record must never cost the
//! user the rest of the list. Every per-record failure (fetch error,
//! truncated envelope, decompression or authentication failure, parse
//! error) is logged, recorded as a skip, and the walk continues. Only a
//! failure to enumerate the records at all aborts the batch.

use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::{Envelope, KeyMaterial};
use crate::ledger::{AnchorRecord, LedgerClient, LedgerError, RecordFilter};
use crate::note::PlaintextNote;
use crate::storage::{ContentPointer, StorageClient};
use crate::wallet::WalletError;

/// A reconstructed note plus the ledger state it came from.
#[derive(Debug, Clone)]
pub struct LoadedNote {
    pub note_id: u64,
    pub note: PlaintextNote,
    pub pointer: Option<ContentPointer>,
    pub permanent: bool,
}

/// Where reconstruction of one record gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    Fetch,
    Envelope,
    Decrypt,
    Parse,
}

impl std::fmt::Display for SkipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Envelope => "envelope",
            Self::Decrypt => "decrypt",
            Self::Parse => "parse",
        };
        write!(f, "{}", name)
    }
}

/// One record that could not be reconstructed.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub note_id: u64,
    pub pointer: Option<ContentPointer>,
    pub stage: SkipStage,
    pub reason: String,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct NoteBatch {
    /// Successfully reconstructed notes, ordered by note id.
    pub notes: Vec<LoadedNote>,
    /// Records skipped under the partial-success policy.
    pub skipped: Vec<SkippedRecord>,
}

/// Retrieval failures that abort the whole batch.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("anchor record query failed: {0}")]
    Query(#[from] LedgerError),
}

/// Reconstruct every readable note owned by `owner_address`.
pub async fn load_notes(
    storage: &dyn StorageClient,
    ledger: &dyn LedgerClient,
    key: &KeyMaterial,
    owner_address: &str,
) -> Result<NoteBatch, RetrieveError> {
    let mut records = ledger
        .query_records(&RecordFilter {
            owner_address: owner_address.to_string(),
        })
        .await?;
    records.sort_by_key(|record| record.note_id);

    let outcomes =
        futures::future::join_all(records.iter().map(|record| reconstruct(storage, key, record)))
            .await;

    let mut notes = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(note) => notes.push(note),
            Err(skip) => {
                warn!(
                    note_id = skip.note_id,
                    stage = %skip.stage,
                    reason = %skip.reason,
                    "skipping unreadable anchor record"
                );
                skipped.push(skip);
            }
        }
    }

    info!(
        owner = %owner_address,
        loaded = notes.len(),
        skipped = skipped.len(),
        "note list reconstructed"
    );
    Ok(NoteBatch { notes, skipped })
}

async fn reconstruct(
    storage: &dyn StorageClient,
    key: &KeyMaterial,
    record: &AnchorRecord,
) -> Result<LoadedNote, SkippedRecord> {
    let skip = |stage: SkipStage, reason: String| SkippedRecord {
        note_id: record.note_id,
        pointer: record.content_pointer.clone(),
        stage,
        reason,
    };

    // A record without a pointer still renders as an entry.
    let Some(pointer) = &record.content_pointer else {
        return Ok(LoadedNote {
            note_id: record.note_id,
            note: PlaintextNote::placeholder(record.note_id),
            pointer: None,
            permanent: record.permanent,
        });
    };

    let bytes = storage
        .fetch(pointer)
        .await
        .map_err(|e| skip(SkipStage::Fetch, e.to_string()))?;

    let envelope =
        Envelope::from_bytes(&bytes).map_err(|e| skip(SkipStage::Envelope, e.to_string()))?;

    let plaintext = envelope
        .open(key)
        .map_err(|e| skip(SkipStage::Decrypt, e.to_string()))?;

    let json = String::from_utf8(plaintext)
        .map_err(|e| skip(SkipStage::Parse, e.to_string()))?;
    let note = PlaintextNote::from_wire_json(&json)
        .map_err(|e| skip(SkipStage::Parse, e.to_string()))?;

    Ok(LoadedNote {
        note_id: record.note_id,
        note,
        pointer: Some(pointer.clone()),
        permanent: record.permanent,
    })
}
