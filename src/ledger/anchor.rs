//! Record addressing and the two-phase anchor commit.
//!
//! Anchoring is two independent, separately fee-bearing ledger
//! transactions: create the record, then optionally mark it permanent.
//! Partial completion (created but never made permanent) is a valid,
//! queryable state, modeled by [`AnchorPhase`] rather than left implicit.

use sha2::{Digest, Sha256};
use tracing::info;

use super::traits::{LedgerClient, LedgerResult};
use crate::storage::ContentPointer;

/// Seed label for record addresses. Changing this orphans every
/// previously-anchored record.
const RECORD_SEED_LABEL: &[u8] = b"note";

/// Deterministic per-owner, per-note address of the record slot.
///
/// This addresses where the record lives on the ledger; it is not a
/// content pointer.
pub fn derive_record_address(owner_address: &str, note_id: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(RECORD_SEED_LABEL);
    hasher.update(owner_address.as_bytes());
    hasher.update(note_id.to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Commit state of an anchor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorPhase {
    /// Record exists with `permanent = false`.
    Created,
    /// The permanence transaction has been dispatched, not yet confirmed.
    PermanentRequested,
    /// `permanent = true` on the ledger. Terminal.
    Permanent,
}

impl AnchorPhase {
    /// Transition toward permanence. Already-permanent records stay put.
    pub fn request_permanent(self) -> Self {
        match self {
            Self::Created => Self::PermanentRequested,
            other => other,
        }
    }

    /// The permanence transaction was accepted.
    pub fn confirm_permanent(self) -> Self {
        Self::Permanent
    }

    pub fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// Create the anchor record for an uploaded note.
pub async fn anchor_note(
    ledger: &dyn LedgerClient,
    owner_address: &str,
    note_id: u64,
    content_pointer: ContentPointer,
    created_at: i64,
) -> LedgerResult<AnchorPhase> {
    ledger
        .create_record(owner_address, note_id, Some(content_pointer), created_at)
        .await?;
    info!(note_id, owner = %owner_address, "anchor record created");
    Ok(AnchorPhase::Created)
}

/// Flip an existing record's permanence flag.
///
/// Idempotent from the caller's perspective: re-invoking on an
/// already-permanent record returns `Permanent` without error.
pub async fn make_permanent(
    ledger: &dyn LedgerClient,
    owner_address: &str,
    note_id: u64,
) -> LedgerResult<AnchorPhase> {
    let phase = AnchorPhase::Created.request_permanent();
    ledger.set_permanent(owner_address, note_id).await?;
    info!(note_id, owner = %owner_address, "anchor record marked permanent");
    Ok(phase.confirm_permanent())
}
