//! Storage upload state machine.
//!
//! `Idle → CheckWallet → (Connect if ungranted) → BuildTransaction →
//! FundingGuard → Sign → Post → {Done | Failed}`
//!
//! Each stage boundary catches the raw capability error and reclassifies
//! it into the [`UploadError`] taxonomy, so callers can tell a fatal
//! condition (wallet missing) from a recoverable one (user cancelled the
//! signing prompt). A `TransactionBuildFailure` is fatal for the attempt:
//! the whole flow restarts from BuildTransaction, never mid-object.
//! After a successful post the anchor record is created; if that single
//! step fails the upload is still reported as partial success with
//! `anchored = false`, because the content is already durable.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::funding::BalanceGuard;
use super::retry::retry_with_backoff;
use super::PipelineConfig;
use crate::crypto::{Envelope, EnvelopeError};
use crate::ledger::{anchor_note, derive_record_address, LedgerClient, LedgerError};
use crate::note::PlaintextNote;
use crate::storage::{ContentPointer, StorageClient, StorageError};
use crate::wallet::{ensure_session, WalletClient, WalletError, UPLOAD_SCOPES};

/// Stages of the upload flow, for logging and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    CheckWallet,
    Connect,
    BuildTransaction,
    FundingGuard,
    Sign,
    Post,
    Anchor,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckWallet => "check-wallet",
            Self::Connect => "connect",
            Self::BuildTransaction => "build-transaction",
            Self::FundingGuard => "funding-guard",
            Self::Sign => "sign",
            Self::Post => "post",
            Self::Anchor => "anchor",
        };
        write!(f, "{}", name)
    }
}

/// Upload failure taxonomy.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Fatal: no wallet capability on this platform. The caller should
    /// point the user at a wallet install guide.
    #[error("wallet capability unavailable — install a wallet to enable permanent storage")]
    WalletUnavailable,

    /// Recoverable: the user declined the permission prompt. Re-prompt.
    #[error("wallet permissions declined — permanent storage needs address, public key, signing and network access")]
    PermissionDenied,

    /// Recoverable: the user cancelled the signing prompt. Re-prompt.
    #[error("signing request cancelled")]
    UserCancelled,

    /// Fatal for this attempt; retry the whole flow from BuildTransaction.
    #[error("transaction build failed: {0}")]
    TransactionBuildFailure(String),

    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// The bounded post retry budget is spent.
    #[error("posting to the storage network failed after {attempts} attempts: {reason}")]
    NetworkPostFailure { attempts: u32, reason: String },

    /// Blocks the post until the address is funded.
    #[error("insufficient funds: balance {balance} winston, upload needs {required} winston — fund the address and retry")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("note serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<WalletError> for UploadError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::Unavailable => Self::WalletUnavailable,
            WalletError::PermissionDenied => Self::PermissionDenied,
            WalletError::UserCancelled => Self::UserCancelled,
            WalletError::Signing(reason) => Self::SigningFailure(reason),
        }
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub note_id: u64,

    /// Network-assigned pointer to the uploaded envelope.
    pub pointer: ContentPointer,

    /// Whether the anchor record was created. `false` means the content
    /// is durable but the ledger write failed; re-anchoring is safe.
    pub anchored: bool,

    /// Derived ledger address of the record slot.
    pub record_address: String,
}

/// Run the upload flow for one note.
pub(crate) async fn run(
    wallet: &dyn WalletClient,
    storage: &dyn StorageClient,
    ledger: &dyn LedgerClient,
    guard: &BalanceGuard,
    config: &PipelineConfig,
    note: &PlaintextNote,
    note_id: u64,
) -> Result<UploadReceipt, UploadError> {
    // CheckWallet / Connect
    let session = ensure_session(wallet, &UPLOAD_SCOPES).await?;
    debug!(note_id, address = %session.address, stage = %UploadStage::CheckWallet, "wallet session acquired");

    // Seal the note before touching the network. A fresh nonce is
    // generated inside; nonces are never reused across saves.
    let key = config.key_material(&session.public_key);
    let json = note.to_wire_json()?;
    let envelope = Envelope::seal(json.as_bytes(), &key)?;
    let data = envelope.to_bytes();

    // BuildTransaction
    let tags = config.upload_tags(&session.address);
    let tx = storage
        .create_transaction(data, tags, &session.address)
        .await
        .map_err(|e| UploadError::TransactionBuildFailure(e.to_string()))?;
    debug!(note_id, reward = tx.reward, stage = %UploadStage::BuildTransaction, "transaction built");

    // FundingGuard: blocks the post transition when underfunded.
    let balance = guard.resolve_balance(storage, &session.address).await;
    if balance < tx.reward {
        return Err(UploadError::InsufficientFunds {
            balance,
            required: tx.reward,
        });
    }
    debug!(note_id, balance, stage = %UploadStage::FundingGuard, "funding verified");

    // Sign: modal; resolves on approval, rejection, or timeout.
    let signed = wallet.sign(tx).await.map_err(UploadError::from)?;
    debug!(note_id, tx_id = %signed.id, stage = %UploadStage::Sign, "transaction signed");

    // Post: bounded retry with backoff.
    let receipt = retry_with_backoff(
        &config.post_retry,
        || async {
            let receipt = storage.post(&signed).await?;
            if receipt.accepted() {
                Ok(receipt)
            } else {
                Err(StorageError::Rejected {
                    status: receipt.status,
                })
            }
        },
        |error| {
            matches!(
                error,
                StorageError::Network(_) | StorageError::Rejected { .. }
            )
        },
    )
    .await
    .map_err(|failure| UploadError::NetworkPostFailure {
        attempts: failure.attempts(),
        reason: failure.to_string(),
    })?;

    let pointer = receipt.pointer;
    info!(note_id, pointer = %pointer, "envelope posted to storage network");

    // Anchor: runs only after a durable upload.
    let record_address = derive_record_address(&session.address, note_id);
    let anchored = match anchor_note(
        ledger,
        &session.address,
        note_id,
        pointer.clone(),
        unix_timestamp(),
    )
    .await
    {
        Ok(_) => true,
        Err(error) => {
            warn!(
                note_id,
                pointer = %pointer,
                stage = %UploadStage::Anchor,
                error = %error,
                "upload succeeded but anchoring failed"
            );
            false
        }
    };

    Ok(UploadReceipt {
        note_id,
        pointer,
        anchored,
        record_address,
    })
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(UploadStage::CheckWallet.to_string(), "check-wallet");
        assert_eq!(UploadStage::Post.to_string(), "post");
    }

    #[test]
    fn test_wallet_errors_map_into_the_taxonomy() {
        assert!(matches!(
            UploadError::from(WalletError::Unavailable),
            UploadError::WalletUnavailable
        ));
        assert!(matches!(
            UploadError::from(WalletError::UserCancelled),
            UploadError::UserCancelled
        ));
        assert!(matches!(
            UploadError::from(WalletError::Signing("boom".to_string())),
            UploadError::SigningFailure(_)
        ));
    }
}
