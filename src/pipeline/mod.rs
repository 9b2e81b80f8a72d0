//! The permanent-storage pipeline.
//!
//! Orchestrates the injected wallet, storage, and ledger capabilities:
//!
//! ```text
//! PlaintextNote
//!      │ serialize + seal (crypto)
//!      ▼
//! Storage upload (uploader: wallet session, funding guard, sign, post)
//!      │ content pointer
//!      ▼
//! Anchor record (ledger: create, optionally set permanent)
//!      │
//!      ▼ later
//! Reconciliation (reconciler: query records, fetch, decrypt, rebuild)
//! ```
//!
//! All operations are cooperative async suspensions; nothing here spawns
//! worker threads. Uploads for the same note id are serialized through a
//! per-id mutex so two concurrent saves cannot race the anchor step.

pub mod funding;
pub mod reconciler;
pub mod retry;
pub mod uploader;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::crypto::KeyMaterial;
use crate::ledger::{make_permanent, LedgerClient};
use crate::note::PlaintextNote;
use crate::storage::{winston_to_ar, StorageClient};
use crate::wallet::{ensure_session, WalletClient, UPLOAD_SCOPES};

pub use funding::{default_funding_policy, BalanceGuard};
pub use reconciler::{LoadedNote, NoteBatch, RetrieveError, SkipStage, SkippedRecord};
pub use retry::{retry_with_backoff, RetryFailure, RetryPolicy};
pub use uploader::{UploadError, UploadReceipt, UploadStage};

/// How envelope key material is derived from the wallet public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Historical derivation from the public key alone. Readable by
    /// anyone who knows the address; see `crypto::derive`.
    PublicKeyOnly,
    /// Public-key derivation with a user passphrase layered on top.
    Passphrase(String),
}

/// Pipeline tuning and identification.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Application name stamped on upload transactions.
    pub app_name: String,
    /// Application version stamped on upload transactions.
    pub app_version: String,
    /// Retry policy for the post step.
    pub post_retry: RetryPolicy,
    /// Retry policy for balance checks (fail-closed on exhaustion).
    pub funding_retry: RetryPolicy,
    pub key_source: KeySource,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            post_retry: RetryPolicy::default(),
            funding_retry: default_funding_policy(),
            key_source: KeySource::PublicKeyOnly,
        }
    }
}

impl PipelineConfig {
    /// Fixed metadata tags attached to every upload transaction.
    pub fn upload_tags(&self, uploader_address: &str) -> Vec<crate::storage::Tag> {
        vec![
            crate::storage::Tag::new("Content-Type", "application/octet-stream"),
            crate::storage::Tag::new("App-Name", &self.app_name),
            crate::storage::Tag::new("App-Version", &self.app_version),
            crate::storage::Tag::new("Uploader", uploader_address),
        ]
    }

    /// Envelope key material for the session public key.
    pub fn key_material(&self, public_key: &[u8]) -> KeyMaterial {
        match &self.key_source {
            KeySource::PublicKeyOnly => KeyMaterial::from_public_key(public_key),
            KeySource::Passphrase(passphrase) => {
                KeyMaterial::with_passphrase(public_key, passphrase)
            }
        }
    }
}

/// The note permanence pipeline.
///
/// Capabilities are injected; nothing is discovered from ambient state,
/// which keeps every flow runnable against mocks.
pub struct NotePipeline {
    wallet: Arc<dyn WalletClient>,
    storage: Arc<dyn StorageClient>,
    ledger: Arc<dyn LedgerClient>,
    config: PipelineConfig,
    guard: BalanceGuard,
    note_locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl NotePipeline {
    pub fn new(
        wallet: Arc<dyn WalletClient>,
        storage: Arc<dyn StorageClient>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self::with_config(wallet, storage, ledger, PipelineConfig::default())
    }

    pub fn with_config(
        wallet: Arc<dyn WalletClient>,
        storage: Arc<dyn StorageClient>,
        ledger: Arc<dyn LedgerClient>,
        config: PipelineConfig,
    ) -> Self {
        let guard = BalanceGuard::new(config.funding_retry.clone());
        Self {
            wallet,
            storage,
            ledger,
            config,
            guard,
            note_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Encrypt, upload, and anchor one note.
    ///
    /// Returns the content pointer and whether the anchor record was
    /// created. Concurrent calls for the same note id are serialized.
    pub async fn upload_note(
        &self,
        note: &PlaintextNote,
        note_id: u64,
    ) -> Result<UploadReceipt, UploadError> {
        let lock = self.note_lock(note_id);
        let _serialized = lock.lock().await;

        uploader::run(
            self.wallet.as_ref(),
            self.storage.as_ref(),
            self.ledger.as_ref(),
            &self.guard,
            &self.config,
            note,
            note_id,
        )
        .await
    }

    /// Mark an anchored note permanent (second, fee-bearing transaction).
    ///
    /// Idempotent: repeating the call on an already-permanent record
    /// succeeds without changing anything.
    pub async fn set_permanent(&self, note_id: u64) -> Result<(), UploadError> {
        let lock = self.note_lock(note_id);
        let _serialized = lock.lock().await;

        let session = ensure_session(self.wallet.as_ref(), &UPLOAD_SCOPES).await?;
        make_permanent(self.ledger.as_ref(), &session.address, note_id).await?;
        Ok(())
    }

    /// Load every readable note for the active wallet identity.
    pub async fn load_notes(&self) -> Result<NoteBatch, RetrieveError> {
        let session = ensure_session(self.wallet.as_ref(), &UPLOAD_SCOPES).await?;
        self.load_notes_for(&session.address, &session.public_key)
            .await
    }

    /// Load notes for an explicit owner identity.
    pub async fn load_notes_for(
        &self,
        owner_address: &str,
        owner_public_key: &[u8],
    ) -> Result<NoteBatch, RetrieveError> {
        let key = self.config.key_material(owner_public_key);
        reconciler::load_notes(self.storage.as_ref(), self.ledger.as_ref(), &key, owner_address)
            .await
    }

    /// Funding balance of `address` in AR units, fail-closed to zero.
    pub async fn check_funding(&self, address: &str) -> f64 {
        let winston = self
            .guard
            .resolve_balance(self.storage.as_ref(), address)
            .await;
        winston_to_ar(winston)
    }

    fn note_lock(&self, note_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.note_locks.lock().unwrap();
        let lock = locks
            .entry(note_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())));
        debug!(note_id, "acquired per-note upload lock handle");
        lock.clone()
    }
}
