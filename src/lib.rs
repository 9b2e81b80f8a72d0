//! Permanote - encrypted permanent-storage pipeline for notes.
//!
//! Turns a plaintext note into an immutable, content-addressed,
//! encrypted artifact on a public durable storage network, anchors a
//! small metadata record on a public ledger, and later reconstructs the
//! note list by walking that ledger and decrypting fetched content.
//!
//! Key principles:
//! - Capabilities (wallet, storage, ledger) are injected traits, never
//!   ambient globals, so every flow runs against mocks in tests
//! - Decryption never yields unauthenticated plaintext
//! - Funding checks fail closed: an unreachable balance endpoint reads
//!   as zero and blocks the upload
//! - Retrieval is partial-success: one corrupt record never costs the
//!   rest of the list
//!
//! UI, note editing, auth, and the non-permanent persistence modes live
//! in the client application, which hands this crate validated notes and
//! consumes the lists and pointers it returns.

pub mod crypto;
pub mod ledger;
pub mod note;
pub mod pipeline;
pub mod storage;
pub mod wallet;

pub use crypto::{Envelope, EnvelopeError, KeyMaterial};
pub use ledger::{AnchorRecord, LedgerClient, LedgerError, MockLedger};
pub use note::PlaintextNote;
pub use pipeline::{
    KeySource, NoteBatch, NotePipeline, PipelineConfig, RetryPolicy, UploadError, UploadReceipt,
};
pub use storage::{ContentPointer, MockStorageNetwork, StorageClient, StorageError};
pub use wallet::{MockWallet, WalletClient, WalletError};
