//! Wallet client trait abstractions.

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::{SignedTransaction, StorageTransaction};

/// Permission scopes a wallet can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Read the active address.
    Address,
    /// Read the active public key.
    PublicKey,
    /// Sign storage transactions.
    SignTransaction,
    /// Read network configuration (gateway, currency).
    NetworkConfig,
}

impl Scope {
    /// Wire name used when requesting permissions from the wallet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "ACCESS_ADDRESS",
            Self::PublicKey => "ACCESS_PUBLIC_KEY",
            Self::SignTransaction => "SIGN_TRANSACTION",
            Self::NetworkConfig => "ACCESS_NETWORK_CONFIG",
        }
    }
}

/// The fixed scope set the upload and retrieval flows request.
pub const UPLOAD_SCOPES: [Scope; 4] = [
    Scope::Address,
    Scope::PublicKey,
    Scope::SignTransaction,
    Scope::NetworkConfig,
];

/// An active wallet session.
///
/// Ephemeral: reacquired per operation, never persisted.
#[derive(Debug, Clone)]
pub struct WalletSession {
    pub address: String,
    pub public_key: Vec<u8>,
    pub granted_scopes: Vec<Scope>,
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Wallet capability errors.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet capability exists on this platform.
    #[error("wallet capability unavailable")]
    Unavailable,

    /// The user declined the requested permission scopes.
    #[error("wallet permissions declined")]
    PermissionDenied,

    /// The user cancelled a signing request.
    #[error("signing request cancelled by the user")]
    UserCancelled,

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Wallet capability consumed by the pipeline.
///
/// Signing requests are modal from the user's perspective: `sign` does
/// not resolve until the wallet reports approval, rejection, or timeout,
/// and an in-flight request cannot be cancelled from this side.
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Request permission scopes. The user may decline.
    async fn connect(&self, scopes: &[Scope]) -> WalletResult<()>;

    /// Scopes currently granted to this application.
    async fn granted_scopes(&self) -> WalletResult<Vec<Scope>>;

    /// Active address of the signing identity.
    async fn active_address(&self) -> WalletResult<String>;

    /// Public key bytes of the signing identity.
    async fn active_public_key(&self) -> WalletResult<Vec<u8>>;

    /// Sign a storage transaction, assigning its id.
    async fn sign(&self, tx: StorageTransaction) -> WalletResult<SignedTransaction>;
}
