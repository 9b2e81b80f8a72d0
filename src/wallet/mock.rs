//! Mock wallet for testing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

use super::traits::*;
use crate::storage::{SignedTransaction, StorageTransaction};

/// Scriptable wallet: grants, declines, cancels, and counts calls.
#[derive(Clone)]
pub struct MockWallet {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    available: bool,
    address: String,
    public_key: Vec<u8>,
    granted: Vec<Scope>,
    approve_connect: bool,
    cancel_next_sign: bool,
    fail_next_sign: Option<String>,
    connect_calls: u32,
    sign_calls: u32,
}

impl MockWallet {
    /// An available wallet that approves every prompt.
    pub fn new(address: impl Into<String>, public_key: Vec<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                available: true,
                address: address.into(),
                public_key,
                granted: Vec::new(),
                approve_connect: true,
                cancel_next_sign: false,
                fail_next_sign: None,
                connect_calls: 0,
                sign_calls: 0,
            })),
        }
    }

    /// Simulates a platform with no wallet capability installed.
    pub fn unavailable() -> Self {
        let wallet = Self::new("", Vec::new());
        wallet.state.lock().unwrap().available = false;
        wallet
    }

    /// Decline future connect prompts.
    pub fn deny_connect(&self) {
        self.state.lock().unwrap().approve_connect = false;
    }

    /// Cancel the next signing prompt.
    pub fn cancel_next_sign(&self) {
        self.state.lock().unwrap().cancel_next_sign = true;
    }

    /// Fail the next signing prompt with a wallet-side error.
    pub fn fail_next_sign(&self, reason: impl Into<String>) {
        self.state.lock().unwrap().fail_next_sign = Some(reason.into());
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.lock().unwrap().connect_calls
    }

    pub fn sign_calls(&self) -> u32 {
        self.state.lock().unwrap().sign_calls
    }
}

#[async_trait]
impl WalletClient for MockWallet {
    async fn connect(&self, scopes: &[Scope]) -> WalletResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        state.connect_calls += 1;
        if !state.approve_connect {
            return Err(WalletError::PermissionDenied);
        }
        state.granted = scopes.to_vec();
        Ok(())
    }

    async fn granted_scopes(&self) -> WalletResult<Vec<Scope>> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        Ok(state.granted.clone())
    }

    async fn active_address(&self) -> WalletResult<String> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        Ok(state.address.clone())
    }

    async fn active_public_key(&self) -> WalletResult<Vec<u8>> {
        let state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        Ok(state.public_key.clone())
    }

    async fn sign(&self, tx: StorageTransaction) -> WalletResult<SignedTransaction> {
        let mut state = self.state.lock().unwrap();
        if !state.available {
            return Err(WalletError::Unavailable);
        }
        state.sign_calls += 1;
        if state.cancel_next_sign {
            state.cancel_next_sign = false;
            return Err(WalletError::UserCancelled);
        }
        if let Some(reason) = state.fail_next_sign.take() {
            return Err(WalletError::Signing(reason));
        }

        // Deterministic fake signature over the transaction body; the id
        // is the hash of the signature, as the real network derives it.
        let mut hasher = Sha256::new();
        hasher.update(&tx.data);
        hasher.update(tx.owner_address.as_bytes());
        hasher.update(tx.reward.to_le_bytes());
        let signature = hasher.finalize().to_vec();
        let id = hex::encode(Sha256::digest(&signature));

        Ok(SignedTransaction {
            transaction: tx,
            signature,
            id,
        })
    }
}
