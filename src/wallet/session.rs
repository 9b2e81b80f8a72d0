//! Session acquisition: connect only when scopes are ungranted.

use tracing::debug;

use super::traits::{Scope, WalletClient, WalletResult, WalletSession};

/// Acquire a wallet session for the given scopes.
///
/// Queries the currently-granted scopes first and only prompts the user
/// with a connect request when something is missing. Returns the active
/// address and public key for the signing identity.
///
/// # Errors
///
/// - `Unavailable`: no wallet capability on this platform
/// - `PermissionDenied`: the user declined the connect prompt
pub async fn ensure_session(
    wallet: &dyn WalletClient,
    scopes: &[Scope],
) -> WalletResult<WalletSession> {
    let granted = wallet.granted_scopes().await?;
    let missing: Vec<Scope> = scopes
        .iter()
        .copied()
        .filter(|scope| !granted.contains(scope))
        .collect();

    if !missing.is_empty() {
        debug!(missing = missing.len(), "requesting wallet permissions");
        wallet.connect(scopes).await?;
    }

    let address = wallet.active_address().await?;
    let public_key = wallet.active_public_key().await?;

    Ok(WalletSession {
        address,
        public_key,
        granted_scopes: scopes.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::mock::MockWallet;
    use crate::wallet::traits::{WalletError, UPLOAD_SCOPES};

    #[tokio::test]
    async fn test_session_connects_when_ungranted() {
        let wallet = MockWallet::new("addr-1", vec![7u8; 32]);

        let session = ensure_session(&wallet, &UPLOAD_SCOPES).await.unwrap();
        assert_eq!(session.address, "addr-1");
        assert_eq!(session.public_key, vec![7u8; 32]);
        assert_eq!(wallet.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_session_skips_connect_when_already_granted() {
        let wallet = MockWallet::new("addr-1", vec![7u8; 32]);

        ensure_session(&wallet, &UPLOAD_SCOPES).await.unwrap();
        ensure_session(&wallet, &UPLOAD_SCOPES).await.unwrap();
        assert_eq!(wallet.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_session_fails_when_wallet_unavailable() {
        let wallet = MockWallet::unavailable();
        let result = ensure_session(&wallet, &UPLOAD_SCOPES).await;
        assert!(matches!(result, Err(WalletError::Unavailable)));
    }

    #[tokio::test]
    async fn test_session_fails_when_user_declines() {
        let wallet = MockWallet::new("addr-1", vec![7u8; 32]);
        wallet.deny_connect();

        let result = ensure_session(&wallet, &UPLOAD_SCOPES).await;
        assert!(matches!(result, Err(WalletError::PermissionDenied)));
    }
}
