//! Wallet capability.
//!
//! The pipeline never probes an ambient global for a wallet object.
//! Callers inject a concrete [`WalletClient`] (browser-extension bridge,
//! in-app mobile wallet, or [`MockWallet`] in tests) chosen by their own
//! platform detection, which keeps every flow testable.

pub mod mock;
pub mod session;
pub mod traits;

pub use mock::MockWallet;
pub use session::ensure_session;
pub use traits::{Scope, WalletClient, WalletError, WalletResult, WalletSession, UPLOAD_SCOPES};
