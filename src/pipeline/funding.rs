//! Balance guard: fail-closed funding checks.
//!
//! A transient balance-query outage must never let a doomed, unfunded
//! upload through to the network, so exhausting the retry budget (or
//! timing out every attempt) resolves the balance to zero instead of
//! propagating an error. The uploader then refuses with
//! `InsufficientFunds` and the user gets funding guidance rather than a
//! confusing network failure mid-flow.

use std::time::Duration;

use tracing::warn;

use super::retry::{retry_with_backoff, RetryPolicy};
use crate::storage::StorageClient;

/// Default balance-check policy: 3 attempts, 10s per attempt.
pub fn default_funding_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(500)).with_timeout(Duration::from_secs(10))
}

/// Funding verifier for the signing address.
#[derive(Debug, Clone)]
pub struct BalanceGuard {
    policy: RetryPolicy,
}

impl BalanceGuard {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Resolve the winston balance of `address`, treating every failure
    /// as retryable. Exhaustion resolves to zero (fail closed).
    pub async fn resolve_balance(&self, storage: &dyn StorageClient, address: &str) -> u64 {
        match retry_with_backoff(&self.policy, || storage.balance(address), |_| true).await {
            Ok(winston) => winston,
            Err(failure) => {
                warn!(
                    address,
                    error = %failure,
                    "balance check failed, resolving balance to zero"
                );
                0
            }
        }
    }
}

impl Default for BalanceGuard {
    fn default() -> Self {
        Self::new(default_funding_policy())
    }
}
