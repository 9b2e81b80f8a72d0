//! Mock storage network for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::*;

/// In-memory storage network with programmable failures.
#[derive(Clone)]
pub struct MockStorageNetwork {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    blobs: HashMap<String, Vec<u8>>,
    balances: HashMap<String, u64>,
    /// Fee quote per data byte (minimum 1 winston per transaction).
    reward_per_byte: u64,
    fail_builds_remaining: u32,
    fail_posts_remaining: u32,
    reject_posts_remaining: u32,
    fail_balance: bool,
    /// Simulated latency on balance queries, for timeout tests.
    balance_delay: Option<Duration>,
    unfetchable: HashSet<String>,
    post_calls: u32,
    balance_calls: u32,
    last_posted: Option<SignedTransaction>,
}

impl MockStorageNetwork {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                blobs: HashMap::new(),
                balances: HashMap::new(),
                reward_per_byte: 1,
                fail_builds_remaining: 0,
                fail_posts_remaining: 0,
                reject_posts_remaining: 0,
                fail_balance: false,
                balance_delay: None,
                unfetchable: HashSet::new(),
                post_calls: 0,
                balance_calls: 0,
                last_posted: None,
            })),
        }
    }

    /// Store a blob directly (for retrieval test setup).
    pub fn put_blob(&self, pointer: &ContentPointer, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(pointer.as_str().to_string(), bytes);
    }

    pub fn set_balance(&self, address: &str, winston: u64) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.to_string(), winston);
    }

    /// Fail the next `n` create_transaction calls.
    pub fn fail_next_builds(&self, n: u32) {
        self.state.lock().unwrap().fail_builds_remaining = n;
    }

    /// Fail the next `n` posts with a transport error.
    pub fn fail_next_posts(&self, n: u32) {
        self.state.lock().unwrap().fail_posts_remaining = n;
    }

    /// Answer the next `n` posts with a non-success status.
    pub fn reject_next_posts(&self, n: u32) {
        self.state.lock().unwrap().reject_posts_remaining = n;
    }

    /// Make every balance query fail with a transport error.
    pub fn fail_balance_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_balance = fail;
    }

    /// Delay balance answers, to drive per-attempt timeouts.
    pub fn set_balance_delay(&self, delay: Duration) {
        self.state.lock().unwrap().balance_delay = Some(delay);
    }

    /// Make fetches of `pointer` fail with a transport error.
    pub fn make_unfetchable(&self, pointer: &ContentPointer) {
        self.state
            .lock()
            .unwrap()
            .unfetchable
            .insert(pointer.as_str().to_string());
    }

    pub fn post_calls(&self) -> u32 {
        self.state.lock().unwrap().post_calls
    }

    pub fn balance_calls(&self) -> u32 {
        self.state.lock().unwrap().balance_calls
    }

    /// The most recently posted transaction, for asserting on tags.
    pub fn last_posted(&self) -> Option<SignedTransaction> {
        self.state.lock().unwrap().last_posted.clone()
    }
}

impl Default for MockStorageNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageClient for MockStorageNetwork {
    async fn create_transaction(
        &self,
        data: Vec<u8>,
        tags: Vec<Tag>,
        owner_address: &str,
    ) -> StorageResult<StorageTransaction> {
        let mut state = self.state.lock().unwrap();
        if state.fail_builds_remaining > 0 {
            state.fail_builds_remaining -= 1;
            return Err(StorageError::BuildFailed("simulated build failure".to_string()));
        }
        let reward = (data.len() as u64 * state.reward_per_byte).max(1);
        Ok(StorageTransaction {
            data,
            tags,
            owner_address: owner_address.to_string(),
            reward,
        })
    }

    async fn post(&self, signed: &SignedTransaction) -> StorageResult<PostReceipt> {
        let mut state = self.state.lock().unwrap();
        state.post_calls += 1;
        state.last_posted = Some(signed.clone());

        if state.fail_posts_remaining > 0 {
            state.fail_posts_remaining -= 1;
            return Err(StorageError::Network("simulated post failure".to_string()));
        }

        let pointer = ContentPointer::new(signed.id.clone());
        if state.reject_posts_remaining > 0 {
            state.reject_posts_remaining -= 1;
            return Ok(PostReceipt {
                status: 400,
                pointer,
            });
        }

        state
            .blobs
            .insert(signed.id.clone(), signed.transaction.data.clone());
        Ok(PostReceipt {
            status: 200,
            pointer,
        })
    }

    async fn fetch(&self, pointer: &ContentPointer) -> StorageResult<Vec<u8>> {
        let state = self.state.lock().unwrap();
        if state.unfetchable.contains(pointer.as_str()) {
            return Err(StorageError::Network("simulated fetch failure".to_string()));
        }
        state
            .blobs
            .get(pointer.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(pointer.clone()))
    }

    async fn balance(&self, address: &str) -> StorageResult<u64> {
        let (delay, fail, balance) = {
            let mut state = self.state.lock().unwrap();
            state.balance_calls += 1;
            (
                state.balance_delay,
                state.fail_balance,
                state.balances.get(address).copied().unwrap_or(0),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StorageError::Network("simulated balance failure".to_string()));
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(id: &str, data: Vec<u8>) -> SignedTransaction {
        SignedTransaction {
            transaction: StorageTransaction {
                data,
                tags: Vec::new(),
                owner_address: "owner".to_string(),
                reward: 1,
            },
            signature: vec![0xAB],
            id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_post_then_fetch() {
        let network = MockStorageNetwork::new();
        let receipt = network.post(&signed("tx-1", vec![1, 2, 3])).await.unwrap();
        assert!(receipt.accepted());

        let bytes = network.fetch(&receipt.pointer).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_pointer_is_not_found() {
        let network = MockStorageNetwork::new();
        let result = network.fetch(&ContentPointer::new("missing")).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failing_posts_then_recovery() {
        let network = MockStorageNetwork::new();
        network.fail_next_posts(2);

        assert!(network.post(&signed("a", vec![])).await.is_err());
        assert!(network.post(&signed("b", vec![])).await.is_err());
        assert!(network.post(&signed("c", vec![])).await.is_ok());
        assert_eq!(network.post_calls(), 3);
    }

    #[tokio::test]
    async fn test_rejected_post_returns_receipt_not_error() {
        let network = MockStorageNetwork::new();
        network.reject_next_posts(1);

        let receipt = network.post(&signed("a", vec![])).await.unwrap();
        assert!(!receipt.accepted());
    }

    #[tokio::test]
    async fn test_reward_scales_with_data_size() {
        let network = MockStorageNetwork::new();
        let small = network
            .create_transaction(vec![0; 10], Vec::new(), "owner")
            .await
            .unwrap();
        let large = network
            .create_transaction(vec![0; 1000], Vec::new(), "owner")
            .await
            .unwrap();
        assert!(large.reward > small.reward);
    }

    #[tokio::test]
    async fn test_unknown_address_has_zero_balance() {
        let network = MockStorageNetwork::new();
        assert_eq!(network.balance("nobody").await.unwrap(), 0);
    }
}
