//! Mock ledger for testing.
//!
//! Enforces the same rules the on-ledger program does: one record per
//! (owner, note id) slot, permanence only on records that carry a
//! content pointer, and permanence never reverting.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::*;
use crate::storage::ContentPointer;

#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
}

struct MockState {
    records: HashMap<(String, u64), AnchorRecord>,
    fail_creates_remaining: u32,
    fail_queries: bool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                records: HashMap::new(),
                fail_creates_remaining: 0,
                fail_queries: false,
            })),
        }
    }

    /// Insert a record directly (for retrieval test setup).
    pub fn put_record(&self, record: AnchorRecord) {
        let mut state = self.state.lock().unwrap();
        state
            .records
            .insert((record.owner_address.clone(), record.note_id), record);
    }

    /// Fail the next `n` create_record calls with a network error.
    pub fn fail_next_creates(&self, n: u32) {
        self.state.lock().unwrap().fail_creates_remaining = n;
    }

    /// Make every query fail with a network error.
    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_queries = fail;
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn create_record(
        &self,
        owner_address: &str,
        note_id: u64,
        content_pointer: Option<ContentPointer>,
        created_at: i64,
    ) -> LedgerResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates_remaining > 0 {
            state.fail_creates_remaining -= 1;
            return Err(LedgerError::Network("simulated create failure".to_string()));
        }

        let slot = (owner_address.to_string(), note_id);
        if state.records.contains_key(&slot) {
            return Err(LedgerError::RecordExists { note_id });
        }

        state.records.insert(
            slot,
            AnchorRecord {
                owner_address: owner_address.to_string(),
                note_id,
                content_pointer,
                permanent: false,
                created_at,
            },
        );
        Ok(())
    }

    async fn set_permanent(&self, owner_address: &str, note_id: u64) -> LedgerResult<()> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(&(owner_address.to_string(), note_id))
            .ok_or(LedgerError::RecordNotFound { note_id })?;

        if record.note_id != note_id {
            return Err(LedgerError::InvalidNoteId);
        }
        if record.content_pointer.is_none() {
            return Err(LedgerError::Rejected(
                "record has no content pointer".to_string(),
            ));
        }

        // false → true only; a second call finds it already true.
        record.permanent = true;
        Ok(())
    }

    async fn query_records(&self, filter: &RecordFilter) -> LedgerResult<Vec<AnchorRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_queries {
            return Err(LedgerError::Network("simulated query failure".to_string()));
        }

        let mut records: Vec<AnchorRecord> = state
            .records
            .values()
            .filter(|record| record.owner_address == filter.owner_address)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.note_id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(owner: &str) -> RecordFilter {
        RecordFilter {
            owner_address: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_query() {
        let ledger = MockLedger::new();
        ledger
            .create_record("owner", 1, Some(ContentPointer::new("ptr")), 100)
            .await
            .unwrap();

        let records = ledger.query_records(&filter("owner")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].note_id, 1);
        assert!(!records[0].permanent);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let ledger = MockLedger::new();
        ledger.create_record("owner", 1, None, 100).await.unwrap();

        let result = ledger.create_record("owner", 1, None, 101).await;
        assert!(matches!(result, Err(LedgerError::RecordExists { note_id: 1 })));
    }

    #[tokio::test]
    async fn test_query_filters_by_owner() {
        let ledger = MockLedger::new();
        ledger
            .create_record("alice", 1, Some(ContentPointer::new("a")), 100)
            .await
            .unwrap();
        ledger
            .create_record("bob", 1, Some(ContentPointer::new("b")), 100)
            .await
            .unwrap();

        let records = ledger.query_records(&filter("alice")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner_address, "alice");
    }

    #[tokio::test]
    async fn test_permanence_never_reverts() {
        let ledger = MockLedger::new();
        ledger
            .create_record("owner", 1, Some(ContentPointer::new("ptr")), 100)
            .await
            .unwrap();

        ledger.set_permanent("owner", 1).await.unwrap();
        ledger.set_permanent("owner", 1).await.unwrap();

        let records = ledger.query_records(&filter("owner")).await.unwrap();
        assert!(records[0].permanent);
    }

    #[tokio::test]
    async fn test_permanence_requires_content_pointer() {
        let ledger = MockLedger::new();
        ledger.create_record("owner", 1, None, 100).await.unwrap();

        let result = ledger.set_permanent("owner", 1).await;
        assert!(matches!(result, Err(LedgerError::Rejected(_))));
    }
}
