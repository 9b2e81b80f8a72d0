//! Ledger anchoring capability.
//!
//! Anchor records are small on-ledger entries binding an owner, a note
//! id, and a content pointer plus a permanence flag. The ledger is
//! append-only: records are never erased by this subsystem, and the
//! permanence flag only ever moves false → true.

pub mod anchor;
pub mod mock;
pub mod traits;

pub use anchor::{anchor_note, derive_record_address, make_permanent, AnchorPhase};
pub use mock::MockLedger;
pub use traits::{AnchorRecord, LedgerClient, LedgerError, LedgerResult, RecordFilter};
