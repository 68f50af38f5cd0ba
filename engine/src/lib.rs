//! # Tally Engine
//!
//! Core logic for a small voting tally.
//!
//! This crate keeps a list of name → vote-count records, derives aggregate
//! statistics from it, and defines the rules for the multi-user variant where
//! votes are written as numbered entry batches.
//!
//! ## Design Principles
//!
//! - **No network or database IO**: persistence is an injected trait
//! - **Explicit recomputation**: aggregates are plain functions, called after
//!   each change
//! - **Best-effort saves**: a failed write never undoes an in-memory change
//!
//! ## Core Concepts
//!
//! ### Local tally
//!
//! [`TallyStore`] owns an ordered list of [`VoteRecord`]s and a
//! [`KeyValueStore`]. Names are matched ignoring case when adding, counts
//! never go below zero, and every mutation is flushed as a JSON array.
//!
//! ### Aggregates
//!
//! [`summarize`] derives total voters, total votes and the leader;
//! [`sorted_view`] orders records by votes, stable for ties.
//!
//! ### Entry batches
//!
//! In the multi-user variant each save writes one [`BatchEntry`] per selected
//! candidate under a fresh batch number. Undo removes a user's latest batch;
//! deleting a candidate removes its entries for everyone. The [`batch`]
//! functions hold the rules, and [`BatchLedger`] runs them in memory.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally_engine::{MemoryStore, TallyStore};
//!
//! let mut store = TallyStore::open(MemoryStore::new());
//!
//! store.add("Alice").unwrap();
//! store.add("alice").unwrap();
//! store.add("Bob").unwrap();
//! store.adjust("Bob", -5);
//!
//! let summary = store.summary();
//! assert_eq!(summary.total_voters, 2);
//! assert_eq!(summary.total_votes, 2);
//! assert_eq!(summary.leader.as_deref(), Some("Alice"));
//! ```

pub mod adapter;
pub mod aggregate;
pub mod batch;
pub mod error;
pub mod record;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use adapter::{KeyValueStore, MemoryStore};
pub use aggregate::{sorted_view, summarize, Summary, LEADER_PLACEHOLDER};
pub use batch::{
    AdjustPlan, BatchEntry, BatchLedger, NewEntry, SaveReceipt, TallyView, UndoReceipt,
};
pub use error::Error;
pub use record::VoteRecord;
pub use snapshot::STORAGE_KEY;
pub use store::{AddOutcome, Applied, TallyStore, MAX_SUGGESTIONS};

/// Type aliases for clarity
pub type CandidateName = String;
pub type VoteCount = u64;
pub type UserId = i64;
pub type BatchNumber = i64;
pub type EntryId = i64;
