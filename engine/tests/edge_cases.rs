//! Edge case tests for tally-engine
//!
//! These tests cover boundary conditions, unusual inputs, and the
//! properties that must hold for any sequence of operations.

use proptest::prelude::*;
use tally_engine::{
    snapshot, sorted_view, summarize, BatchLedger, Error, MemoryStore, TallyStore, VoteRecord,
};

fn store() -> TallyStore<MemoryStore> {
    TallyStore::open(MemoryStore::new())
}

// ============================================================================
// Name Edge Cases
// ============================================================================

#[test]
fn unicode_names_merge_ignoring_case() {
    let mut store = store();

    store.add("Nguyễn Văn A").unwrap();
    store.add("NGUYỄN VĂN A").unwrap();
    store.add("Привет").unwrap();
    store.add("привет").unwrap();

    assert_eq!(
        store.records(),
        &[
            VoteRecord::new("Nguyễn Văn A", 2),
            VoteRecord::new("Привет", 2),
        ]
    );
}

#[test]
fn whitespace_only_names_are_rejected() {
    let mut store = store();

    for name in ["", " ", "\t", "\n  \t"] {
        assert_eq!(store.add(name), Err(Error::EmptyName), "input {:?}", name);
    }
    assert!(store.is_empty());
}

#[test]
fn inner_whitespace_is_kept() {
    let mut store = store();
    store.add("  Le  Thi  ").unwrap();

    assert!(store.get("Le  Thi").is_some());
    assert!(store.get("Le Thi").is_none());
}

#[test]
fn very_long_names() {
    let mut store = store();
    let long_name = "x".repeat(64 * 1024);

    store.add(&long_name).unwrap();
    store.add(&long_name.to_uppercase()).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.records()[0].votes, 2);
}

// ============================================================================
// Numeric Edge Cases
// ============================================================================

#[test]
fn adjust_at_zero_stays_zero() {
    let mut store = store();
    store.add("Alice").unwrap();
    store.adjust("Alice", -1);

    assert_eq!(store.adjust("Alice", -1).value, Some(0));
}

#[test]
fn extreme_deltas_saturate() {
    let mut store = store();
    store.add("Alice").unwrap();

    assert_eq!(store.adjust("Alice", i64::MAX).value, Some(1 + i64::MAX as u64));
    assert_eq!(store.adjust("Alice", i64::MIN).value, Some(0));
}

#[test]
fn stored_counts_near_max_do_not_overflow_total() {
    let raw = format!(
        r#"[{{"name":"A","votes":{}}},{{"name":"B","votes":5}}]"#,
        u64::MAX
    );
    let store = TallyStore::open(MemoryStore::with_entry(snapshot::STORAGE_KEY, raw));

    assert_eq!(store.summary().total_votes, u64::MAX);
}

// ============================================================================
// Storage Edge Cases
// ============================================================================

#[test]
fn stored_records_without_votes_count_as_zero() {
    let stored = MemoryStore::with_entry(
        snapshot::STORAGE_KEY,
        r#"[{"name":"A"},{"name":"B","votes":3}]"#,
    );
    let store = TallyStore::open(stored);

    let summary = store.summary();
    assert_eq!(summary.total_voters, 2);
    assert_eq!(summary.total_votes, 3);
    assert_eq!(summary.leader.as_deref(), Some("B"));
}

#[test]
fn custom_storage_key_is_isolated() {
    let mut first = TallyStore::open_with_key(MemoryStore::new(), "tally_a");
    first.add("Alice").unwrap();

    let storage = first.storage().clone();
    assert!(TallyStore::open(storage.clone()).is_empty());
    assert_eq!(TallyStore::open_with_key(storage, "tally_a").len(), 1);
}

// ============================================================================
// Batch Edge Cases
// ============================================================================

#[test]
fn undo_leaves_other_users_batches_untouched() {
    let roster: Vec<String> = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let mut ledger = BatchLedger::new(roster);

    for user in [1, 2, 1, 2] {
        ledger.save_selection(&[], Some(user)).unwrap();
    }
    let receipt = ledger.undo_last_batch(Some(1)).unwrap();

    assert_eq!(receipt.batch_number, 3);
    assert_eq!(receipt.removed, 3);
    assert!(ledger.entries().iter().all(|e| e.batch_number != 3));
    assert_eq!(ledger.last_batch_for(2), Some(4));
    assert_eq!(ledger.refresh_aggregate().summary.total_votes, 9);
}

#[test]
fn save_scenario_from_roster() {
    let roster: Vec<String> = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let mut ledger = BatchLedger::new(roster);
    ledger.save_selection(&[], Some(3)).unwrap();
    let n = ledger.max_batch_number().unwrap();

    let receipt = ledger.save_selection(&["B".to_string()], Some(1)).unwrap();

    assert_eq!(receipt.batch_number, n + 1);
    let batch: Vec<_> = ledger
        .entries()
        .iter()
        .filter(|e| e.batch_number == n + 1)
        .map(|e| (e.user_id, e.candidate_name.as_str(), e.vote_delta))
        .collect();
    assert_eq!(batch, vec![(1, "A", 1), (1, "C", 1)]);
}

#[test]
fn empty_roster_has_nothing_to_save() {
    let mut ledger = BatchLedger::new(Vec::new());
    assert_eq!(
        ledger.save_selection(&[], Some(1)),
        Err(Error::NothingToSave)
    );
}

#[test]
fn unknown_exclusions_are_ignored() {
    let mut ledger = BatchLedger::new(vec!["A".to_string()]);
    let receipt = ledger
        .save_selection(&["Z".to_string(), "a".to_string()], Some(1))
        .unwrap();
    assert_eq!(receipt.candidates, vec!["A"]);
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Adjust(String, i64),
    Remove(String),
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alice".to_string()),
        Just("Alice".to_string()),
        Just("BOB".to_string()),
        Just("bob".to_string()),
        Just("Chi".to_string()),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_name().prop_map(Op::Add),
        (arb_name(), -3i64..4).prop_map(|(n, d)| Op::Adjust(n, d)),
        arb_name().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_adds_count_distinct_names(names in prop::collection::vec(arb_name(), 0..40)) {
        let mut store = store();
        for name in &names {
            store.add(name).unwrap();
        }

        let mut distinct: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(store.len(), distinct.len());

        for record in store.records() {
            let expected = names.iter().filter(|n| record.matches(n)).count() as u64;
            prop_assert_eq!(record.votes, expected);
        }
    }

    #[test]
    fn prop_adjust_clamps(start in 0u64..20, delta in -30i64..30) {
        let stored = snapshot::to_json(&[VoteRecord::new("A", start)]).unwrap();
        let mut store = TallyStore::open(MemoryStore::with_entry(snapshot::STORAGE_KEY, stored));

        let expected = (start as i64 + delta).max(0) as u64;
        prop_assert_eq!(store.adjust("A", delta).value, Some(expected));
    }

    #[test]
    fn prop_aggregates_hold_after_any_sequence(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = store();
        for op in ops {
            match op {
                Op::Add(name) => { store.add(&name).unwrap(); }
                Op::Adjust(name, delta) => { store.adjust(&name, delta); }
                Op::Remove(name) => { store.remove(&name); }
            }
        }

        let records = store.records();
        let sum: u64 = records.iter().map(|r| r.votes).sum();
        prop_assert_eq!(summarize(records).total_votes, sum);
        prop_assert_eq!(summarize(records), summarize(records));

        let sorted = sorted_view(records);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].votes >= pair[1].votes);
            if pair[0].votes == pair[1].votes {
                let pos = |name: &str| records.iter().position(|r| r.name == name);
                prop_assert!(pos(&pair[0].name) < pos(&pair[1].name));
            }
        }
    }

    #[test]
    fn prop_snapshot_roundtrip(
        records in prop::collection::vec(("[a-zA-Z ]{1,12}", 0u64..1000), 0..20)
    ) {
        let records: Vec<VoteRecord> = records
            .into_iter()
            .map(|(name, votes)| VoteRecord::new(name, votes))
            .collect();

        let json = snapshot::to_json(&records).unwrap();
        prop_assert_eq!(snapshot::from_json(&json).unwrap(), records);
    }
}
