mod common;

use std::sync::Arc;

use common::{at_noon, date, monthly_expense};
use recurring_core::config::EngineConfig;
use recurring_core::engine::SweepEngine;
use recurring_core::jobs::JobTracker;
use recurring_core::storage::{MemoryStore, RuleStore};
use tempfile::tempdir;

#[test]
fn config_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");

    let mut config = EngineConfig::default();
    config.stale_claim_minutes = 30;
    config.default_currency = "EUR".into();
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded.stale_claim_minutes, 30);
    assert_eq!(loaded.default_currency, "EUR");
    assert_eq!(loaded.history_capacity, config.history_capacity);
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let loaded = EngineConfig::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded.stale_claim_minutes, 10);
}

#[test]
fn store_snapshot_round_trips_rules_and_transactions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");

    let store = Arc::new(MemoryStore::new());
    let tracker = Arc::new(JobTracker::new(10));
    let engine = SweepEngine::new(store.clone(), tracker, EngineConfig::default());

    let today = date(2025, 6, 1);
    let rule = monthly_expense("Rent", 80000, today);
    let rule_id = rule.id;
    let group_id = rule.group_id;
    store.insert_rule(rule).unwrap();
    engine.run_sweep(at_noon(today)).unwrap();

    store.save_to_path(&path).unwrap();
    let restored = MemoryStore::load_from_path(&path).unwrap();

    assert_eq!(restored.rule_count().unwrap(), 1);
    assert_eq!(restored.transaction_count().unwrap(), 1);

    let stored = restored.rule(rule_id).unwrap().unwrap();
    assert_eq!(stored.next_due_date, date(2025, 7, 1));
    assert_eq!(stored.occurrences_generated, 1);

    let generated = restored.transactions_for_group(group_id).unwrap();
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].date, today);
}
