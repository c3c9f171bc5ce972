use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::{fs, io::Write};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::{Result, RuleStore};
use crate::engine::claims::ClaimOutcome;
use crate::errors::EngineError;
use crate::rules::{ClaimState, GeneratedTransaction, RecurringRule};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    rules: HashMap<Uuid, RecurringRule>,
    transactions: Vec<GeneratedTransaction>,
}

/// In-memory reference implementation of [`RuleStore`] with real
/// compare-and-swap claim semantics, suitable for tests and embedding.
/// Snapshots can be persisted to JSON for inspection or seeding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::Storage("store mutex poisoned".into()))
    }

    /// Seeds a historical transaction row directly, bypassing the claim
    /// protocol. Intended for imports and for reconstructing crash
    /// states in tests.
    pub fn insert_transaction(&self, txn: GeneratedTransaction) -> Result<()> {
        let mut state = self.locked()?;
        if state
            .transactions
            .iter()
            .any(|existing| existing.dedup_key() == txn.dedup_key())
        {
            return Err(EngineError::Storage(format!(
                "occurrence {} of group {} already exists",
                txn.occurrence_index, txn.group_id
            )));
        }
        state.transactions.push(txn);
        Ok(())
    }

    pub fn rule_count(&self) -> Result<usize> {
        Ok(self.locked()?.rules.len())
    }

    pub fn transaction_count(&self) -> Result<usize> {
        Ok(self.locked()?.transactions.len())
    }

    /// Writes the full store state to disk atomically by staging to a
    /// temporary file.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let state = self.locked()?;
        let json = serde_json::to_string_pretty(&*state)?;
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Loads a snapshot previously written by [`MemoryStore::save_to_path`].
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let state: StoreState = serde_json::from_str(&data)?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }
}

impl RuleStore for MemoryStore {
    fn due_rules(&self, today: NaiveDate) -> Result<Vec<RecurringRule>> {
        let state = self.locked()?;
        let mut due: Vec<RecurringRule> = state
            .rules
            .values()
            .filter(|rule| rule.is_eligible(today))
            .cloned()
            .collect();
        due.sort_by_key(|rule| (rule.next_due_date, rule.id));
        Ok(due)
    }

    fn rule(&self, id: Uuid) -> Result<Option<RecurringRule>> {
        Ok(self.locked()?.rules.get(&id).cloned())
    }

    fn insert_rule(&self, rule: RecurringRule) -> Result<()> {
        rule.frequency.validate()?;
        let mut state = self.locked()?;
        if state.rules.contains_key(&rule.id) {
            return Err(EngineError::Storage(format!("rule {} already exists", rule.id)));
        }
        state.rules.insert(rule.id, rule);
        Ok(())
    }

    fn update_rule(
        &self,
        rule: RecurringRule,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<()> {
        rule.frequency.validate()?;
        let mut state = self.locked()?;
        let existing = state
            .rules
            .get(&rule.id)
            .ok_or(EngineError::RuleNotFound(rule.id))?;
        if existing.claim.is_live(now, stale_after) {
            return Err(EngineError::ClaimRejected(rule.id));
        }
        state.rules.insert(rule.id, rule);
        Ok(())
    }

    fn try_claim(
        &self,
        rule_id: Uuid,
        token: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ClaimOutcome> {
        let mut state = self.locked()?;
        let rule = state
            .rules
            .get_mut(&rule_id)
            .ok_or(EngineError::RuleNotFound(rule_id))?;
        // Due-ness is re-checked under the same lock to close the race
        // between selection and claim.
        if !rule.is_eligible(now.date_naive()) {
            return Ok(ClaimOutcome::NotDue);
        }
        if rule.claim.is_live(now, stale_after) {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        if rule.claim.is_expired(now, stale_after) {
            warn!(rule_id = %rule_id, "taking over stale processing claim");
        }
        rule.claim = ClaimState::ClaimedBy { token, since: now };
        rule.last_processed_at = Some(now);
        Ok(ClaimOutcome::Claimed)
    }

    fn release_claim(&self, rule_id: Uuid, token: Uuid) -> Result<()> {
        let mut state = self.locked()?;
        let rule = state
            .rules
            .get_mut(&rule_id)
            .ok_or(EngineError::RuleNotFound(rule_id))?;
        match rule.claim.holder() {
            Some(holder) if holder == token => {
                rule.claim = ClaimState::Unclaimed;
            }
            Some(_) => {
                warn!(rule_id = %rule_id, "release skipped, claim held by another token");
            }
            None => {}
        }
        Ok(())
    }

    fn find_occurrence(
        &self,
        group_id: Uuid,
        occurrence_index: u32,
    ) -> Result<Option<GeneratedTransaction>> {
        let state = self.locked()?;
        Ok(state
            .transactions
            .iter()
            .find(|txn| txn.group_id == group_id && txn.occurrence_index == occurrence_index)
            .cloned())
    }

    fn transactions_for_group(&self, group_id: Uuid) -> Result<Vec<GeneratedTransaction>> {
        let state = self.locked()?;
        let mut matched: Vec<GeneratedTransaction> = state
            .transactions
            .iter()
            .filter(|txn| txn.group_id == group_id)
            .cloned()
            .collect();
        matched.sort_by_key(|txn| txn.occurrence_index);
        Ok(matched)
    }

    fn commit_occurrence(
        &self,
        rule: &RecurringRule,
        txn: Option<&GeneratedTransaction>,
        token: Uuid,
    ) -> Result<()> {
        let mut state = self.locked()?;
        let stored = state
            .rules
            .get(&rule.id)
            .ok_or(EngineError::RuleNotFound(rule.id))?;
        if stored.claim.holder() != Some(token) {
            return Err(EngineError::Storage(format!(
                "commit for rule {} without a matching claim",
                rule.id
            )));
        }
        if let Some(txn) = txn {
            if state
                .transactions
                .iter()
                .any(|existing| existing.dedup_key() == txn.dedup_key())
            {
                return Err(EngineError::Storage(format!(
                    "occurrence {} of group {} already exists",
                    txn.occurrence_index, txn.group_id
                )));
            }
            state.transactions.push(txn.clone());
        }
        let mut updated = rule.clone();
        updated.claim = ClaimState::Unclaimed;
        state.rules.insert(updated.id, updated);
        Ok(())
    }
}
