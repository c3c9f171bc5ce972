pub mod memory;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::engine::claims::ClaimOutcome;
use crate::errors::EngineError;
use crate::rules::{GeneratedTransaction, RecurringRule};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Transactional read/write boundary over rules and generated
/// transactions.
///
/// The processing claim is the sole cross-run synchronization primitive:
/// `try_claim` must be a single atomic compare-and-swap that re-checks
/// due-ness under the same transaction, and `commit_occurrence` must
/// persist the transaction row, the rule advancement, and the claim
/// clear as one unit. Implementations are expected to bound each
/// operation with a timeout and surface it as `StorageTimeout` rather
/// than hang a sweep.
pub trait RuleStore: Send + Sync {
    /// Rules with `active = true` and `next_due_date <= today`, within
    /// their end date.
    fn due_rules(&self, today: NaiveDate) -> Result<Vec<RecurringRule>>;

    fn rule(&self, id: Uuid) -> Result<Option<RecurringRule>>;

    fn insert_rule(&self, rule: RecurringRule) -> Result<()>;

    /// Applies a user edit. Must be rejected while a live processing
    /// claim is held so edits never interleave with generation.
    fn update_rule(
        &self,
        rule: RecurringRule,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<()>;

    /// Atomic conditional claim: succeeds only when the rule is still
    /// eligible at claim time and no live claim is held.
    fn try_claim(
        &self,
        rule_id: Uuid,
        token: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<ClaimOutcome>;

    /// Clears the claim given a matching token. A mismatched token is
    /// logged and left alone (another worker recovered the rule).
    fn release_claim(&self, rule_id: Uuid, token: Uuid) -> Result<()>;

    /// Dedup probe on `(group_id, occurrence_index)`.
    fn find_occurrence(
        &self,
        group_id: Uuid,
        occurrence_index: u32,
    ) -> Result<Option<GeneratedTransaction>>;

    fn transactions_for_group(&self, group_id: Uuid) -> Result<Vec<GeneratedTransaction>>;

    /// Persists the advanced rule, the new transaction (absent on the
    /// crash-recovery path), and the claim clear atomically. Fails when
    /// the holder token no longer matches.
    fn commit_occurrence(
        &self,
        rule: &RecurringRule,
        txn: Option<&GeneratedTransaction>,
        token: Uuid,
    ) -> Result<()>;
}

pub use memory::MemoryStore;
