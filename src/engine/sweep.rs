use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::claims::ClaimOutcome;
use super::generator::generate_occurrence;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::jobs::JobTracker;
use crate::storage::{Result, RuleStore};

pub const SWEEP_JOB_NAME: &str = "recurring_sweep";

/// Per-rule failure captured without aborting the sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub rule_id: Uuid,
    pub error: String,
    /// Data errors that should reach an operator rather than wait for
    /// the next scheduled retry.
    pub needs_alert: bool,
}

/// Aggregate outcome of one sweep over the due-rule set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepResult {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub occurrences_generated: usize,
    pub errors: Vec<SweepFailure>,
}

/// Iterates the currently-due rules, claiming and generating each one
/// independently, and records the run through the injected
/// [`JobTracker`].
pub struct SweepEngine {
    store: Arc<dyn RuleStore>,
    tracker: Arc<JobTracker>,
    config: EngineConfig,
}

impl SweepEngine {
    pub fn new(store: Arc<dyn RuleStore>, tracker: Arc<JobTracker>, config: EngineConfig) -> Self {
        Self {
            store,
            tracker,
            config,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Runs one full pass over the rules due on or before `now`.
    ///
    /// Failure of one rule never aborts the sweep for others; a failure
    /// to query the due-rule set at all fails the whole execution.
    pub fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepResult> {
        let execution_id = self.tracker.start(SWEEP_JOB_NAME);
        let today = now.date_naive();

        let due = match self.store.due_rules(today) {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "failed to query due rules, aborting sweep");
                self.tracker.fail(execution_id, err.to_string());
                return Err(err);
            }
        };

        info!(due = due.len(), %today, "sweep started");
        let run_token = Uuid::new_v4();
        let mut result = SweepResult::default();

        for rule in &due {
            self.process_rule(rule.id, run_token, now, &mut result);
        }

        info!(
            processed = result.processed,
            skipped = result.skipped,
            failed = result.failed,
            occurrences = result.occurrences_generated,
            "sweep finished"
        );
        self.tracker.complete(
            execution_id,
            json!({
                "processed": result.processed,
                "skipped": result.skipped,
                "failed": result.failed,
                "occurrences_generated": result.occurrences_generated,
            }),
        );
        Ok(result)
    }

    /// Claims and generates every occurrence the rule currently owes.
    /// A rule several periods behind is caught up within one sweep,
    /// bounded by `max_catchup_per_rule`, so its due date ends in the
    /// future.
    fn process_rule(
        &self,
        rule_id: Uuid,
        run_token: Uuid,
        now: DateTime<Utc>,
        result: &mut SweepResult,
    ) {
        let stale_after = self.config.stale_claim_after();
        let mut generated = 0usize;

        for _ in 0..self.config.max_catchup_per_rule {
            let outcome = match self.store.try_claim(rule_id, run_token, now, stale_after) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.record_failure(rule_id, err, result);
                    break;
                }
            };
            match outcome {
                ClaimOutcome::NotDue | ClaimOutcome::AlreadyClaimed => {
                    if generated == 0 {
                        result.skipped += 1;
                    }
                    break;
                }
                ClaimOutcome::Claimed => {
                    match generate_occurrence(self.store.as_ref(), rule_id, run_token, now) {
                        Ok(_) => generated += 1,
                        Err(err) => {
                            self.record_failure(rule_id, err, result);
                            break;
                        }
                    }
                }
            }
        }

        if generated > 0 {
            result.processed += 1;
            result.occurrences_generated += generated;
            if generated as u32 >= self.config.max_catchup_per_rule {
                warn!(
                    rule_id = %rule_id,
                    generated,
                    "catch-up bound reached, rule stays due for the next sweep"
                );
            }
        }
    }

    fn record_failure(&self, rule_id: Uuid, err: EngineError, result: &mut SweepResult) {
        warn!(rule_id = %rule_id, error = %err, "rule processing failed");
        result.failed += 1;
        result.errors.push(SweepFailure {
            rule_id,
            error: err.to_string(),
            needs_alert: err.needs_alert(),
        });
    }
}
