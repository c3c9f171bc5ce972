use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::rules::{GeneratedTransaction, RecurringRule};
use crate::storage::{Result, RuleStore};

/// Outcome of one generation attempt under a held claim.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// A new transaction was written and the rule advanced.
    Generated(GeneratedTransaction),
    /// The occurrence already existed (crash between write and claim
    /// clear); the rule state was advanced without a second write.
    Recovered(GeneratedTransaction),
}

impl GenerationOutcome {
    pub fn transaction(&self) -> &GeneratedTransaction {
        match self {
            GenerationOutcome::Generated(txn) | GenerationOutcome::Recovered(txn) => txn,
        }
    }
}

/// Materializes the current due occurrence of a claimed rule and
/// advances the rule state, committing both atomically with the claim
/// clear. Only valid while `token` holds the rule's claim; on any
/// failure the claim is released before the error propagates so the
/// rule is never left stuck.
pub fn generate_occurrence(
    store: &dyn RuleStore,
    rule_id: Uuid,
    token: Uuid,
    now: DateTime<Utc>,
) -> Result<GenerationOutcome> {
    let rule = match store.rule(rule_id)? {
        Some(rule) => rule,
        None => return Err(release_on_error(store, rule_id, token, EngineError::RuleNotFound(rule_id))),
    };
    if !rule.active {
        return Err(release_on_error(store, rule_id, token, EngineError::RuleInactive(rule_id)));
    }

    let occurrence_index = rule.occurrences_generated;

    // Dedup probe on (group_id, occurrence_index): a row written by a
    // worker that crashed before clearing its claim must not be
    // generated a second time.
    if let Some(existing) = store.find_occurrence(rule.group_id, occurrence_index)? {
        warn!(
            rule_id = %rule_id,
            occurrence_index,
            "occurrence already generated, advancing rule state only"
        );
        let mut healed = rule.clone();
        if let Err(err) = advance_after_occurrence(&mut healed, now) {
            return Err(release_on_error(store, rule_id, token, err));
        }
        store.commit_occurrence(&healed, None, token)?;
        return Ok(GenerationOutcome::Recovered(existing));
    }

    let amount_minor = match occurrence_amount(&rule) {
        Ok(amount) => amount,
        Err(err) => return Err(release_on_error(store, rule_id, token, err)),
    };

    let txn = GeneratedTransaction::from_rule(&rule, occurrence_index, amount_minor, now);
    let mut advanced = rule.clone();
    if let Err(err) = advance_after_occurrence(&mut advanced, now) {
        return Err(release_on_error(store, rule_id, token, err));
    }

    store.commit_occurrence(&advanced, Some(&txn), token)?;
    debug!(
        rule_id = %rule_id,
        occurrence_index,
        date = %txn.date,
        amount = %crate::currency::format_minor(amount_minor, &txn.currency),
        "generated occurrence"
    );
    Ok(GenerationOutcome::Generated(txn))
}

/// Advances the rule past its current due occurrence: bumps counters,
/// computes the next due date, and deactivates on cap or end-date
/// termination.
fn advance_after_occurrence(rule: &mut RecurringRule, now: DateTime<Utc>) -> Result<()> {
    rule.occurrences_generated += 1;
    rule.first_occurrence_generated = true;
    rule.last_processed_at = Some(now);

    let next = rule.frequency.next_due_date(rule.next_due_date)?;
    rule.next_due_date = next;

    if let Some(cap) = rule.total_occurrences {
        if rule.occurrences_generated >= cap {
            rule.deactivate(now);
        }
    }
    if let Some(end) = rule.end_date {
        if next > end {
            rule.deactivate(now);
        }
    }
    rule.updated_at = now;
    Ok(())
}

/// Per-occurrence amount in minor units: the flat base amount, or the
/// installment share with the final occurrence absorbing the rounding
/// remainder so the series sums exactly to the total.
pub(crate) fn occurrence_amount(rule: &RecurringRule) -> Result<i64> {
    if !rule.is_installment {
        if rule.amount_minor <= 0 {
            return Err(EngineError::AmountComputation(format!(
                "rule {} has non-positive amount {}",
                rule.id, rule.amount_minor
            )));
        }
        return Ok(rule.amount_minor);
    }

    let total = rule.total_amount_minor.ok_or_else(|| {
        EngineError::AmountComputation(format!("installment rule {} has no total amount", rule.id))
    })?;
    let count = rule.total_occurrences.ok_or_else(|| {
        EngineError::AmountComputation(format!(
            "installment rule {} has no occurrence count",
            rule.id
        ))
    })?;
    if count == 0 {
        return Err(EngineError::AmountComputation(format!(
            "installment rule {} has a zero occurrence count",
            rule.id
        )));
    }

    let count = count as i64;
    let index = rule.occurrences_generated as i64;
    if index >= count {
        return Err(EngineError::AmountComputation(format!(
            "occurrence index {} exceeds installment count {} for rule {}",
            index, count, rule.id
        )));
    }

    let share = total.div_euclid(count);
    let amount = if index == count - 1 {
        total - share * (count - 1)
    } else {
        share
    };
    if amount <= 0 {
        return Err(EngineError::AmountComputation(format!(
            "computed non-positive installment amount {} for rule {}",
            amount, rule.id
        )));
    }
    Ok(amount)
}

fn release_on_error(
    store: &dyn RuleStore,
    rule_id: Uuid,
    token: Uuid,
    err: EngineError,
) -> EngineError {
    if let Err(release_err) = store.release_claim(rule_id, token) {
        warn!(rule_id = %rule_id, error = %release_err, "failed to release claim after error");
    }
    err
}
