use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rule::{RecurringRule, RuleKind};

/// Immutable record produced by one rule occurrence.
///
/// The transaction is dated at the occurrence's due date rather than the
/// generation time, which keeps backfilled and late runs historically
/// accurate. `(group_id, occurrence_index)` is the deduplication key used
/// to detect an already-generated occurrence after a crash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedTransaction {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub occurrence_index: u32,
    pub kind: RuleKind,
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GeneratedTransaction {
    /// Materializes the occurrence at `rule.next_due_date` for the given
    /// index and amount.
    pub fn from_rule(
        rule: &RecurringRule,
        occurrence_index: u32,
        amount_minor: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule.id,
            user_id: rule.user_id,
            group_id: rule.group_id,
            occurrence_index,
            kind: rule.kind,
            amount_minor,
            currency: rule.currency.clone(),
            description: rule.description.clone(),
            category_id: rule.category_id,
            goal_id: rule.goal_id,
            account_id: rule.account_id,
            date: rule.next_due_date,
            external_ref: rule.external_ref.clone(),
            created_at,
        }
    }

    pub fn dedup_key(&self) -> (Uuid, u32) {
        (self.group_id, self.occurrence_index)
    }

    /// True when the occurrence feeds a savings goal instead of a plain
    /// expense or income posting.
    pub fn is_goal_contribution(&self) -> bool {
        self.goal_id.is_some()
    }
}
