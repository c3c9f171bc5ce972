use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::frequency::Frequency;

/// Processing claim held on a rule while one generation attempt is in
/// flight. A claim older than the stale threshold counts as abandoned
/// and may be taken over by the next sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ClaimState {
    #[default]
    Unclaimed,
    ClaimedBy {
        token: Uuid,
        since: DateTime<Utc>,
    },
}

impl ClaimState {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimState::ClaimedBy { .. })
    }

    /// True while a claim is held and has not yet gone stale.
    pub fn is_live(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        match self {
            ClaimState::Unclaimed => false,
            ClaimState::ClaimedBy { since, .. } => now - *since < stale_after,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        self.is_claimed() && !self.is_live(now, stale_after)
    }

    pub fn holder(&self) -> Option<Uuid> {
        match self {
            ClaimState::Unclaimed => None,
            ClaimState::ClaimedBy { token, .. } => Some(*token),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleKind {
    Expense,
    Income,
    Transfer,
}

/// Durable definition of a repeating financial event.
///
/// `next_due_date` is the authoritative "when to fire next"; the
/// generator is the only engine component that advances it. Amounts are
/// stored in currency minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount_minor: Option<i64>,
    pub currency: String,
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_occurrences: Option<u32>,
    #[serde(default)]
    pub occurrences_generated: u32,
    #[serde(default)]
    pub is_installment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claim: ClaimState,
    #[serde(default)]
    pub first_occurrence_generated: bool,
    /// Stable id shared by every transaction this rule spawns, used for
    /// grouping, cancellation, and occurrence deduplication.
    pub group_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringRule {
    pub fn new(
        user_id: Uuid,
        description: impl Into<String>,
        kind: RuleKind,
        amount_minor: i64,
        start_date: NaiveDate,
        frequency: Frequency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            description: description.into(),
            amount_minor,
            total_amount_minor: None,
            currency: "USD".into(),
            kind,
            category_id: None,
            goal_id: None,
            account_id: None,
            start_date,
            frequency,
            next_due_date: start_date,
            end_date: None,
            total_occurrences: None,
            occurrences_generated: 0,
            is_installment: false,
            last_processed_at: None,
            claim: ClaimState::Unclaimed,
            first_occurrence_generated: false,
            group_id: Uuid::new_v4(),
            external_ref: None,
            active: true,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_currency(mut self, code: impl Into<String>) -> Self {
        self.currency = code.into();
        self
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_goal(mut self, goal_id: Uuid) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_total_occurrences(mut self, total: u32) -> Self {
        self.total_occurrences = Some(total);
        self
    }

    /// Marks the rule as an installment plan: `total_amount_minor` is
    /// split evenly across `total_occurrences`, the final occurrence
    /// absorbing the rounding remainder.
    pub fn with_installment(mut self, total_amount_minor: i64, total_occurrences: u32) -> Self {
        self.is_installment = true;
        self.total_amount_minor = Some(total_amount_minor);
        self.total_occurrences = Some(total_occurrences);
        self
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_due_date <= today
    }

    /// A rule is eligible for processing iff it is active, due, and not
    /// scheduled past its end date.
    pub fn is_eligible(&self, today: NaiveDate) -> bool {
        self.active
            && self.is_due(today)
            && self.end_date.map_or(true, |end| self.next_due_date <= end)
    }

    pub fn remaining_occurrences(&self) -> Option<u32> {
        self.total_occurrences
            .map(|total| total.saturating_sub(self.occurrences_generated))
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }
}
