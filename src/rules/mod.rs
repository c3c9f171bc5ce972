//! Recurring rule domain models and calendar arithmetic.

pub mod frequency;
pub mod rule;
pub mod transaction;

pub use frequency::{Frequency, FrequencyKind};
pub use rule::{ClaimState, RecurringRule, RuleKind};
pub use transaction::GeneratedTransaction;
