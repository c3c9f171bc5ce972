#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use recurring_core::rules::{Frequency, FrequencyKind, RecurringRule, RuleKind};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at_noon(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

pub fn monthly_expense(description: &str, amount_minor: i64, start: NaiveDate) -> RecurringRule {
    RecurringRule::new(
        Uuid::new_v4(),
        description,
        RuleKind::Expense,
        amount_minor,
        start,
        Frequency::new(FrequencyKind::Monthly, 1),
    )
    .with_currency("EUR")
}

pub fn daily_expense(description: &str, amount_minor: i64, start: NaiveDate) -> RecurringRule {
    RecurringRule::new(
        Uuid::new_v4(),
        description,
        RuleKind::Expense,
        amount_minor,
        start,
        Frequency::new(FrequencyKind::Daily, 1),
    )
    .with_currency("EUR")
}
