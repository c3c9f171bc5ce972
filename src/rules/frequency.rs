use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrequencyKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Describes how often a rule fires and which calendar anchor it keeps.
///
/// `anchor_weekday` (0 = Monday .. 6 = Sunday) applies to weekly rules
/// only; `anchor_day` (1..=31) applies to monthly and yearly rules only
/// and is clipped to the landing month's length on every advance, so a
/// day-31 rule stays on the last day of short months instead of drifting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frequency {
    pub kind: FrequencyKind,
    pub every: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_weekday: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_day: Option<u32>,
}

impl Frequency {
    pub fn new(kind: FrequencyKind, every: u32) -> Self {
        Self {
            kind,
            every,
            anchor_weekday: None,
            anchor_day: None,
        }
    }

    pub fn with_anchor_weekday(mut self, weekday: u32) -> Self {
        self.anchor_weekday = Some(weekday);
        self
    }

    pub fn with_anchor_day(mut self, day: u32) -> Self {
        self.anchor_day = Some(day);
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.every < 1 {
            return Err(EngineError::InvalidFrequencyConfig(
                "interval must be at least 1".into(),
            ));
        }
        if let Some(weekday) = self.anchor_weekday {
            if self.kind != FrequencyKind::Weekly {
                return Err(EngineError::InvalidFrequencyConfig(format!(
                    "anchor weekday is only valid for weekly rules, found {:?}",
                    self.kind
                )));
            }
            if weekday > 6 {
                return Err(EngineError::InvalidFrequencyConfig(format!(
                    "anchor weekday {} is out of range 0..=6",
                    weekday
                )));
            }
        }
        if let Some(day) = self.anchor_day {
            if !matches!(self.kind, FrequencyKind::Monthly | FrequencyKind::Yearly) {
                return Err(EngineError::InvalidFrequencyConfig(format!(
                    "anchor day is only valid for monthly or yearly rules, found {:?}",
                    self.kind
                )));
            }
            if !(1..=31).contains(&day) {
                return Err(EngineError::InvalidFrequencyConfig(format!(
                    "anchor day {} is out of range 1..=31",
                    day
                )));
            }
        }
        Ok(())
    }

    /// Computes the due date that follows `current`. Pure calendar
    /// arithmetic, no I/O.
    pub fn next_due_date(&self, current: NaiveDate) -> Result<NaiveDate, EngineError> {
        self.validate()?;
        let next = match self.kind {
            FrequencyKind::Daily => current + Duration::days(self.every as i64),
            FrequencyKind::Weekly => {
                let mut next = current + Duration::weeks(self.every as i64);
                if let Some(anchor) = self.anchor_weekday {
                    // The anchor takes precedence over naive addition.
                    let landed = next.weekday().num_days_from_monday();
                    let roll = (anchor + 7 - landed) % 7;
                    next += Duration::days(roll as i64);
                }
                next
            }
            FrequencyKind::Monthly => shift_month(current, self.every as i32, self.anchor_day),
            FrequencyKind::Yearly => {
                shift_month(current, self.every as i32 * 12, self.anchor_day)
            }
        };
        Ok(next)
    }

    pub fn label(&self) -> String {
        match (self.every, self.kind) {
            (1, FrequencyKind::Daily) => "Daily".into(),
            (1, FrequencyKind::Weekly) => "Weekly".into(),
            (1, FrequencyKind::Monthly) => "Monthly".into(),
            (1, FrequencyKind::Yearly) => "Yearly".into(),
            (n, kind) => format!("Every {} {}{}", n, kind_unit(kind), if n > 1 { "s" } else { "" }),
        }
    }
}

fn kind_unit(kind: FrequencyKind) -> &'static str {
    match kind {
        FrequencyKind::Daily => "Day",
        FrequencyKind::Weekly => "Week",
        FrequencyKind::Monthly => "Month",
        FrequencyKind::Yearly => "Year",
    }
}

fn shift_month(date: NaiveDate, months: i32, anchor_day: Option<u32>) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let target = anchor_day.unwrap_or(date.day());
    let day = target.min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap());
    let last_current = first_next - Duration::days(1);
    last_current.day()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_adds_interval_days() {
        let freq = Frequency::new(FrequencyKind::Daily, 3);
        assert_eq!(freq.next_due_date(date(2025, 1, 30)).unwrap(), date(2025, 2, 2));
    }

    #[test]
    fn weekly_without_anchor_adds_whole_weeks() {
        let freq = Frequency::new(FrequencyKind::Weekly, 2);
        assert_eq!(freq.next_due_date(date(2025, 1, 1)).unwrap(), date(2025, 1, 15));
    }

    #[test]
    fn weekly_anchor_rolls_forward_to_weekday() {
        // 2025-01-01 is a Wednesday; anchor 0 is Monday.
        let freq = Frequency::new(FrequencyKind::Weekly, 1).with_anchor_weekday(0);
        assert_eq!(freq.next_due_date(date(2025, 1, 1)).unwrap(), date(2025, 1, 13));
    }

    #[test]
    fn weekly_anchor_matching_weekday_is_untouched() {
        // 2025-01-06 is a Monday.
        let freq = Frequency::new(FrequencyKind::Weekly, 1).with_anchor_weekday(0);
        assert_eq!(freq.next_due_date(date(2025, 1, 6)).unwrap(), date(2025, 1, 13));
    }

    #[test]
    fn monthly_anchor_clips_to_short_months() {
        let freq = Frequency::new(FrequencyKind::Monthly, 1).with_anchor_day(31);
        let mut due = date(2024, 1, 31);
        let expected = [
            date(2024, 2, 29),
            date(2024, 3, 31),
            date(2024, 4, 30),
            date(2024, 5, 31),
            date(2024, 6, 30),
        ];
        for want in expected {
            due = freq.next_due_date(due).unwrap();
            assert_eq!(due, want);
        }
    }

    #[test]
    fn monthly_without_anchor_keeps_current_day() {
        let freq = Frequency::new(FrequencyKind::Monthly, 2);
        assert_eq!(freq.next_due_date(date(2025, 3, 15)).unwrap(), date(2025, 5, 15));
    }

    #[test]
    fn yearly_anchor_survives_leap_february() {
        let freq = Frequency::new(FrequencyKind::Yearly, 1).with_anchor_day(29);
        let mut due = date(2024, 2, 29);
        due = freq.next_due_date(due).unwrap();
        assert_eq!(due, date(2025, 2, 28));
        due = freq.next_due_date(due).unwrap();
        assert_eq!(due, date(2026, 2, 28));
        due = freq.next_due_date(due).unwrap();
        assert_eq!(due, date(2027, 2, 28));
        due = freq.next_due_date(due).unwrap();
        assert_eq!(due, date(2028, 2, 29));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let freq = Frequency::new(FrequencyKind::Daily, 0);
        let err = freq.next_due_date(date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFrequencyConfig(_)));
    }

    #[test]
    fn anchors_are_rejected_for_wrong_kinds() {
        let weekday_on_monthly = Frequency::new(FrequencyKind::Monthly, 1).with_anchor_weekday(2);
        assert!(matches!(
            weekday_on_monthly.validate(),
            Err(EngineError::InvalidFrequencyConfig(_))
        ));

        let day_on_daily = Frequency::new(FrequencyKind::Daily, 1).with_anchor_day(15);
        assert!(matches!(
            day_on_daily.validate(),
            Err(EngineError::InvalidFrequencyConfig(_))
        ));

        let weekday_out_of_range = Frequency::new(FrequencyKind::Weekly, 1).with_anchor_weekday(7);
        assert!(matches!(
            weekday_out_of_range.validate(),
            Err(EngineError::InvalidFrequencyConfig(_))
        ));

        let day_out_of_range = Frequency::new(FrequencyKind::Monthly, 1).with_anchor_day(32);
        assert!(matches!(
            day_out_of_range.validate(),
            Err(EngineError::InvalidFrequencyConfig(_))
        ));
    }
}
