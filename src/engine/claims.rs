use chrono::Duration;
use once_cell::sync::Lazy;

/// Claims held longer than this are treated as abandoned by a crashed
/// worker and may be taken over on the next sweep.
pub static DEFAULT_STALE_CLAIM: Lazy<Duration> = Lazy::new(|| Duration::minutes(10));

/// Result of one atomic claim attempt on a rule.
///
/// `AlreadyClaimed` is the expected outcome of two overlapping sweeps
/// racing for the same rule and is treated as a skip, never a failure.
/// `NotDue` closes the race between selection and claim: the rule was
/// due when queried but no longer is at claim time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyClaimed,
    NotDue,
}
