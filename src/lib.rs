#![doc(test(attr(deny(warnings))))]

//! Recurring Core implements the batch engine that turns user-defined
//! recurring financial rules into concrete transactions: calendar
//! arithmetic, claim-based idempotent generation, sweep orchestration,
//! and execution tracking.

pub mod config;
pub mod currency;
pub mod engine;
pub mod errors;
pub mod jobs;
pub mod rules;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Recurring Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
