//! Batch engine: claim guard, occurrence generator, and sweep
//! orchestrator.

pub mod claims;
pub mod generator;
pub mod sweep;

pub use claims::{ClaimOutcome, DEFAULT_STALE_CLAIM};
pub use generator::{generate_occurrence, GenerationOutcome};
pub use sweep::{SweepEngine, SweepFailure, SweepResult, SWEEP_JOB_NAME};
