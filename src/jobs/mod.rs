//! Execution tracking for engine runs: running jobs, bounded history,
//! and aggregate stats for the observability boundary.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

/// Record of one orchestrator run or sub-task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobExecution {
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Aggregate stats derived purely from history at query time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub avg_duration_ms: f64,
    pub last_execution: Option<JobExecution>,
}

/// Read-only view for dashboards and health checks.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub running: Vec<JobExecution>,
    pub recent: Vec<JobExecution>,
    pub stats: JobStats,
}

#[derive(Debug, Default)]
struct TrackerInner {
    running: HashMap<Uuid, JobExecution>,
    history: VecDeque<JobExecution>,
}

/// Injectable execution tracker. History is an in-memory operational
/// aid bounded by `capacity` (oldest evicted); the durable audit trail
/// is the set of generated transactions, not this ring.
#[derive(Debug)]
pub struct JobTracker {
    capacity: usize,
    inner: Mutex<TrackerInner>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JobTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(TrackerInner::default()),
        }
    }

    fn locked(&self) -> MutexGuard<'_, TrackerInner> {
        // Observability must never crash the scheduler; a poisoned lock
        // still holds usable state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a new running execution and returns its id.
    pub fn start(&self, job_name: &str) -> Uuid {
        let execution = JobExecution {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            status: JobStatus::Running,
            result: None,
            error: None,
        };
        let id = execution.id;
        self.locked().running.insert(id, execution);
        id
    }

    /// Finalizes an execution as completed with a result payload.
    pub fn complete(&self, execution_id: Uuid, result: Value) {
        self.finalize(execution_id, JobStatus::Completed, Some(result), None);
    }

    /// Finalizes an execution as failed with an error message.
    pub fn fail(&self, execution_id: Uuid, error: impl Into<String>) {
        self.finalize(execution_id, JobStatus::Failed, None, Some(error.into()));
    }

    fn finalize(
        &self,
        execution_id: Uuid,
        status: JobStatus,
        result: Option<Value>,
        error: Option<String>,
    ) {
        let mut inner = self.locked();
        let Some(mut execution) = inner.running.remove(&execution_id) else {
            warn!(%execution_id, "finalize for unknown execution ignored");
            return;
        };
        execution.finished_at = Some(Utc::now());
        execution.status = status;
        execution.result = result;
        execution.error = error;
        inner.history.push_back(execution);
        while inner.history.len() > self.capacity {
            inner.history.pop_front();
        }
    }

    pub fn running_jobs(&self) -> Vec<JobExecution> {
        let inner = self.locked();
        let mut running: Vec<JobExecution> = inner.running.values().cloned().collect();
        running.sort_by_key(|execution| execution.started_at);
        running
    }

    /// Finished executions, most recent first, optionally filtered by
    /// job name.
    pub fn history(&self, job_name: Option<&str>, limit: usize) -> Vec<JobExecution> {
        let inner = self.locked();
        inner
            .history
            .iter()
            .rev()
            .filter(|execution| job_name.map_or(true, |name| execution.job_name == name))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Stats over the retained history, optionally filtered by job name.
    pub fn stats(&self, job_name: Option<&str>) -> JobStats {
        let inner = self.locked();
        let mut stats = JobStats::default();
        let mut duration_total = 0i64;
        let mut duration_count = 0usize;

        for execution in inner
            .history
            .iter()
            .filter(|execution| job_name.map_or(true, |name| execution.job_name == name))
        {
            stats.total += 1;
            match execution.status {
                JobStatus::Completed => stats.succeeded += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Running => {}
            }
            if let Some(duration) = execution.duration_ms() {
                duration_total += duration;
                duration_count += 1;
            }
            stats.last_execution = Some(execution.clone());
        }
        if duration_count > 0 {
            stats.avg_duration_ms = duration_total as f64 / duration_count as f64;
        }
        stats
    }

    /// Combined running/recent/stats view for the observability
    /// boundary.
    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            running: self.running_jobs(),
            recent: self.history(None, 20),
            stats: self.stats(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_and_complete_round_trip() {
        let tracker = JobTracker::new(10);
        let id = tracker.start("nightly_sweep");
        assert_eq!(tracker.running_jobs().len(), 1);

        tracker.complete(id, json!({"processed": 3}));
        assert!(tracker.running_jobs().is_empty());

        let history = tracker.history(None, 10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, JobStatus::Completed);
        assert!(history[0].duration_ms().unwrap() >= 0);
    }

    #[test]
    fn finalize_unknown_id_is_ignored() {
        let tracker = JobTracker::new(10);
        tracker.complete(Uuid::new_v4(), json!({}));
        tracker.fail(Uuid::new_v4(), "boom");
        assert!(tracker.history(None, 10).is_empty());
    }

    #[test]
    fn stats_split_success_and_failure() {
        let tracker = JobTracker::new(10);
        let first = tracker.start("sync");
        tracker.complete(first, json!({}));
        let second = tracker.start("sync");
        tracker.fail(second, "storage timeout");

        let stats = tracker.stats(Some("sync"));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert!(stats.avg_duration_ms >= 0.0);
        assert_eq!(
            stats.last_execution.map(|execution| execution.status),
            Some(JobStatus::Failed)
        );
    }
}
