use recurring_core::jobs::{JobStatus, JobTracker};
use serde_json::json;
use uuid::Uuid;

#[test]
fn history_is_bounded_and_most_recent_first() {
    let tracker = JobTracker::new(5);
    for index in 0..8 {
        let id = tracker.start(&format!("job-{}", index));
        tracker.complete(id, json!({ "index": index }));
    }

    let history = tracker.history(None, 50);
    assert_eq!(history.len(), 5, "oldest entries are evicted past capacity");
    let names: Vec<_> = history.iter().map(|execution| execution.job_name.clone()).collect();
    assert_eq!(names, vec!["job-7", "job-6", "job-5", "job-4", "job-3"]);
}

#[test]
fn history_limit_and_name_filter_apply() {
    let tracker = JobTracker::new(20);
    for _ in 0..3 {
        let id = tracker.start("sweep");
        tracker.complete(id, json!({}));
    }
    let id = tracker.start("cleanup");
    tracker.fail(id, "disk full");

    assert_eq!(tracker.history(Some("sweep"), 10).len(), 3);
    assert_eq!(tracker.history(Some("sweep"), 2).len(), 2);
    assert_eq!(tracker.history(Some("cleanup"), 10).len(), 1);
    assert_eq!(tracker.history(None, 10).len(), 4);
}

#[test]
fn running_jobs_are_visible_until_finalized() {
    let tracker = JobTracker::new(10);
    let id = tracker.start("long-sweep");

    let running = tracker.running_jobs();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].status, JobStatus::Running);
    assert!(running[0].duration_ms().is_none());

    tracker.complete(id, json!({"processed": 12}));
    assert!(tracker.running_jobs().is_empty());
}

#[test]
fn stats_are_derived_from_history() {
    let tracker = JobTracker::new(10);
    for _ in 0..2 {
        let id = tracker.start("sweep");
        tracker.complete(id, json!({}));
    }
    let id = tracker.start("sweep");
    tracker.fail(id, "storage timeout: due rule query");

    let stats = tracker.stats(Some("sweep"));
    assert_eq!(stats.total, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);
    assert!(stats.avg_duration_ms >= 0.0);

    let last = stats.last_execution.expect("history is non-empty");
    assert_eq!(last.status, JobStatus::Failed);
    assert_eq!(last.error.as_deref(), Some("storage timeout: due rule query"));
}

#[test]
fn unknown_execution_ids_never_panic() {
    let tracker = JobTracker::new(10);
    tracker.complete(Uuid::new_v4(), json!({}));
    tracker.fail(Uuid::new_v4(), "never started");
    assert!(tracker.history(None, 10).is_empty());
    assert_eq!(tracker.stats(None).total, 0);
}

#[test]
fn status_combines_running_history_and_stats() {
    let tracker = JobTracker::new(10);
    let finished = tracker.start("sweep");
    tracker.complete(finished, json!({}));
    let _running = tracker.start("sweep");

    let status = tracker.status();
    assert_eq!(status.running.len(), 1);
    assert_eq!(status.recent.len(), 1);
    assert_eq!(status.stats.total, 1);
}
