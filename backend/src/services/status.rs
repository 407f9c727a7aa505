use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receives human-readable progress of a sync run. Fire-and-forget.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str);
    fn notify_complete(&self);
    fn notify_failed(&self, error: &str) {
        self.notify(&format!("Failed: {error}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub run_id: String,
    pub link: String,
    pub state: RunState,
    pub messages: Vec<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_RUN_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// In-memory record of the runs started by this process. Finished runs are dropped
/// once they are older than the retention period; running ones are always kept.
pub struct RunRegistry {
    runs: Mutex<HashMap<String, RunStatus>>,
    next_id: AtomicU64,
    retention: Duration,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RUN_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        RunRegistry {
            runs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            retention,
        }
    }

    pub fn start_run(&self, link: &str) -> String {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let run_id = format!("{}_{sequence}", now.timestamp());
        if let Ok(mut runs) = self.runs.lock() {
            Self::evict_expired(&mut runs, now, self.retention);
            runs.insert(
                run_id.clone(),
                RunStatus {
                    run_id: run_id.clone(),
                    link: link.to_string(),
                    state: RunState::Running,
                    messages: Vec::new(),
                    error: None,
                    started_at: now,
                    finished_at: None,
                },
            );
        }
        run_id
    }

    fn evict_expired(runs: &mut HashMap<String, RunStatus>, now: DateTime<Utc>, retention: Duration) {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return;
        };
        let before = runs.len();
        runs.retain(|_, run| match run.finished_at {
            Some(finished) => finished + retention > now,
            None => true,
        });
        let evicted = before - runs.len();
        if evicted > 0 {
            debug!("Evicted {evicted} finished runs");
        }
    }

    pub fn get(&self, run_id: &str) -> Option<RunStatus> {
        self.runs.lock().ok()?.get(run_id).cloned()
    }

    fn update(&self, run_id: &str, apply: impl FnOnce(&mut RunStatus)) {
        if let Ok(mut runs) = self.runs.lock() {
            if let Some(run) = runs.get_mut(run_id) {
                apply(run);
            }
        }
    }

    pub fn push_message(&self, run_id: &str, message: &str) {
        self.update(run_id, |run| run.messages.push(message.to_string()));
    }

    pub fn mark_completed(&self, run_id: &str) {
        self.update(run_id, |run| {
            run.state = RunState::Complete;
            run.finished_at = Some(Utc::now());
        });
    }

    pub fn mark_failed(&self, run_id: &str, error_message: &str) {
        self.update(run_id, |run| {
            run.state = RunState::Failed;
            run.error = Some(error_message.to_string());
            run.finished_at = Some(Utc::now());
        });
    }
}

/// Status sink feeding one run's entry in a [`RunRegistry`].
pub struct RunReporter {
    registry: Arc<RunRegistry>,
    run_id: String,
}

impl RunReporter {
    pub fn new(registry: Arc<RunRegistry>, run_id: impl Into<String>) -> Self {
        RunReporter {
            registry,
            run_id: run_id.into(),
        }
    }
}

impl StatusSink for RunReporter {
    fn notify(&self, message: &str) {
        info!("[{}] {message}", self.run_id);
        self.registry.push_message(&self.run_id, message);
    }

    fn notify_complete(&self) {
        info!("[{}] Run complete.", self.run_id);
        self.registry.mark_completed(&self.run_id);
    }

    fn notify_failed(&self, error_message: &str) {
        error!("[{}] Run failed: {error_message}", self.run_id);
        self.registry.mark_failed(&self.run_id, error_message);
    }
}
