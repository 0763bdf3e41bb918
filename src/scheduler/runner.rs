//! Reminder scheduler background loop.
//!
//! Holds pending [`ReminderJob`]s ordered by fire time and checks for due
//! jobs on a fixed tick. Each due job is removed under the lock before it
//! runs, so a registration fires at most once. Pending jobs can optionally be
//! persisted to a JSON state file and reloaded at startup.

use crate::chat::types::{ChatId, OutboundMessage};
use crate::clock::Clock;
use crate::error::{BotError, Result};
use crate::scheduler::reminder::{ReminderJob, ReminderPeriod};
use crate::task::{TaskId, TaskStore, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default interval between scheduler ticks.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

type JobKey = (DateTime<Utc>, Uuid);

/// How a fired reminder was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// The task was found and its title delivered.
    Delivered { title: String },
    /// The task no longer exists for its owner.
    TaskMissing,
    /// The store could not be read; the reminder is not retried.
    StoreFailed(String),
}

/// A job that fired during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredReminder {
    pub job: ReminderJob,
    pub outcome: ReminderOutcome,
}

/// Persisted scheduler state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SchedulerState {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    jobs: Vec<ReminderJob>,
}

fn default_state_version() -> u8 {
    1
}

/// One-shot reminder scheduler.
///
/// Cheap to clone; clones share the same job set.
#[derive(Clone)]
pub struct ReminderScheduler {
    jobs: Arc<Mutex<BTreeMap<JobKey, ReminderJob>>>,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    outbox: mpsc::UnboundedSender<OutboundMessage>,
    state_path: Option<PathBuf>,
    tick_interval: Duration,
}

impl ReminderScheduler {
    /// Create a scheduler that reads tasks from `store` and delivers
    /// reminders into `outbox`.
    pub fn new(
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        outbox: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(BTreeMap::new())),
            store,
            clock,
            outbox,
            state_path: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Persist pending jobs to `path` after every change.
    pub fn with_state_path(mut self, path: PathBuf) -> Self {
        self.state_path = Some(path);
        self
    }

    /// Override the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<JobKey, ReminderJob>> {
        // The map stays structurally valid even if a holder panicked.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job firing at `fire_at`. Repeated calls for the same task
    /// register independent jobs.
    pub fn schedule(
        &self,
        chat: ChatId,
        owner: UserId,
        task_id: TaskId,
        fire_at: DateTime<Utc>,
    ) -> ReminderJob {
        let job = ReminderJob::new(chat, owner, task_id, fire_at);
        {
            let mut jobs = self.lock();
            jobs.insert((job.fire_at, job.id), job.clone());
            self.persist(&jobs);
        }
        info!(
            "reminder {} scheduled for task {} at {}",
            job.id, job.task_id, job.fire_at
        );
        job
    }

    /// Register a job firing `period` from now.
    pub fn schedule_in(
        &self,
        chat: ChatId,
        owner: UserId,
        task_id: TaskId,
        period: ReminderPeriod,
    ) -> ReminderJob {
        let fire_at = self.clock.now() + period.duration();
        self.schedule(chat, owner, task_id, fire_at)
    }

    /// Pending jobs ordered by fire time.
    #[must_use]
    pub fn pending(&self) -> Vec<ReminderJob> {
        self.lock().values().cloned().collect()
    }

    /// Fire every job due at the clock's current time.
    pub fn fire_due(&self) -> Vec<FiredReminder> {
        let now = self.clock.now();
        let due: Vec<ReminderJob> = {
            let mut jobs = self.lock();
            let keys: Vec<JobKey> = jobs
                .iter()
                .take_while(|(_, job)| job.is_due(now))
                .map(|(key, _)| *key)
                .collect();
            let due: Vec<ReminderJob> = keys.iter().filter_map(|k| jobs.remove(k)).collect();
            if !due.is_empty() {
                self.persist(&jobs);
            }
            due
        };

        due.into_iter()
            .map(|job| {
                let outcome = self.deliver(&job);
                FiredReminder { job, outcome }
            })
            .collect()
    }

    fn deliver(&self, job: &ReminderJob) -> ReminderOutcome {
        let (text, outcome) = match self.store.get_by_id(job.owner, job.task_id) {
            Ok(Some(task)) => (
                format!("Reminder! Task: {}", task.title),
                ReminderOutcome::Delivered { title: task.title },
            ),
            Ok(None) => {
                warn!("reminder {} fired for missing task {}", job.id, job.task_id);
                ("Task not found.".to_owned(), ReminderOutcome::TaskMissing)
            }
            Err(e) => {
                error!(
                    "reminder {} could not read task {}: {e}",
                    job.id, job.task_id
                );
                (
                    "Task not found.".to_owned(),
                    ReminderOutcome::StoreFailed(e.to_string()),
                )
            }
        };

        debug!("reminder {} fired for task {}", job.id, job.task_id);
        if self.outbox.send(OutboundMessage::text(job.chat, text)).is_err() {
            warn!("outbox closed, reminder {} was not delivered", job.id);
        }
        outcome
    }

    /// Reload persisted jobs, merging them with any already registered.
    /// Returns the number of jobs loaded. Past-due jobs fire on the next tick.
    ///
    /// An unreadable state file leaves the scheduler empty. One that does not
    /// parse is moved aside to `<path>.corrupt` first.
    pub fn load_state(&self) -> usize {
        let Some(path) = &self.state_path else {
            return 0;
        };
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!("cannot read reminder state {}: {e}", path.display());
                return 0;
            }
        };
        let state: SchedulerState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!("cannot load reminder state {}: {e}", path.display());
                let aside = sibling_path(path, ".corrupt");
                match std::fs::rename(path, &aside) {
                    Ok(()) => warn!("moved unreadable reminder state to {}", aside.display()),
                    Err(e) => warn!("cannot move reminder state aside: {e}"),
                }
                return 0;
            }
        };

        let count = state.jobs.len();
        let mut jobs = self.lock();
        for job in state.jobs {
            jobs.insert((job.fire_at, job.id), job);
        }
        debug!("loaded {count} reminder jobs from {}", path.display());
        count
    }

    fn persist(&self, jobs: &BTreeMap<JobKey, ReminderJob>) {
        let Some(path) = &self.state_path else {
            return;
        };
        if let Err(e) = save_state_to_path(path, jobs.values().cloned().collect()) {
            error!("cannot persist reminder state: {e}");
        }
    }

    /// Start the scheduler background loop.
    pub fn run(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("reminder scheduler started with {} jobs", self.lock().len());
            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let fired = self.fire_due();
                        if !fired.is_empty() {
                            debug!("scheduler tick fired {} reminders", fired.len());
                        }
                    }
                }
            }
            info!("reminder scheduler stopped");
        })
    }
}

fn save_state_to_path(path: &Path, jobs: Vec<ReminderJob>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| BotError::Scheduler(format!("cannot create state dir: {e}")))?;
    }
    let state = SchedulerState {
        version: default_state_version(),
        jobs,
    };
    let json = serde_json::to_string_pretty(&state)
        .map_err(|e| BotError::Scheduler(format!("cannot serialize state: {e}")))?;
    // Write then rename, so a crash mid-write never truncates the live file.
    let tmp = sibling_path(path, ".tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| BotError::Scheduler(format!("cannot write state: {e}")))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| BotError::Scheduler(format!("cannot replace state: {e}")))?;
    Ok(())
}

/// `path` with `suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
