//! Stage-weighted progress for one generation run.
//!
//! A [`ProgressTracker`] is built once and passed by reference to whatever drives a run. Every
//! step counts equally toward `total_progress`, whatever its real cost. Listeners receive
//! read-only snapshots, outside the tracker's lock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    /// Percent in `[0, 100]`.
    pub progress: f64,
    pub message: Option<String>,
    /// Milliseconds since the Unix epoch, per the tracker's [`Clock`].
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// `end_time - start_time`, in milliseconds.
    pub duration: Option<u64>,
}

/// Partial update applied by [`ProgressTracker::update_step`]; `None` fields are left alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepUpdate {
    pub status: Option<StepStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
}

impl StepUpdate {
    pub fn status(status: StepStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProgressState {
    /// Rounded mean of every step's progress.
    pub total_progress: u32,
    pub current_step: Option<String>,
    pub steps: Vec<ProgressStep>,
    pub is_running: bool,
    pub error: Option<String>,
    pub start_time: Option<u64>,
    /// Whole seconds; unknown until some progress has been made.
    pub estimated_time_remaining: Option<u64>,
}

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

pub type Listener = Arc<dyn Fn(&ProgressState) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Listener)>,
}

pub struct ProgressTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<ProgressState>,
    listeners: Mutex<Listeners>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(ProgressState::default()),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    /// Register `listener` and immediately send it the current state.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ProgressState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let listener: Listener = Arc::new(listener);
        let id = {
            let mut ls = lock(&self.listeners);
            let id = SubscriptionId(ls.next_id);
            ls.next_id += 1;
            ls.entries.push((id, Arc::clone(&listener)));
            id
        };
        listener(&self.state());
        id
    }

    /// Returns whether `id` was still subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut ls = lock(&self.listeners);
        let before = ls.entries.len();
        ls.entries.retain(|(entry, _)| *entry != id);
        ls.entries.len() != before
    }

    pub fn state(&self) -> ProgressState {
        lock(&self.state).clone()
    }

    /// Begin a run: every step `pending` at 0, the first one current, any previous error cleared.
    pub fn start_process(&self, steps: &[(&str, &str)]) {
        tracing::info!(
            steps = ?steps.iter().map(|(_, name)| *name).collect::<Vec<_>>(),
            "starting process"
        );
        let now = self.clock.now_ms();
        *lock(&self.state) = ProgressState {
            total_progress: 0,
            current_step: steps.first().map(|(id, _)| id.to_string()),
            steps: steps
                .iter()
                .map(|(id, name)| ProgressStep {
                    id: id.to_string(),
                    name: name.to_string(),
                    status: StepStatus::Pending,
                    progress: 0.0,
                    message: None,
                    start_time: None,
                    end_time: None,
                    duration: None,
                })
                .collect(),
            is_running: true,
            error: None,
            start_time: Some(now),
            estimated_time_remaining: None,
        };
        self.emit();
    }

    pub fn update_step(&self, id: &str, update: StepUpdate) {
        if self.apply_update(id, update) {
            self.emit();
        }
    }

    fn apply_update(&self, id: &str, update: StepUpdate) -> bool {
        let now = self.clock.now_ms();
        let mut state = lock(&self.state);

        let Some(step) = state.steps.iter_mut().find(|s| s.id == id) else {
            tracing::warn!(step = id, "progress update for unknown step");
            return false;
        };

        if let Some(status) = update.status {
            match status {
                StepStatus::InProgress if step.start_time.is_none() => step.start_time = Some(now),
                StepStatus::Completed | StepStatus::Error => step.end_time = Some(now),
                _ => {}
            }
            if status == StepStatus::Completed {
                step.progress = 100.0;
            }
            step.status = status;
        }
        if let Some(p) = update.progress
            && p.is_finite()
        {
            step.progress = step.progress.max(p.clamp(0.0, 100.0));
        }
        if update.message.is_some() {
            step.message = update.message;
        }
        if let (Some(start), Some(end)) = (step.start_time, step.end_time) {
            step.duration = Some(end.saturating_sub(start));
        }

        if update.status.is_some() {
            tracing::info!(
                step = %step.name,
                status = ?step.status,
                progress = step.progress,
                message = step.message.as_deref(),
                duration_ms = step.duration,
                "step update"
            );
        } else {
            tracing::debug!(step = %step.name, progress = step.progress, "step progress");
        }

        if update.status == Some(StepStatus::InProgress) {
            state.current_step = Some(id.to_string());
        }

        state.total_progress = total_progress(&state.steps);
        state.estimated_time_remaining = estimate_remaining(&state, now);

        if state.is_running && state.steps.iter().all(|s| s.status == StepStatus::Completed) {
            state.is_running = false;
            tracing::info!(
                total_ms = now.saturating_sub(state.start_time.unwrap_or(now)),
                steps = state.steps.len(),
                "process completed"
            );
        }
        true
    }

    /// Record a failed run. The first error of a run sticks until the next `start_process`.
    pub fn set_error(&self, message: impl Into<String>, step_id: Option<&str>) {
        let message = message.into();
        {
            let mut state = lock(&self.state);
            if let Some(existing) = &state.error {
                tracing::warn!(error = %message, first = %existing, "ignoring error after the first");
                return;
            }
            tracing::error!(error = %message, step = step_id, "process failed");
            state.error = Some(message.clone());
            state.is_running = false;
        }
        if let Some(id) = step_id {
            self.apply_update(id, StepUpdate::status(StepStatus::Error).with_message(message));
        }
        self.emit();
    }

    /// Drop all steps and any error.
    pub fn reset(&self) {
        tracing::info!("resetting progress tracker");
        *lock(&self.state) = ProgressState::default();
        self.emit();
    }

    fn emit(&self) {
        let snapshot = self.state();
        let listeners: Vec<Listener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

fn total_progress(steps: &[ProgressStep]) -> u32 {
    if steps.is_empty() {
        return 0;
    }
    let mean = steps.iter().map(|s| s.progress).sum::<f64>() / steps.len() as f64;
    mean.round().clamp(0.0, 100.0) as u32
}

fn estimate_remaining(state: &ProgressState, now: u64) -> Option<u64> {
    let start = state.start_time?;
    if state.total_progress == 0 {
        return None;
    }
    let elapsed = now.saturating_sub(start) as f64;
    let remaining_ms = (elapsed / f64::from(state.total_progress)) * 100.0 - elapsed;
    Some((remaining_ms.max(0.0) / 1000.0).round() as u64)
}

#[cfg(test)]
#[path = "../tests/unit/progress.rs"]
mod tests;
