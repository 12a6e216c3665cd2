//! Extraction run state, persisted after every step transition so a crashed
//! or rate-limited run can resume from the last completed step.

use crate::dag::StepKind;
use crate::ids::OntologyId;
use crate::literals::storage_literals;
use crate::retry::ErrorClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

storage_literals!(RunStatus, "run status", {
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
});

/// Status of one step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Optional step that failed and was skipped.
    Skipped,
}

storage_literals!(StepStatus, "step status", {
    Pending => "pending",
    Running => "running",
    Succeeded => "succeeded",
    Failed => "failed",
    Skipped => "skipped",
});

impl StepStatus {
    /// Completed steps are never re-executed on resume.
    pub fn is_done(self) -> bool {
        matches!(self, StepStatus::Succeeded | StepStatus::Skipped)
    }
}

/// Progress payload of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    /// Run-wide event sequence number of the last update.
    pub sequence: u64,
    pub completed: u64,
    pub total: u64,
    pub message: Option<String>,
}

/// State of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub step: StepKind,
    pub status: StepStatus,
    pub attempts: u32,
    pub progress: StepProgress,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepState {
    pub fn pending(step: StepKind) -> Self {
        Self {
            step,
            status: StepStatus::Pending,
            attempts: 0,
            progress: StepProgress::default(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        Some((self.finished_at? - self.started_at?).num_milliseconds())
    }
}

/// One extraction attempt over an ontology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub run_id: String,
    pub ontology_id: OntologyId,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Steps in execution order.
    pub steps: Vec<StepState>,
    /// Last progress sequence number handed out.
    pub progress_sequence: u64,
    pub failed_step: Option<StepKind>,
    pub error_summary: Option<String>,
    pub error_class: Option<ErrorClass>,
    /// Optional steps that were skipped after failing.
    pub degraded_steps: Vec<StepKind>,
}

impl ExtractionRun {
    /// Create a new running run over `steps` (already in execution order).
    pub fn new(ontology_id: OntologyId, steps: &[StepKind]) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4().to_string(),
            ontology_id,
            status: RunStatus::Running,
            started_at: now,
            last_updated_at: now,
            finished_at: None,
            steps: steps.iter().copied().map(StepState::pending).collect(),
            progress_sequence: 0,
            failed_step: None,
            error_summary: None,
            error_class: None,
            degraded_steps: Vec::new(),
        }
    }

    pub fn step(&self, step: StepKind) -> Option<&StepState> {
        self.steps.iter().find(|s| s.step == step)
    }

    fn step_mut(&mut self, step: StepKind) -> Option<&mut StepState> {
        self.steps.iter_mut().find(|s| s.step == step)
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    pub fn mark_step_running(&mut self, step: StepKind) {
        if let Some(s) = self.step_mut(step) {
            s.status = StepStatus::Running;
            s.attempts += 1;
            s.error = None;
            s.started_at.get_or_insert_with(Utc::now);
        }
        self.touch();
    }

    pub fn mark_step_succeeded(&mut self, step: StepKind) {
        if let Some(s) = self.step_mut(step) {
            s.status = StepStatus::Succeeded;
            s.error = None;
            s.finished_at = Some(Utc::now());
        }
        self.touch();
    }

    /// Record a failed attempt. The step stays failed until retried.
    pub fn mark_step_failed(&mut self, step: StepKind, error: &str) {
        if let Some(s) = self.step_mut(step) {
            s.status = StepStatus::Failed;
            s.error = Some(error.to_string());
            s.finished_at = Some(Utc::now());
        }
        self.touch();
    }

    /// Skip an optional step after it failed; the run continues degraded.
    pub fn mark_step_skipped(&mut self, step: StepKind, reason: &str) {
        if let Some(s) = self.step_mut(step) {
            s.status = StepStatus::Skipped;
            s.error = Some(reason.to_string());
            s.finished_at = Some(Utc::now());
        }
        if !self.degraded_steps.contains(&step) {
            self.degraded_steps.push(step);
        }
        self.touch();
    }

    /// Update a step's progress and return the run-wide event sequence number.
    ///
    /// `completed` never decreases for a step.
    pub fn record_progress(
        &mut self,
        step: StepKind,
        completed: u64,
        total: u64,
        message: Option<String>,
    ) -> u64 {
        self.progress_sequence += 1;
        let sequence = self.progress_sequence;
        if let Some(s) = self.step_mut(step) {
            s.progress.sequence = sequence;
            s.progress.completed = s.progress.completed.max(completed);
            s.progress.total = s.progress.total.max(total);
            s.progress.message = message;
        }
        self.touch();
        sequence
    }

    pub fn mark_run_succeeded(&mut self) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
        self.touch();
    }

    pub fn mark_run_failed(&mut self, step: Option<StepKind>, class: ErrorClass, summary: &str) {
        self.status = RunStatus::Failed;
        self.failed_step = step;
        self.error_class = Some(class);
        self.error_summary = Some(summary.to_string());
        self.finished_at = Some(Utc::now());
        self.touch();
    }

    /// Reopen a failed or crashed run for resumption.
    pub fn reopen(&mut self) {
        self.status = RunStatus::Running;
        self.failed_step = None;
        self.error_class = None;
        self.error_summary = None;
        self.finished_at = None;
        for s in &mut self.steps {
            if !s.status.is_done() {
                s.status = StepStatus::Pending;
            }
        }
        self.touch();
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }

    /// Whether resuming can make progress: not succeeded and not failed
    /// for a reason that would fail again identically.
    pub fn is_resumable(&self) -> bool {
        match self.status {
            RunStatus::Succeeded => false,
            RunStatus::Running => true,
            RunStatus::Failed => !matches!(
                self.error_class,
                Some(ErrorClass::Configuration) | Some(ErrorClass::Validation)
            ),
        }
    }

    /// Steps not yet done, in execution order.
    pub fn steps_to_run(&self) -> Vec<StepKind> {
        self.steps
            .iter()
            .filter(|s| !s.status.is_done())
            .map(|s| s.step)
            .collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_steps.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let count = |status: StepStatus| self.steps.iter().filter(|s| s.status == status).count();
        RunSummary {
            succeeded: count(StepStatus::Succeeded),
            skipped: count(StepStatus::Skipped),
            failed: count(StepStatus::Failed),
            pending: count(StepStatus::Pending) + count(StepStatus::Running),
            total_duration_ms: self.steps.iter().filter_map(|s| s.duration_ms()).sum(),
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pending: usize,
    pub total_duration_ms: i64,
}

#[cfg(test)]
#[path = "run_state_test.rs"]
mod tests;
