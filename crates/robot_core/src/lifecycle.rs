use std::ops::BitOr;

use crate::{JobError, JobEvent};

pub type JobId = u64;

/// Advertised abilities of a job.
///
/// Purely informational: whether a kill or suspend actually succeeds is
/// decided by the job's hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const KILLABLE: Capabilities = Capabilities(0b01);
    pub const SUSPENDABLE: Capabilities = Capabilities(0b10);

    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

/// Outcome carried by a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success,
    Failure(JobError),
    Killed,
}

impl JobResult {
    pub fn from_error(error: Option<&JobError>) -> Self {
        match error {
            None => JobResult::Success,
            Some(err) if err.is_killed() => JobResult::Killed,
            Some(err) => JobResult::Failure(err.clone()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Created,
    /// `start()` was called but the deferred work has not begun yet.
    Scheduled,
    Running,
    Suspended,
    Finished(JobResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Scheduled,
    Running,
}

/// Pure lifecycle state machine of a job.
///
/// Transitions return the events they produce; emitting them is up to the
/// caller.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    phase: Phase,
    finished: Option<JobResult>,
    suspended: bool,
    error: Option<JobError>,
    capabilities: Capabilities,
    auto_delete: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Created,
            finished: None,
            suspended: false,
            error: None,
            capabilities: Capabilities::NONE,
            auto_delete: true,
        }
    }

    pub fn state(&self) -> JobState {
        if let Some(result) = &self.finished {
            return JobState::Finished(result.clone());
        }
        if self.suspended {
            return JobState::Suspended;
        }
        match self.phase {
            Phase::Created => JobState::Created,
            Phase::Scheduled => JobState::Scheduled,
            Phase::Running => JobState::Running,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: JobError) {
        self.error = Some(error);
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    pub fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    pub fn set_auto_delete(&mut self, auto_delete: bool) {
        self.auto_delete = auto_delete;
    }

    /// `Created → Scheduled`. Returns false if the job was already started
    /// or has finished.
    pub fn schedule(&mut self) -> bool {
        if self.is_finished() || self.phase != Phase::Created {
            return false;
        }
        self.phase = Phase::Scheduled;
        true
    }

    /// Marks the deferred work as running. Returns false once finished.
    pub fn begin(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.phase = Phase::Running;
        true
    }

    /// Transitions to `Finished`.
    ///
    /// # Panics
    ///
    /// Panics if the job already finished; finishing twice is a bug in the
    /// job implementation.
    pub fn finish(&mut self, emit_result: bool) -> Vec<JobEvent> {
        assert!(!self.is_finished(), "job finished twice");
        let result = JobResult::from_error(self.error.as_ref());
        self.finished = Some(result.clone());
        self.suspended = false;

        let mut events = Vec::with_capacity(2);
        if emit_result {
            events.push(JobEvent::Result(result));
        }
        events.push(JobEvent::Finished);
        events
    }

    /// Finishes a job that is being torn down: only the terminal event.
    pub fn force_finish(&mut self) -> Option<JobEvent> {
        if self.is_finished() {
            return None;
        }
        self.finished = Some(JobResult::from_error(self.error.as_ref()));
        self.suspended = false;
        Some(JobEvent::Finished)
    }

    pub fn mark_suspended(&mut self) -> Option<JobEvent> {
        if self.suspended {
            return None;
        }
        self.suspended = true;
        Some(JobEvent::Suspended)
    }

    pub fn mark_resumed(&mut self) -> Option<JobEvent> {
        if !self.suspended {
            return None;
        }
        self.suspended = false;
        Some(JobEvent::Resumed)
    }
}
