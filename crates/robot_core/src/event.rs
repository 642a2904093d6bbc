use serde_json::Value;

use crate::{ErrorCode, JobResult, Unit};

/// Human-readable description of the operation a job is about to run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    pub title: String,
    pub fields: Vec<(String, String)>,
}

impl Description {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }
}

/// Whether a killed job still reports its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillVerbosity {
    /// Only the terminal `Finished` event is emitted.
    Quietly,
    EmitResult,
}

/// Notification emitted by a job.
///
/// Delivery order at the end of a job is fixed: `Succeeded` or `Failed`
/// (request jobs only), then `Result` (unless suppressed), then `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Description(Description),
    InfoMessage(String),
    /// The configuration a request job will use was replaced.
    ConfigurationChanged,
    Suspended,
    Resumed,
    ProcessedAmount { unit: Unit, amount: u64 },
    TotalAmount { unit: Unit, amount: u64 },
    /// Processed amount of the progress unit.
    ProcessedSize(u64),
    /// Total amount of the progress unit.
    TotalSize(u64),
    Percent(u64),
    /// Bytes per second; `0` after the quiet period.
    Speed(u64),
    Succeeded(Value),
    Failed { code: ErrorCode, message: String },
    Result(JobResult),
    Finished,
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Finished)
    }
}
