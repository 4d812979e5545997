//! Task results and errors

use thiserror::Error;

use crate::api::ApiError;
use crate::domain::{Status, TaskState};

/// Errors a task body can end with
///
/// `Cancelled` is the cancellation signal, not a failure: it is propagated
/// out of the body and reported as a cancelled outcome.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// Terminal result of one task instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Ran to completion with a status label
    Completed(String),
    /// Body returned an error
    Failed(String),
    /// Stopped cooperatively, or aborted
    Cancelled,
}

impl TaskOutcome {
    pub fn from_result(result: Result<String, TaskError>) -> Self {
        match result {
            Ok(label) => Self::Completed(label),
            Err(TaskError::Cancelled) => Self::Cancelled,
            Err(e) => {
                let message = e.to_string();
                if message.is_empty() {
                    Self::Failed("Unknown error".to_string())
                } else {
                    Self::Failed(message)
                }
            }
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            Self::Completed(_) => TaskState::Completed,
            Self::Failed(_) => TaskState::Failed,
            Self::Cancelled => TaskState::Cancelled,
        }
    }

    /// Status to publish; `task_label` names the task for cancellations
    pub fn to_status(&self, task_label: &str) -> Status {
        match self {
            Self::Completed(label) => Status::Completed(label.clone()),
            Self::Failed(reason) => Status::Failed(reason.clone()),
            Self::Cancelled => Status::Cancelled(task_label.to_string()),
        }
    }
}
