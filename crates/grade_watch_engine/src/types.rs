use std::fmt;

use grade_watch_core::{JobId, LoopGeneration};

/// Remote status of a job as seen by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Completed,
}

/// Why a poll loop stopped issuing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The job reported `completed`; the notifier has been invoked.
    Completed,
    /// `stop` or `shutdown` was called.
    Cancelled,
    /// The loop outlived `PollSettings::max_age`.
    Expired,
}

/// Every event echoes the generation the loop was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TickCompleted {
        job_id: JobId,
        generation: LoopGeneration,
        result: Result<PollStatus, CheckError>,
    },
    LoopEnded {
        job_id: JobId,
        generation: LoopGeneration,
        exit: LoopExit,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CheckError {
    pub kind: FailureKind,
    pub message: String,
}

impl CheckError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    MalformedBody,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::MalformedBody => write!(f, "malformed status body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
