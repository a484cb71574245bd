use std::fmt;

use crate::{JobId, JobRecord};

pub const UNTITLED_TASK: &str = "Untitled task";
pub const UNKNOWN_TIME: &str = "unknown time";

/// One-time message telling the user a grading job has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub job_id: JobId,
    pub task_name: String,
    pub submitted_at: String,
}

impl CompletionNotice {
    pub fn new(job_id: impl Into<JobId>, record: &JobRecord) -> Self {
        Self {
            job_id: job_id.into(),
            task_name: record
                .name
                .clone()
                .unwrap_or_else(|| UNTITLED_TASK.to_string()),
            submitted_at: record
                .submitted_at
                .clone()
                .unwrap_or_else(|| UNKNOWN_TIME.to_string()),
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Your task \"{}\" submitted at [{}] has finished grading.\n\
             Open \"Grading history\" > \"Grading results\" to review it, or go straight to the report and analysis.\n\
             If the grading overview is already open, refresh it to load the latest results.",
            self.task_name, self.submitted_at
        )
    }
}

impl fmt::Display for CompletionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
