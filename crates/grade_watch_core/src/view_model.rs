use crate::{JobId, PollPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchViewModel {
    pub watching: bool,
    pub job_count: usize,
    pub active_count: usize,
    pub completed_count: usize,
    pub jobs: Vec<JobRowView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub label: String,
    pub submitted_at: Option<String>,
    pub phase: PollPhase,
    pub ticks: u32,
    pub failures: u32,
}
