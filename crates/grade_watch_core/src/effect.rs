#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Engine events for this loop must echo `generation`.
    StartPolling {
        job_id: crate::JobId,
        record: crate::JobRecord,
        generation: crate::LoopGeneration,
    },
    StopPolling {
        job_id: crate::JobId,
    },
}
