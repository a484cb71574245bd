#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Submission flow registered (or re-registered) a job.
    JobSubmitted {
        job_id: crate::JobId,
        record: crate::JobRecord,
    },
    /// Ids the user was already notified about earlier in this session.
    MarkersRestored(Vec<crate::JobId>),
    /// Begin polling every eligible job.
    StartWatching,
    /// Stop polling one job.
    StopWatching { job_id: crate::JobId },
    /// A poll loop finished one status request.
    PollTicked {
        job_id: crate::JobId,
        generation: crate::LoopGeneration,
        outcome: crate::TickOutcome,
    },
    /// A poll loop ended and will issue no further requests.
    LoopEnded {
        job_id: crate::JobId,
        generation: crate::LoopGeneration,
        reason: crate::LoopEndReason,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
