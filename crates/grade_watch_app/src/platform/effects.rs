use std::collections::VecDeque;

use grade_watch_core::{Effect, LoopEndReason, Msg, TickOutcome};
use grade_watch_engine::{EngineEvent, LoopExit, PollStatus, PollerScheduler, StartOutcome};
use watch_logging::{watch_debug, watch_info};

/// Carries core effects out on the poll scheduler and turns engine events
/// back into core messages.
pub struct EffectRunner {
    scheduler: PollerScheduler,
    pending: VecDeque<Msg>,
}

impl EffectRunner {
    pub fn new(scheduler: PollerScheduler) -> Self {
        Self {
            scheduler,
            pending: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartPolling {
                    job_id,
                    record,
                    generation,
                } => {
                    match self.scheduler.start(&job_id, &record, generation) {
                        StartOutcome::Started => {}
                        StartOutcome::AlreadyRunning => {
                            watch_debug!(job = job_id; "start ignored; loop already running");
                        }
                        StartOutcome::AlreadyCompleted => {
                            // The marker store knew something the state did not.
                            self.pending.push_back(Msg::LoopEnded {
                                job_id,
                                generation,
                                reason: LoopEndReason::Completed,
                            });
                        }
                    }
                }
                Effect::StopPolling { job_id } => {
                    if !self.scheduler.stop(&job_id) {
                        watch_debug!(job = job_id; "stop ignored; no loop running");
                    }
                }
            }
        }
    }

    /// Next message for the core, or `None` once the engine can produce no more.
    pub async fn next_msg(&mut self) -> Option<Msg> {
        if let Some(msg) = self.pending.pop_front() {
            return Some(msg);
        }
        self.scheduler.next_event().await.map(map_event)
    }

    pub async fn shutdown(mut self) {
        self.scheduler.shutdown().await;
        watch_info!("Poll scheduler stopped");
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::TickCompleted {
            job_id,
            generation,
            result,
        } => Msg::PollTicked {
            job_id,
            generation,
            outcome: match result {
                Ok(PollStatus::Pending) => TickOutcome::Pending,
                Ok(PollStatus::Completed) => TickOutcome::Completed,
                Err(_) => TickOutcome::Failed,
            },
        },
        EngineEvent::LoopEnded {
            job_id,
            generation,
            exit,
        } => Msg::LoopEnded {
            job_id,
            generation,
            reason: map_exit(exit),
        },
    }
}

fn map_exit(exit: LoopExit) -> LoopEndReason {
    match exit {
        LoopExit::Completed => LoopEndReason::Completed,
        LoopExit::Cancelled => LoopEndReason::Stopped,
        LoopExit::Expired => LoopEndReason::Expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grade_watch_engine::{CheckError, FailureKind};

    #[test]
    fn failed_ticks_map_to_failed_outcome() {
        let msg = map_event(EngineEvent::TickCompleted {
            job_id: "J1".to_string(),
            generation: 4,
            result: Err(CheckError::new(FailureKind::HttpStatus(502), "bad gateway")),
        });
        assert_eq!(
            msg,
            Msg::PollTicked {
                job_id: "J1".to_string(),
                generation: 4,
                outcome: TickOutcome::Failed,
            }
        );
    }

    #[test]
    fn cancelled_loops_map_to_stopped() {
        let msg = map_event(EngineEvent::LoopEnded {
            job_id: "J1".to_string(),
            generation: 2,
            exit: LoopExit::Cancelled,
        });
        assert_eq!(
            msg,
            Msg::LoopEnded {
                job_id: "J1".to_string(),
                generation: 2,
                reason: LoopEndReason::Stopped,
            }
        );
    }
}
