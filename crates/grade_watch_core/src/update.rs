use watch_logging::{watch_debug, watch_warn};

use crate::filter::select_pollable;
use crate::{Effect, LoopEndReason, Msg, PollPhase, TickOutcome, WatchState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WatchState, msg: Msg) -> (WatchState, Vec<Effect>) {
    let effects = match msg {
        Msg::JobSubmitted { job_id, record } => {
            if let Err(err) = state.registry_mut().insert(job_id.clone(), record) {
                watch_warn!("Rejected job submission: {}", err);
                return (state, Vec::new());
            }
            state.mark_dirty();
            // A loop that is already running keeps the metadata it started with.
            if state.is_watching() && state.can_start(&job_id) {
                start_polling(&mut state, &job_id).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        Msg::MarkersRestored(ids) => {
            if !ids.is_empty() {
                state.restore_completed(ids);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::StartWatching => {
            if !state.set_watching() {
                return (state, Vec::new());
            }
            state.mark_dirty();
            let pollable = select_pollable(state.registry().get_all());
            let mut effects = Vec::with_capacity(pollable.len());
            for job_id in pollable.keys() {
                if state.can_start(job_id) {
                    effects.extend(start_polling(&mut state, job_id));
                } else {
                    watch_debug!(job = job_id; "already notified this session; not polling");
                }
            }
            effects
        }
        Msg::StopWatching { job_id } => match state.loop_mut(&job_id) {
            Some(entry) if entry.phase == PollPhase::Polling => {
                entry.phase = PollPhase::Stopped;
                state.mark_dirty();
                vec![Effect::StopPolling { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::PollTicked {
            job_id,
            generation,
            outcome,
        } => {
            let Some(entry) = state.current_loop_mut(&job_id, generation) else {
                watch_debug!(job = job_id; "ignoring tick from replaced loop {}", generation);
                return (state, Vec::new());
            };
            entry.ticks = entry.ticks.saturating_add(1);
            match outcome {
                TickOutcome::Pending => {}
                TickOutcome::Failed => entry.failures = entry.failures.saturating_add(1),
                TickOutcome::Completed => {
                    entry.phase = PollPhase::Completed;
                    state.mark_completed(&job_id);
                }
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::LoopEnded {
            job_id,
            generation,
            reason,
        } => {
            let Some(entry) = state.current_loop_mut(&job_id, generation) else {
                watch_debug!(job = job_id; "ignoring end of replaced loop {}", generation);
                return (state, Vec::new());
            };
            if entry.phase == PollPhase::Polling {
                entry.phase = match reason {
                    LoopEndReason::Completed => PollPhase::Completed,
                    LoopEndReason::Stopped => PollPhase::Stopped,
                    LoopEndReason::Expired => PollPhase::Expired,
                };
                if reason == LoopEndReason::Completed {
                    state.mark_completed(&job_id);
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_polling(state: &mut WatchState, job_id: &str) -> Option<Effect> {
    let (record, generation) = state.begin_polling(job_id)?;
    Some(Effect::StartPolling {
        job_id: job_id.to_string(),
        record,
        generation,
    })
}
