use std::collections::{BTreeMap, BTreeSet};

use crate::filter::is_pollable;
use crate::selection::{build_selection_list, selection_label, MockBaseline, SelectionEntry};
use crate::view_model::{JobRowView, WatchViewModel};
use crate::{JobId, JobRecord, JobRegistry};

/// Where a job stands from the watcher's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    /// Known but not handed to a poll loop yet.
    #[default]
    Waiting,
    Polling,
    Completed,
    /// Loop cancelled on request.
    Stopped,
    /// Loop evicted after outliving the configured maximum age.
    Expired,
    /// Demo entry; never polled.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Pending,
    Failed,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEndReason {
    Completed,
    Stopped,
    Expired,
}

/// Tells successive loops of one job apart, so events from a cancelled loop
/// cannot touch the one that replaced it.
pub type LoopGeneration = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopState {
    pub(crate) generation: LoopGeneration,
    pub(crate) phase: PollPhase,
    pub(crate) ticks: u32,
    pub(crate) failures: u32,
}

/// Session context: the registry, the ids already notified, and the loops
/// handed out so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchState {
    registry: JobRegistry,
    completed: BTreeSet<JobId>,
    loops: BTreeMap<JobId, LoopState>,
    last_generation: LoopGeneration,
    watching: bool,
    dirty: bool,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: JobRegistry) -> Self {
        Self {
            registry,
            dirty: true,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    pub fn is_completed(&self, job_id: &str) -> bool {
        self.completed.contains(job_id)
    }

    /// Number of loops that have been started and have not ended.
    pub fn active_count(&self) -> usize {
        self.loops
            .values()
            .filter(|l| l.phase == PollPhase::Polling)
            .count()
    }

    pub fn phase(&self, job_id: &str) -> Option<PollPhase> {
        let record = self.registry.get(job_id)?;
        if !is_pollable(job_id, record) {
            return Some(PollPhase::Demo);
        }
        if self.completed.contains(job_id) {
            return Some(PollPhase::Completed);
        }
        Some(
            self.loops
                .get(job_id)
                .map(|l| l.phase)
                .unwrap_or(PollPhase::Waiting),
        )
    }

    pub fn view(&self) -> WatchViewModel {
        let jobs: Vec<JobRowView> = self
            .registry
            .get_all()
            .iter()
            .map(|(job_id, record)| {
                let (ticks, failures) = self
                    .loops
                    .get(job_id)
                    .map(|l| (l.ticks, l.failures))
                    .unwrap_or((0, 0));
                JobRowView {
                    job_id: job_id.clone(),
                    label: selection_label(job_id, record),
                    submitted_at: record.submitted_at.clone(),
                    phase: self.phase(job_id).unwrap_or_default(),
                    ticks,
                    failures,
                }
            })
            .collect();

        WatchViewModel {
            watching: self.watching,
            job_count: jobs.len(),
            active_count: self.active_count(),
            completed_count: jobs
                .iter()
                .filter(|row| row.phase == PollPhase::Completed)
                .count(),
            jobs,
            dirty: self.dirty,
        }
    }

    pub fn selection(&self, baseline: Option<&MockBaseline>) -> Vec<SelectionEntry> {
        build_selection_list(self.registry.get_all(), baseline)
    }

    /// Returns whether the view changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn registry_mut(&mut self) -> &mut JobRegistry {
        &mut self.registry
    }

    pub(crate) fn set_watching(&mut self) -> bool {
        let first = !self.watching;
        self.watching = true;
        first
    }

    pub(crate) fn restore_completed(&mut self, ids: impl IntoIterator<Item = JobId>) {
        self.completed.extend(ids);
    }

    /// A job may start when it is pollable, not yet notified and not already polling.
    pub(crate) fn can_start(&self, job_id: &str) -> bool {
        let Some(record) = self.registry.get(job_id) else {
            return false;
        };
        is_pollable(job_id, record)
            && !self.completed.contains(job_id)
            && !matches!(
                self.loops.get(job_id).map(|l| l.phase),
                Some(PollPhase::Polling)
            )
    }

    /// Records a newly started loop and returns the record it should carry
    /// along with its generation.
    pub(crate) fn begin_polling(&mut self, job_id: &str) -> Option<(JobRecord, LoopGeneration)> {
        let record = self.registry.get(job_id)?.clone();
        self.last_generation += 1;
        let generation = self.last_generation;
        self.loops.insert(
            job_id.to_string(),
            LoopState {
                generation,
                phase: PollPhase::Polling,
                ticks: 0,
                failures: 0,
            },
        );
        Some((record, generation))
    }

    pub(crate) fn loop_mut(&mut self, job_id: &str) -> Option<&mut LoopState> {
        self.loops.get_mut(job_id)
    }

    /// The loop for `job_id`, only if it is the one started as `generation`.
    pub(crate) fn current_loop_mut(
        &mut self,
        job_id: &str,
        generation: LoopGeneration,
    ) -> Option<&mut LoopState> {
        self.loops
            .get_mut(job_id)
            .filter(|entry| entry.generation == generation)
    }

    pub(crate) fn mark_completed(&mut self, job_id: &str) {
        self.completed.insert(job_id.to_string());
    }
}
