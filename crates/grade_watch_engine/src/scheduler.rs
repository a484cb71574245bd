use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use grade_watch_core::{JobId, JobRecord, LoopGeneration};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_debug, watch_info};

use crate::check::StatusChecker;
use crate::notifier::CompletionNotifier;
use crate::{EngineEvent, LoopExit, PollStatus};

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between status requests; the first request waits one interval.
    pub interval: Duration,
    /// Loops older than this end with [`LoopExit::Expired`]. `None` polls forever.
    pub max_age: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_age: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// The user was already notified; no loop was created and no request sent.
    AlreadyCompleted,
}

struct PollLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// One repeating status check per job, each in its own task.
///
/// Must be used from within a tokio runtime. Loops share nothing but the
/// notifier's marker store.
pub struct PollerScheduler {
    settings: PollSettings,
    checker: Arc<dyn StatusChecker>,
    notifier: CompletionNotifier,
    loops: HashMap<JobId, PollLoop>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl PollerScheduler {
    pub fn new(
        settings: PollSettings,
        checker: Arc<dyn StatusChecker>,
        notifier: CompletionNotifier,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            checker,
            notifier,
            loops: HashMap::new(),
            event_tx,
            event_rx,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Starts polling `job_id`. Events from this loop carry `generation`.
    pub fn start(
        &mut self,
        job_id: &str,
        record: &JobRecord,
        generation: LoopGeneration,
    ) -> StartOutcome {
        if self.notifier.is_notified(job_id) {
            watch_debug!(job = job_id; "already notified; poll loop not started");
            return StartOutcome::AlreadyCompleted;
        }
        if self.is_running(job_id) {
            return StartOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        let ctx = LoopContext {
            job_id: job_id.to_string(),
            generation,
            record: record.clone(),
            settings: self.settings.clone(),
            checker: self.checker.clone(),
            notifier: self.notifier.clone(),
            cancel: cancel.clone(),
            event_tx: self.event_tx.clone(),
        };
        let handle = tokio::spawn(run_poll_loop(ctx));
        self.loops
            .insert(job_id.to_string(), PollLoop { cancel, handle });
        watch_info!(
            job = job_id;
            "poll loop {} started (every {} ms)",
            generation,
            self.settings.interval.as_millis()
        );
        StartOutcome::Started
    }

    /// Starts a loop for every job in `jobs`, all tagged `generation`;
    /// returns how many were started.
    pub fn start_all(
        &mut self,
        jobs: &BTreeMap<JobId, JobRecord>,
        generation: LoopGeneration,
    ) -> usize {
        jobs.iter()
            .filter(|(job_id, record)| {
                self.start(job_id, record, generation) == StartOutcome::Started
            })
            .count()
    }

    /// Cancels one loop. Returns false when no loop was running for `job_id`.
    pub fn stop(&mut self, job_id: &str) -> bool {
        let Some(poll_loop) = self.loops.remove(job_id) else {
            return false;
        };
        let was_running = !poll_loop.handle.is_finished();
        poll_loop.cancel.cancel();
        if was_running {
            watch_info!(job = job_id; "poll loop stop requested");
        }
        was_running
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.loops
            .get(job_id)
            .is_some_and(|poll_loop| !poll_loop.handle.is_finished())
    }

    /// Ids with a live loop, sorted.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self
            .loops
            .iter()
            .filter(|(_, poll_loop)| !poll_loop.handle.is_finished())
            .map(|(job_id, _)| job_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits for the next event. The scheduler holds a sender itself, so this
    /// only returns `None` if that sender is gone.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    /// Cancels every loop and waits for all of them to finish.
    pub async fn shutdown(&mut self) {
        let loops: Vec<PollLoop> = self.loops.drain().map(|(_, poll_loop)| poll_loop).collect();
        if loops.is_empty() {
            return;
        }
        watch_info!("Stopping {} poll loops", loops.len());
        for poll_loop in &loops {
            poll_loop.cancel.cancel();
        }
        let _ = futures_util::future::join_all(loops.into_iter().map(|l| l.handle)).await;
    }
}

impl Drop for PollerScheduler {
    fn drop(&mut self) {
        for poll_loop in self.loops.values() {
            poll_loop.cancel.cancel();
        }
    }
}

struct LoopContext {
    job_id: JobId,
    generation: LoopGeneration,
    record: JobRecord,
    settings: PollSettings,
    checker: Arc<dyn StatusChecker>,
    notifier: CompletionNotifier,
    cancel: CancellationToken,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

async fn run_poll_loop(ctx: LoopContext) {
    let LoopContext {
        job_id,
        generation,
        record,
        settings,
        checker,
        notifier,
        cancel,
        event_tx,
    } = ctx;

    let started = Instant::now();
    let mut ticker = time::interval_at(started + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break LoopExit::Cancelled,
            _ = ticker.tick() => {}
        }

        if settings
            .max_age
            .is_some_and(|max_age| started.elapsed() >= max_age)
        {
            break LoopExit::Expired;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break LoopExit::Cancelled,
            result = checker.check(&job_id) => result,
        };

        let completed = matches!(result, Ok(PollStatus::Completed));
        if let Err(err) = &result {
            // Failed ticks are dropped; the next tick tries again.
            watch_debug!(job = job_id; "status check failed: {}", err);
        }
        let _ = event_tx.send(EngineEvent::TickCompleted {
            job_id: job_id.clone(),
            generation,
            result,
        });

        if completed {
            watch_info!(job = job_id; "grading completed");
            notifier.notify_if_new(&job_id, &record);
            break LoopExit::Completed;
        }
    };

    if exit != LoopExit::Completed {
        watch_info!(job = job_id; "poll loop ended: {:?}", exit);
    }
    let _ = event_tx.send(EngineEvent::LoopEnded {
        job_id,
        generation,
        exit,
    });
}
