use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use grade_watch_core::{select_pollable, JobRecord, JobRegistry};
use grade_watch_engine::{
    CheckError, CompletionMarkerStore, CompletionNotifier, EngineEvent, FailureKind, LoopExit,
    MemoryMarkerStore, NoticeReceiver, PollSettings, PollStatus, PollerScheduler, StartOutcome,
    StatusChecker,
};
use tokio::time::Instant;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

/// Replays scripted answers per job, then reports pending forever.
#[derive(Default)]
struct ScriptedChecker {
    scripts: Mutex<HashMap<String, VecDeque<Result<PollStatus, CheckError>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedChecker {
    fn script(self, job_id: &str, answers: Vec<Result<PollStatus, CheckError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), answers.into());
        self
    }

    fn calls(&self, job_id: &str) -> usize {
        self.calls.lock().unwrap().get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl StatusChecker for ScriptedChecker {
    async fn check(&self, job_id: &str) -> Result<PollStatus, CheckError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default() += 1;
        self.scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PollStatus::Pending))
    }
}

fn network_error() -> CheckError {
    CheckError::new(FailureKind::Network, "connection refused")
}

fn record(name: &str) -> JobRecord {
    JobRecord::new(Some(name), Some("2024-01-01 09:00"), false)
}

struct Harness {
    scheduler: PollerScheduler,
    notices: NoticeReceiver,
    checker: Arc<ScriptedChecker>,
    store: Arc<MemoryMarkerStore>,
}

fn harness(checker: ScriptedChecker, store: MemoryMarkerStore, settings: PollSettings) -> Harness {
    init_logging();
    let checker = Arc::new(checker);
    let store = Arc::new(store);
    let (notifier, notices) = CompletionNotifier::channel(store.clone());
    let scheduler = PollerScheduler::new(settings, checker.clone(), notifier);
    Harness {
        scheduler,
        notices,
        checker,
        store,
    }
}

async fn next_loop_end(scheduler: &mut PollerScheduler) -> (String, LoopExit) {
    loop {
        match scheduler.next_event().await.expect("event stream open") {
            EngineEvent::LoopEnded { job_id, exit, .. } => return (job_id, exit),
            EngineEvent::TickCompleted { .. } => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn pending_keeps_polling_without_notifying() {
    let mut h = harness(
        ScriptedChecker::default(),
        MemoryMarkerStore::new(),
        PollSettings::default(),
    );
    assert_eq!(h.scheduler.start("J1", &record("HW1"), 1), StartOutcome::Started);

    for _ in 0..3 {
        match h.scheduler.next_event().await.unwrap() {
            EngineEvent::TickCompleted { job_id, result, .. } => {
                assert_eq!(job_id, "J1");
                assert_eq!(result, Ok(PollStatus::Pending));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    assert!(h.scheduler.is_running("J1"));
    assert!(h.notices.try_recv().is_none());
    assert!(!h.store.is_marked("J1"));
}

#[tokio::test(start_paused = true)]
async fn completed_cancels_loop_and_notifies_once() {
    let checker = ScriptedChecker::default().script(
        "J1",
        vec![Ok(PollStatus::Pending), Ok(PollStatus::Completed)],
    );
    let mut h = harness(checker, MemoryMarkerStore::new(), PollSettings::default());
    h.scheduler.start("J1", &record("HW1"), 1);

    assert_eq!(
        next_loop_end(&mut h.scheduler).await,
        ("J1".to_string(), LoopExit::Completed)
    );

    let notice = h.notices.try_recv().expect("one notice");
    assert_eq!(notice.job_id, "J1");
    assert_eq!(notice.task_name, "HW1");
    assert!(h.notices.try_recv().is_none());
    // The marker waits for the surface to acknowledge the notice.
    assert!(!h.store.is_marked("J1"));
    assert!(h.notices.acknowledge(&notice));
    assert!(h.store.is_marked("J1"));

    // No further ticks after completion.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.checker.calls("J1"), 2);
    assert!(!h.scheduler.is_running("J1"));
    assert!(h.scheduler.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_tick_is_followed_by_a_normal_tick() {
    let checker = ScriptedChecker::default().script(
        "J1",
        vec![Err(network_error()), Ok(PollStatus::Completed)],
    );
    let mut h = harness(checker, MemoryMarkerStore::new(), PollSettings::default());
    let started = Instant::now();
    h.scheduler.start("J1", &record("HW1"), 1);

    match h.scheduler.next_event().await.unwrap() {
        EngineEvent::TickCompleted { result, .. } => {
            assert_eq!(result.unwrap_err().kind, FailureKind::Network);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_millis(3000));

    match h.scheduler.next_event().await.unwrap() {
        EngineEvent::TickCompleted { result, .. } => {
            assert_eq!(result, Ok(PollStatus::Completed));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::from_millis(6000));
    assert_eq!(
        next_loop_end(&mut h.scheduler).await,
        ("J1".to_string(), LoopExit::Completed)
    );
    assert!(h.notices.try_recv().is_some());
}

#[tokio::test(start_paused = true)]
async fn marked_jobs_never_reach_the_network() {
    let store = MemoryMarkerStore::with_marked(vec!["J1".to_string()]);
    let mut h = harness(ScriptedChecker::default(), store, PollSettings::default());

    assert_eq!(
        h.scheduler.start("J1", &record("HW1"), 1),
        StartOutcome::AlreadyCompleted
    );
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(h.checker.calls("J1"), 0);
    assert!(h.scheduler.active_jobs().is_empty());
    assert!(h.notices.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn one_job_completing_leaves_the_other_running() {
    let checker = ScriptedChecker::default().script("J2", vec![Ok(PollStatus::Completed)]);
    let mut h = harness(checker, MemoryMarkerStore::new(), PollSettings::default());

    let mut registry = JobRegistry::new();
    registry.insert("J1", record("HW1")).unwrap();
    registry.insert("J2", record("HW2")).unwrap();
    registry.insert("MOCK_JOB_001", JobRecord::mock()).unwrap();
    let pollable = select_pollable(registry.get_all());
    assert_eq!(h.scheduler.start_all(&pollable, 1), 2);

    assert_eq!(
        next_loop_end(&mut h.scheduler).await,
        ("J2".to_string(), LoopExit::Completed)
    );
    assert!(h.scheduler.is_running("J1"));
    assert_eq!(h.scheduler.active_jobs(), vec!["J1".to_string()]);

    let calls_before = h.checker.calls("J1");
    tokio::time::sleep(Duration::from_millis(9000)).await;
    assert!(h.checker.calls("J1") >= calls_before + 2);
    assert_eq!(h.checker.calls("MOCK_JOB_001"), 0);

    let notice = h.notices.try_recv().unwrap();
    assert_eq!(notice.job_id, "J2");
    assert!(h.notices.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn starting_twice_keeps_a_single_loop() {
    let mut h = harness(
        ScriptedChecker::default(),
        MemoryMarkerStore::new(),
        PollSettings::default(),
    );
    assert_eq!(h.scheduler.start("J1", &record("HW1"), 1), StartOutcome::Started);
    assert_eq!(
        h.scheduler.start("J1", &record("HW1"), 1),
        StartOutcome::AlreadyRunning
    );

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(h.checker.calls("J1"), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_loop() {
    let mut h = harness(
        ScriptedChecker::default(),
        MemoryMarkerStore::new(),
        PollSettings::default(),
    );
    h.scheduler.start("J1", &record("HW1"), 1);
    h.scheduler.start("J2", &record("HW2"), 1);

    assert!(h.scheduler.stop("J1"));
    assert!(!h.scheduler.stop("J1"));
    assert_eq!(
        next_loop_end(&mut h.scheduler).await,
        ("J1".to_string(), LoopExit::Cancelled)
    );

    tokio::time::sleep(Duration::from_millis(7000)).await;
    assert_eq!(h.checker.calls("J1"), 0);
    assert!(h.checker.calls("J2") >= 2);
    assert_eq!(h.scheduler.active_jobs(), vec!["J2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn restarted_loop_reports_its_own_generation() {
    let mut h = harness(
        ScriptedChecker::default(),
        MemoryMarkerStore::new(),
        PollSettings::default(),
    );
    h.scheduler.start("J1", &record("HW1"), 1);
    assert!(h.scheduler.stop("J1"));
    assert_eq!(h.scheduler.start("J1", &record("HW1"), 2), StartOutcome::Started);

    match h.scheduler.next_event().await.unwrap() {
        EngineEvent::LoopEnded {
            generation, exit, ..
        } => {
            assert_eq!(generation, 1);
            assert_eq!(exit, LoopExit::Cancelled);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match h.scheduler.next_event().await.unwrap() {
        EngineEvent::TickCompleted { generation, .. } => assert_eq!(generation, 2),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(h.scheduler.is_running("J1"));
}

#[tokio::test(start_paused = true)]
async fn max_age_evicts_abandoned_loops() {
    let settings = PollSettings {
        interval: Duration::from_secs(1),
        max_age: Some(Duration::from_millis(3500)),
    };
    let mut h = harness(ScriptedChecker::default(), MemoryMarkerStore::new(), settings);
    h.scheduler.start("J1", &record("HW1"), 1);

    assert_eq!(
        next_loop_end(&mut h.scheduler).await,
        ("J1".to_string(), LoopExit::Expired)
    );
    assert_eq!(h.checker.calls("J1"), 3);
    assert!(!h.store.is_marked("J1"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_every_loop() {
    let mut h = harness(
        ScriptedChecker::default(),
        MemoryMarkerStore::new(),
        PollSettings::default(),
    );
    let jobs: BTreeMap<String, JobRecord> = [("A", "a"), ("B", "b"), ("C", "c")]
        .into_iter()
        .map(|(id, name)| (id.to_string(), record(name)))
        .collect();
    assert_eq!(h.scheduler.start_all(&jobs, 1), 3);

    h.scheduler.shutdown().await;

    assert!(h.scheduler.active_jobs().is_empty());
    let mut ended = Vec::new();
    while let Some(event) = h.scheduler.try_recv() {
        if let EngineEvent::LoopEnded { job_id, exit, .. } = event {
            assert_eq!(exit, LoopExit::Cancelled);
            ended.push(job_id);
        }
    }
    ended.sort();
    assert_eq!(ended, vec!["A", "B", "C"]);
}
