use std::sync::Arc;
use std::time::Duration;

use grade_watch_core::JobRecord;
use grade_watch_engine::{
    CheckSettings, CompletionMarkerStore, CompletionNotifier, EngineEvent, LoopExit, MemoryMarkerStore, PollSettings,
    PollerScheduler, ReqwestStatusChecker,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn polls_backend_until_completed_then_notifies_once() {
    watch_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ai_grading/grade_result/J1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ai_grading/grade_result/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .up_to_n_times(1)
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ai_grading/grade_result/J1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "completed"})))
        .with_priority(3)
        .mount(&server)
        .await;

    let checker = ReqwestStatusChecker::new(&server.uri(), CheckSettings::default()).unwrap();
    let store = Arc::new(MemoryMarkerStore::new());
    let (notifier, mut notices) = CompletionNotifier::channel(store.clone());
    let settings = PollSettings {
        interval: Duration::from_millis(20),
        max_age: None,
    };
    let mut scheduler = PollerScheduler::new(settings, Arc::new(checker), notifier);
    scheduler.start("J1", &JobRecord::new(Some("HW1"), Some("t1"), false), 1);

    let mut ticks = Vec::new();
    let exit = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match scheduler.next_event().await {
                Some(EngineEvent::TickCompleted { result, .. }) => ticks.push(result.is_ok()),
                Some(EngineEvent::LoopEnded { exit, .. }) => break exit,
                None => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("loop ends before timeout");

    assert_eq!(exit, LoopExit::Completed);
    assert_eq!(ticks, vec![false, true, true]);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.task_name, "HW1");
    assert!(notices.try_recv().is_none());
    assert!(notices.acknowledge(&notice));
    assert_eq!(store.marked_ids(), vec!["J1".to_string()]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}
