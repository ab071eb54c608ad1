use std::sync::{Arc, Mutex};
use std::time::Duration;

use fwctl_core::{Effect, LogTarget, LogViewId, Msg, SelectedFile, TimerId, TimerPurpose};
use fwctl_engine::{
    spawn_timer, EffectExecutor, EngineHandle, EngineSettings, MsgSink, ReqwestDeviceClient,
    TimerRegistry,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    msgs: Mutex<Vec<Msg>>,
}

impl TestSink {
    fn take(&self) -> Vec<Msg> {
        self.msgs.lock().unwrap().drain(..).collect()
    }

    fn len(&self) -> usize {
        self.msgs.lock().unwrap().len()
    }

    async fn wait_for(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} messages"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl MsgSink for TestSink {
    fn send(&self, msg: Msg) -> bool {
        self.msgs.lock().unwrap().push(msg);
        true
    }
}

fn executor_for(server: &MockServer, sink: Arc<TestSink>) -> EffectExecutor {
    let client = ReqwestDeviceClient::new(EngineSettings {
        base_url: server.uri(),
        ..EngineSettings::default()
    })
    .expect("client");
    EffectExecutor::new(Arc::new(client), sink)
}

#[tokio::test]
async fn every_scheduled_catalog_refresh_reaches_the_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/firmware/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Filename: new.bin\n"))
        .expect(3)
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut executor = executor_for(&server, sink.clone());
    executor.execute(Effect::ScheduleCatalogRefreshes {
        delays: vec![
            Duration::from_millis(10),
            Duration::from_millis(30),
            Duration::from_millis(60),
        ],
    });

    sink.wait_for(3).await;
    for msg in sink.take() {
        match msg {
            Msg::CatalogFetched(Ok(snapshot)) => assert!(snapshot.contains("new.bin")),
            other => panic!("unexpected message {other:?}"),
        }
    }
    server.verify().await;
}

#[tokio::test]
async fn upload_completion_carries_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/firmwareupload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("File uploaded successfully"))
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut executor = executor_for(&server, sink.clone());
    executor.execute(Effect::UploadFirmware {
        session: 9,
        file: SelectedFile::new("fw.bin", vec![7u8; 64]),
    });

    sink.wait_for(1).await;
    assert_eq!(
        sink.take(),
        vec![Msg::UploadCompleted {
            session: 9,
            result: Ok("File uploaded successfully".into()),
        }]
    );
}

#[tokio::test]
async fn log_fetch_keeps_its_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/log"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1s] hello"))
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let mut executor = executor_for(&server, sink.clone());
    executor.execute(Effect::FetchLog {
        target: LogTarget::AllOpen,
        delay: Duration::from_millis(20),
    });

    sink.wait_for(1).await;
    match sink.take().remove(0) {
        Msg::LogFetched {
            target: LogTarget::AllOpen,
            result: Ok(entries),
        } => assert_eq!(entries.len(), 1),
        other => panic!("unexpected message {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_device_reports_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let sink = Arc::new(TestSink::default());
    let client = ReqwestDeviceClient::new(EngineSettings {
        base_url: uri,
        connect_timeout: Duration::from_millis(200),
        ..EngineSettings::default()
    })
    .expect("client");
    let mut executor = EffectExecutor::new(Arc::new(client), sink.clone());
    executor.execute(Effect::FetchTelemetry);

    sink.wait_for(1).await;
    assert!(matches!(
        sink.take().as_slice(),
        [Msg::TelemetryFetched(Err(_))]
    ));
}

#[tokio::test]
async fn stop_timer_removes_task() {
    let server = MockServer::start().await;
    let sink = Arc::new(TestSink::default());
    let mut executor = executor_for(&server, sink.clone());

    executor.execute(Effect::StartTimer {
        timer: TimerId(3),
        every: Duration::from_secs(60),
        purpose: TimerPurpose::Telemetry,
    });
    assert!(executor.timers().is_running(TimerId(3)));

    executor.execute(Effect::StopTimer { timer: TimerId(3) });
    assert!(!executor.timers().is_running(TimerId(3)));
    assert_eq!(executor.timers().live(), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_ticks_once_per_period() {
    let sink = Arc::new(TestSink::default());
    let mut registry = TimerRegistry::new();
    registry.insert(
        TimerId(1),
        spawn_timer(
            TimerId(1),
            Duration::from_millis(200),
            TimerPurpose::UploadProgress {
                session: 4,
                max_step: 15.0,
            },
            sink.clone(),
        ),
    );

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let msgs = sink.take();
    assert_eq!(msgs.len(), 5);
    for msg in msgs {
        match msg {
            Msg::UploadProgressTick { session, increment } => {
                assert_eq!(session, 4);
                assert!((0.0..15.0).contains(&increment));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn replacing_a_timer_leaves_one_task() {
    let sink = Arc::new(TestSink::default());
    let mut registry = TimerRegistry::new();
    let every = Duration::from_millis(100);

    for _ in 0..5 {
        let task = spawn_timer(TimerId(1), every, TimerPurpose::Telemetry, sink.clone());
        registry.insert(TimerId(1), task);
    }
    let replaced = registry.insert(
        TimerId(1),
        spawn_timer(
            TimerId(1),
            every,
            TimerPurpose::LogPoll(LogViewId::PRIMARY),
            sink.clone(),
        ),
    );
    assert!(replaced);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(registry.live(), 1);
    let msgs = sink.take();
    assert_eq!(msgs.len(), 3);
    assert!(msgs.iter().all(|msg| matches!(
        msg,
        Msg::LogPollDue {
            view: LogViewId::PRIMARY,
            timer: TimerId(1)
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn dropping_registry_aborts_timers() {
    let sink = Arc::new(TestSink::default());
    let mut registry = TimerRegistry::new();
    registry.insert(
        TimerId(2),
        spawn_timer(
            TimerId(2),
            Duration::from_millis(100),
            TimerPurpose::Telemetry,
            sink.clone(),
        ),
    );
    drop(registry);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.len(), 0);
}

#[tokio::test]
async fn engine_thread_executes_effects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uptime"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Uptime: 12s"))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(TestSink::default());
    let engine = EngineHandle::new(
        EngineSettings {
            base_url: server.uri(),
            ..EngineSettings::default()
        },
        sink.clone(),
    )
    .expect("engine");
    engine.execute_all(vec![Effect::FetchTelemetry]);

    sink.wait_for(1).await;
    assert!(matches!(
        sink.take().as_slice(),
        [Msg::TelemetryFetched(Ok(_))]
    ));
    engine.shutdown();
}
