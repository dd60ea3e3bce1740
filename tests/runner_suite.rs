use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use overlay_sessions::ambient::AmbientSettings;
use overlay_sessions::definition::{ParameterSet, Phase, SessionDefinition};
use overlay_sessions::effects::LoggingHost;
use overlay_sessions::events::{EventSink, SessionEvent};
use overlay_sessions::runner::{SessionHandle, SessionRunner};
use overlay_sessions::session::{SessionEngine, SessionError};

#[derive(Clone, Default)]
struct SharedSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
    stop_on_first_progress: Option<Arc<Mutex<Option<SessionHandle>>>>,
}

impl EventSink for SharedSink {
    fn emit(&mut self, event: SessionEvent) {
        if let (Some(slot), SessionEvent::ProgressUpdated { .. }) =
            (&self.stop_on_first_progress, &event)
        {
            if let Some(handle) = slot.lock().expect("handle slot").take() {
                handle.stop();
            }
        }
        self.events.lock().expect("event log").push(event);
    }
}

fn definition(duration_min: f32) -> SessionDefinition {
    SessionDefinition {
        id: "runner_test".to_string(),
        name: "Runner Test".to_string(),
        duration_min,
        bonus_xp: 10,
        phases: vec![Phase {
            start_min: 0.0,
            name: "Main".to_string(),
            description: String::new(),
        }],
        params: ParameterSet::default(),
    }
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn spawn_runner(sink: SharedSink, time_scale: f32) -> SessionRunner {
    SessionRunner::spawn(
        SessionEngine::with_seed(99),
        Box::new(LoggingHost::new(AmbientSettings::default())),
        Box::new(sink),
        Duration::from_millis(5),
        time_scale,
    )
}

#[test]
fn runs_a_session_to_completion() {
    let sink = SharedSink::default();
    let events = Arc::clone(&sink.events);
    // One session minute per 50 wall milliseconds.
    let runner = spawn_runner(sink, 1200.0);
    let handle = runner.handle();

    handle.start(definition(1.0)).expect("start should succeed");
    assert!(handle.is_running());

    assert!(
        wait_until(Duration::from_secs(5), || !handle.is_running()),
        "session should complete"
    );

    let log = events.lock().expect("event log");
    assert_eq!(log.first(), Some(&SessionEvent::Started));
    assert!(matches!(
        log.last(),
        Some(SessionEvent::Completed { bonus_xp: 10, .. })
    ));
}

#[test]
fn rejects_start_while_running_and_stops_on_request() {
    let sink = SharedSink::default();
    let events = Arc::clone(&sink.events);
    let runner = spawn_runner(sink, 1.0);
    let handle = runner.handle();

    handle.start(definition(30.0)).expect("start should succeed");
    let err = handle
        .start(definition(5.0))
        .expect_err("second start should be rejected, not queued");
    assert_eq!(err, SessionError::AlreadyRunning);
    assert!(handle.is_running(), "active session must be unaffected");

    handle.stop();
    assert!(
        wait_until(Duration::from_secs(5), || !handle.is_running()),
        "stop should take effect"
    );
    let log = events.lock().expect("event log");
    assert_eq!(log.last(), Some(&SessionEvent::Stopped));
}

#[test]
fn exposes_read_only_session_queries() {
    let sink = SharedSink::default();
    let runner = spawn_runner(sink, 1.0);
    let handle = runner.handle();

    assert!(!handle.is_running());
    assert!(handle.current_session().is_none());

    handle.start(definition(30.0)).expect("start should succeed");
    let current = handle.current_session().expect("session should be visible");
    assert_eq!(current.id, "runner_test");
    assert!(handle.elapsed_min() >= 0.0);
    assert!(handle.remaining_min() <= 30.0);
    assert!((0.0..=100.0).contains(&handle.progress_percent()));

    handle.stop();
    assert!(wait_until(Duration::from_secs(5), || !handle.is_running()));
    assert!(handle.current_session().is_none());
}

#[test]
fn stop_requested_from_an_event_sink_is_honored() {
    let slot = Arc::new(Mutex::new(None));
    let sink = SharedSink {
        events: Arc::default(),
        stop_on_first_progress: Some(Arc::clone(&slot)),
    };
    let events = Arc::clone(&sink.events);
    let runner = spawn_runner(sink, 60.0);
    let handle = runner.handle();
    *slot.lock().expect("handle slot") = Some(handle.clone());

    handle.start(definition(30.0)).expect("start should succeed");
    assert!(
        wait_until(Duration::from_secs(5), || !handle.is_running()),
        "sink-requested stop should land at the next command"
    );
    {
        let log = events.lock().expect("event log");
        assert_eq!(log.last(), Some(&SessionEvent::Stopped));
    }

    // The runner survives and can host another session.
    handle
        .start(definition(30.0))
        .expect("runner should still accept sessions");
    handle.stop();
    assert!(wait_until(Duration::from_secs(5), || !handle.is_running()));
}

#[test]
fn shutdown_finalizes_the_active_session() {
    let sink = SharedSink::default();
    let events = Arc::clone(&sink.events);
    let runner = spawn_runner(sink, 1.0);
    let handle = runner.handle();

    handle.start(definition(30.0)).expect("start should succeed");
    runner.shutdown();

    let log = events.lock().expect("event log");
    assert_eq!(log.last(), Some(&SessionEvent::Stopped));
    drop(log);

    let err = handle
        .start(definition(5.0))
        .expect_err("handle should report the controller gone");
    assert_eq!(err, SessionError::ControllerUnavailable);
}
