//! The engine's execution context: one dedicated thread owns the engine,
//! effect host and event sink, and everything else talks to it through a
//! command channel. External `start`/`stop` calls are marshaled here, so the
//! engine itself never sees concurrent mutation; a stop request takes effect
//! when the thread picks it up, never mid-tick.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::definition::SessionDefinition;
use crate::effects::EffectHost;
use crate::events::EventSink;
use crate::session::{SessionEngine, SessionError};

enum Command {
    Start(SessionDefinition, mpsc::Sender<Result<(), SessionError>>),
    Stop,
    Shutdown,
}

/// Read-only view of the controller, refreshed after every command and tick.
#[derive(Debug, Clone, Default)]
pub struct Status {
    pub running: bool,
    pub definition: Option<SessionDefinition>,
    pub elapsed_min: f32,
    pub remaining_min: f32,
    pub percent: f32,
}

/// Cloneable handle onto the runner thread. Commands are serialized through
/// the channel; queries read the latest status snapshot without touching
/// engine state.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
    status: Arc<Mutex<Status>>,
}

impl SessionHandle {
    /// Ask the runner to start a session and wait for the verdict.
    pub fn start(&self, definition: SessionDefinition) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Command::Start(definition, reply_tx))
            .map_err(|_| SessionError::ControllerUnavailable)?;
        reply_rx
            .recv()
            .map_err(|_| SessionError::ControllerUnavailable)?
    }

    /// Request a stop. Fire-and-forget; takes effect at the next command the
    /// runner processes. Safe to call from an event sink during a tick.
    pub fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    pub fn status(&self) -> Status {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.status().running
    }

    pub fn current_session(&self) -> Option<SessionDefinition> {
        self.status().definition
    }

    pub fn elapsed_min(&self) -> f32 {
        self.status().elapsed_min
    }

    pub fn remaining_min(&self) -> f32 {
        self.status().remaining_min
    }

    pub fn progress_percent(&self) -> f32 {
        self.status().percent
    }
}

/// Owns the runner thread; dropping it shuts the thread down.
pub struct SessionRunner {
    tx: mpsc::Sender<Command>,
    status: Arc<Mutex<Status>>,
    join: Option<JoinHandle<()>>,
}

impl SessionRunner {
    /// Spawn the execution context. `tick_interval` is the wall-clock tick
    /// resolution; `time_scale` maps wall minutes to session minutes (1.0
    /// for real time, larger for accelerated demo runs).
    pub fn spawn(
        mut engine: SessionEngine,
        mut host: Box<dyn EffectHost + Send>,
        mut events: Box<dyn EventSink + Send>,
        tick_interval: Duration,
        time_scale: f32,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let status = Arc::new(Mutex::new(Status::default()));
        let status_writer = Arc::clone(&status);
        let scale = if time_scale.is_finite() && time_scale > 0.0 {
            time_scale
        } else {
            1.0
        };

        let join = thread::spawn(move || {
            let mut clock: Option<Instant> = None;
            loop {
                match rx.recv_timeout(tick_interval) {
                    Ok(Command::Start(definition, reply)) => {
                        let result = engine.start(definition, &mut *host, &mut *events);
                        if result.is_ok() {
                            clock = Some(Instant::now());
                        }
                        refresh_status(&status_writer, &engine);
                        let _ = reply.send(result);
                    }
                    Ok(Command::Stop) => {
                        engine.stop(&mut *host, &mut *events);
                        clock = None;
                        refresh_status(&status_writer, &engine);
                    }
                    Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                        engine.stop(&mut *host, &mut *events);
                        refresh_status(&status_writer, &engine);
                        debug!("session runner shut down");
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(started) = clock {
                            let elapsed_min =
                                started.elapsed().as_secs_f32() / 60.0 * scale;
                            engine.tick(elapsed_min, &mut *host, &mut *events);
                            if !engine.is_running() {
                                clock = None;
                            }
                            refresh_status(&status_writer, &engine);
                        }
                    }
                }
            }
        });

        Self {
            tx,
            status,
            join: Some(join),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
            status: Arc::clone(&self.status),
        }
    }

    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn refresh_status(status: &Arc<Mutex<Status>>, engine: &SessionEngine) {
    let mut s = status.lock().unwrap_or_else(PoisonError::into_inner);
    s.running = engine.is_running();
    s.definition = engine.current_session().cloned();
    s.elapsed_min = engine.elapsed_min();
    s.remaining_min = engine.remaining_min();
    s.percent = engine.progress_percent();
}
