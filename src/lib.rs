//! Session orchestration engine for a timed overlay-effects application.
//!
//! The engine runs a single timed, multi-effect session: each tick it
//! resolves the active narration phase, evaluates linear parameter ramps,
//! fires jittered delayed activations and randomized burst windows, and
//! pushes the results through an abstract effects interface. Ambient user
//! settings are snapshotted when a session starts and restored verbatim when
//! it ends, however it ends. Rendering, audio and input live behind the
//! [`effects::EffectHost`] boundary and are not part of this crate's job.

pub mod ambient;
pub mod app;
pub mod config;
pub mod definition;
pub mod effects;
pub mod events;
pub mod runner;
pub mod schedule;
pub mod session;
pub mod timeline;

pub use ambient::{AmbientField, AmbientSettings, AmbientSnapshot, AmbientValue};
pub use definition::{DefinitionError, ParameterSet, Phase, Ramp, SessionDefinition};
pub use effects::{EffectHost, EffectId, LoggingHost};
pub use events::{EventSink, NullSink, SessionEvent};
pub use runner::{SessionHandle, SessionRunner};
pub use schedule::Tuning;
pub use session::{SessionEngine, SessionError, SessionState};
pub use timeline::{ramp, resolve_phase};
