//! Lifecycle events emitted by the engine for UI and telemetry consumers.

use crate::definition::SessionDefinition;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    PhaseChanged {
        index: usize,
        name: String,
    },
    ProgressUpdated {
        elapsed_min: f32,
        remaining_min: f32,
        percent: f32,
    },
    Completed {
        definition: SessionDefinition,
        elapsed_min: f32,
        bonus_xp: u32,
    },
    Stopped,
}

/// Consumer of lifecycle events. Delivery is synchronous on the engine's
/// execution context; sinks must not block.
pub trait EventSink {
    fn emit(&mut self, event: SessionEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: SessionEvent) {}
}
