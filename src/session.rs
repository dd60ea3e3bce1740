//! The session lifecycle controller: a single-context state machine that
//! owns one running session at a time, advances it from explicit elapsed
//! times, and restores ambient settings on every exit path.

use std::fmt;

use tracing::{debug, info, warn};

use crate::ambient::{AmbientField, AmbientSnapshot};
use crate::definition::{DefinitionError, SessionDefinition};
use crate::effects::{EffectHost, EffectId};
use crate::events::{EventSink, SessionEvent};
use crate::schedule::{
    BurstRuntime, BurstSignal, DelayedFeature, Tuning, burst_times, jittered_activation,
};
use crate::timeline::{resolve_phase, round_per_hour, round_percent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completing,
    Cancelling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    AlreadyRunning,
    InvalidDefinition(DefinitionError),
    ControllerUnavailable,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a session is already running"),
            Self::InvalidDefinition(err) => write!(f, "invalid session definition: {err}"),
            Self::ControllerUnavailable => write!(f, "session controller is not running"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Last values pushed through the Effects Interface, so unchanged rounded
/// values do not produce redundant downstream calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LastSent {
    flash_opacity: Option<u8>,
    flash_per_hour: Option<u32>,
    pink_opacity: Option<u8>,
    dim_opacity: Option<u8>,
    ambient_level: Option<u8>,
}

/// Mutable per-session state. Created by `start`, destroyed on completion or
/// stop; nothing here survives across sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSession {
    definition: SessionDefinition,
    phase_index: usize,
    elapsed_min: f32,
    delayed: Vec<DelayedFeature>,
    bursts: BurstRuntime,
    snapshot: AmbientSnapshot,
    last_sent: LastSent,
}

impl RuntimeSession {
    pub fn definition(&self) -> &SessionDefinition {
        &self.definition
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn elapsed_min(&self) -> f32 {
        self.elapsed_min
    }

    pub fn delayed(&self) -> &[DelayedFeature] {
        &self.delayed
    }

    pub fn burst_times(&self) -> &[f32] {
        self.bursts.times()
    }

    pub fn burst_active(&self) -> bool {
        self.bursts.is_active()
    }

    pub fn snapshot(&self) -> &AmbientSnapshot {
        &self.snapshot
    }

    fn delayed_active(&self, effect: EffectId) -> bool {
        self.delayed
            .iter()
            .find(|d| d.effect == effect)
            .map(|d| d.fired && !d.skipped)
            .unwrap_or(true)
    }
}

pub struct SessionEngine {
    state: SessionState,
    session: Option<RuntimeSession>,
    rng: fastrand::Rng,
    tuning: Tuning,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEngine {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Deterministic engine for tests and reproducible sessions.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    pub fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
            rng,
            tuning: Tuning::default(),
        }
    }

    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn session(&self) -> Option<&RuntimeSession> {
        self.session.as_ref()
    }

    pub fn current_session(&self) -> Option<&SessionDefinition> {
        self.session.as_ref().map(RuntimeSession::definition)
    }

    pub fn elapsed_min(&self) -> f32 {
        self.session.as_ref().map_or(0.0, RuntimeSession::elapsed_min)
    }

    pub fn remaining_min(&self) -> f32 {
        self.session
            .as_ref()
            .map_or(0.0, |rt| (rt.definition.duration_min - rt.elapsed_min).max(0.0))
    }

    pub fn progress_percent(&self) -> f32 {
        self.session.as_ref().map_or(0.0, |rt| {
            (rt.elapsed_min / rt.definition.duration_min * 100.0).clamp(0.0, 100.0)
        })
    }

    /// Begin a session. Fails without touching any state if another session
    /// is active or the definition does not validate.
    pub fn start(
        &mut self,
        definition: SessionDefinition,
        host: &mut dyn EffectHost,
        events: &mut dyn EventSink,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRunning);
        }
        definition
            .validate()
            .map_err(SessionError::InvalidDefinition)?;

        let snapshot = AmbientSnapshot::capture(&host.ambient());

        let p = &definition.params;
        let mut delayed = Vec::new();
        if p.pink_filter.enabled && p.pink_filter.start_min > 0.0 {
            let at = jittered_activation(&mut self.rng, p.pink_filter.start_min, &self.tuning);
            delayed.push(DelayedFeature::new(
                EffectId::PinkFilter,
                p.pink_filter.start_min,
                at,
            ));
        }
        if p.dim_filter.enabled && p.dim_filter.start_min > 0.0 {
            let at = jittered_activation(&mut self.rng, p.dim_filter.start_min, &self.tuning);
            delayed.push(DelayedFeature::new(
                EffectId::DimFilter,
                p.dim_filter.start_min,
                at,
            ));
        }
        if p.floating_text.enabled && p.floating_text.start_min > 0.0 {
            let at = jittered_activation(&mut self.rng, p.floating_text.start_min, &self.tuning);
            delayed.push(DelayedFeature::new(
                EffectId::FloatingText,
                p.floating_text.start_min,
                at,
            ));
        }
        let times = burst_times(
            &mut self.rng,
            &p.bubbles,
            definition.duration_min,
            &self.tuning,
        );
        debug!(count = times.len(), "burst schedule generated");
        let bursts = BurstRuntime::new(times, p.bubbles.magnitude);

        let mut last_sent = LastSent::default();
        apply_initial(&definition, &mut last_sent, host);

        info!(
            id = %definition.id,
            name = %definition.name,
            duration_min = definition.duration_min,
            "session started"
        );
        let phase0 = definition.phases[0].name.clone();
        self.session = Some(RuntimeSession {
            definition,
            phase_index: 0,
            elapsed_min: 0.0,
            delayed,
            bursts,
            snapshot,
            last_sent,
        });
        self.state = SessionState::Running;
        events.emit(SessionEvent::Started);
        events.emit(SessionEvent::PhaseChanged {
            index: 0,
            name: phase0,
        });
        Ok(())
    }

    /// Advance the session to `elapsed_min`. No-op unless running.
    pub fn tick(
        &mut self,
        elapsed_min: f32,
        host: &mut dyn EffectHost,
        events: &mut dyn EventSink,
    ) {
        if self.state != SessionState::Running {
            return;
        }
        let duration = match &self.session {
            Some(rt) => rt.definition.duration_min,
            None => return,
        };
        if elapsed_min >= duration {
            self.state = SessionState::Completing;
            self.finalize(elapsed_min, true, host, events);
            return;
        }

        let Some(rt) = self.session.as_mut() else {
            return;
        };
        rt.elapsed_min = elapsed_min;

        let index = resolve_phase(&rt.definition.phases, elapsed_min);
        if index > rt.phase_index {
            rt.phase_index = index;
            let name = rt.definition.phases[index].name.clone();
            debug!(index, phase = %name, "phase changed");
            events.emit(SessionEvent::PhaseChanged { index, name });
        }

        if rt.definition.params.flash.enabled {
            let opacity =
                round_percent(rt.definition.params.flash.opacity.value_at(elapsed_min));
            if rt.last_sent.flash_opacity != Some(opacity) {
                rt.last_sent.flash_opacity = Some(opacity);
                host.set_opacity(EffectId::Flash, opacity);
            }
            let per_hour =
                round_per_hour(rt.definition.params.flash.per_hour.value_at(elapsed_min));
            if rt.last_sent.flash_per_hour != Some(per_hour) {
                rt.last_sent.flash_per_hour = Some(per_hour);
                host.set_frequency(EffectId::Flash, per_hour);
            }
        }
        let pink_on = rt.definition.params.pink_filter.enabled
            && (rt.definition.params.pink_filter.start_min <= 0.0
                || rt.delayed_active(EffectId::PinkFilter));
        if pink_on {
            let opacity =
                round_percent(rt.definition.params.pink_filter.opacity.value_at(elapsed_min));
            if rt.last_sent.pink_opacity != Some(opacity) {
                rt.last_sent.pink_opacity = Some(opacity);
                host.set_opacity(EffectId::PinkFilter, opacity);
            }
        }
        let dim_on = rt.definition.params.dim_filter.enabled
            && (rt.definition.params.dim_filter.start_min <= 0.0
                || rt.delayed_active(EffectId::DimFilter));
        if dim_on {
            let opacity =
                round_percent(rt.definition.params.dim_filter.opacity.value_at(elapsed_min));
            if rt.last_sent.dim_opacity != Some(opacity) {
                rt.last_sent.dim_opacity = Some(opacity);
                host.set_opacity(EffectId::DimFilter, opacity);
            }
        }
        if rt.definition.params.ambient_loop.enabled {
            let level =
                round_percent(rt.definition.params.ambient_loop.level.value_at(elapsed_min));
            if rt.last_sent.ambient_level != Some(level) {
                rt.last_sent.ambient_level = Some(level);
                host.set_intensity(EffectId::AmbientLoop, level);
            }
        }

        for i in 0..rt.delayed.len() {
            let d = rt.delayed[i];
            if d.fired || elapsed_min < d.activation_min {
                continue;
            }
            rt.delayed[i].fired = true;
            if !host.effect_available(d.effect) {
                rt.delayed[i].skipped = true;
                debug!(
                    effect = d.effect.label(),
                    "effect resources unavailable; skipping for this session"
                );
                continue;
            }
            host.enable_effect(d.effect, true);
            info!(
                effect = d.effect.label(),
                target_min = d.target_min,
                actual_min = elapsed_min,
                "delayed feature activated"
            );
        }

        if let Some(signal) = rt.bursts.tick(elapsed_min, &mut self.rng, &self.tuning) {
            match signal {
                BurstSignal::Begin { magnitude } => {
                    debug!(magnitude, "burst begins");
                    host.set_burst_active(EffectId::Bubbles, true, magnitude);
                }
                BurstSignal::End => {
                    debug!("burst ends");
                    host.set_burst_active(EffectId::Bubbles, false, 0);
                }
            }
        }

        let remaining_min = (duration - elapsed_min).max(0.0);
        let percent = (elapsed_min / duration * 100.0).clamp(0.0, 100.0);
        events.emit(SessionEvent::ProgressUpdated {
            elapsed_min,
            remaining_min,
            percent,
        });
    }

    /// Stop the active session, restoring the snapshot. Idempotent when
    /// idle; emits `Stopped` instead of `Completed` and awards no XP.
    pub fn stop(&mut self, host: &mut dyn EffectHost, events: &mut dyn EventSink) {
        if self.state == SessionState::Idle {
            return;
        }
        self.state = SessionState::Cancelling;
        let elapsed_min = self.elapsed_min();
        self.finalize(elapsed_min, false, host, events);
    }

    fn finalize(
        &mut self,
        elapsed_min: f32,
        completed: bool,
        host: &mut dyn EffectHost,
        events: &mut dyn EventSink,
    ) {
        let Some(rt) = self.session.take() else {
            self.state = SessionState::Idle;
            return;
        };

        if rt.bursts.is_active() {
            host.set_burst_active(EffectId::Bubbles, false, 0);
        }
        for field in AmbientField::ALL {
            if let Err(err) = host.write_ambient(field, rt.snapshot.value(field)) {
                warn!(
                    field = field.as_str(),
                    error = %err,
                    "ambient restore write failed"
                );
            }
        }

        self.state = SessionState::Idle;
        if completed {
            info!(id = %rt.definition.id, elapsed_min, "session completed");
            events.emit(SessionEvent::Completed {
                bonus_xp: rt.definition.bonus_xp,
                elapsed_min,
                definition: rt.definition,
            });
        } else {
            info!(id = %rt.definition.id, elapsed_min, "session stopped");
            events.emit(SessionEvent::Stopped);
        }
    }
}

/// Push every immediate setting of a freshly started session: enable flags
/// for all features (delayed ones start disabled) and the ramp values at
/// elapsed 0 for everything already on.
fn apply_initial(
    definition: &SessionDefinition,
    last_sent: &mut LastSent,
    host: &mut dyn EffectHost,
) {
    let p = &definition.params;

    host.enable_effect(EffectId::Flash, p.flash.enabled);
    if p.flash.enabled {
        let opacity = round_percent(p.flash.opacity.value_at(0.0));
        host.set_opacity(EffectId::Flash, opacity);
        last_sent.flash_opacity = Some(opacity);
        let per_hour = round_per_hour(p.flash.per_hour.value_at(0.0));
        host.set_frequency(EffectId::Flash, per_hour);
        last_sent.flash_per_hour = Some(per_hour);
    }

    let pink_now = p.pink_filter.enabled && p.pink_filter.start_min <= 0.0;
    host.enable_effect(EffectId::PinkFilter, pink_now);
    if pink_now {
        let opacity = round_percent(p.pink_filter.opacity.value_at(0.0));
        host.set_opacity(EffectId::PinkFilter, opacity);
        last_sent.pink_opacity = Some(opacity);
    }

    let dim_now = p.dim_filter.enabled && p.dim_filter.start_min <= 0.0;
    host.enable_effect(EffectId::DimFilter, dim_now);
    if dim_now {
        let opacity = round_percent(p.dim_filter.opacity.value_at(0.0));
        host.set_opacity(EffectId::DimFilter, opacity);
        last_sent.dim_opacity = Some(opacity);
    }

    host.enable_effect(EffectId::AmbientLoop, p.ambient_loop.enabled);
    if p.ambient_loop.enabled {
        let level = round_percent(p.ambient_loop.level.value_at(0.0));
        host.set_intensity(EffectId::AmbientLoop, level);
        last_sent.ambient_level = Some(level);
    }

    let text_now = p.floating_text.enabled && p.floating_text.start_min <= 0.0;
    host.enable_effect(EffectId::FloatingText, text_now);

    host.enable_effect(EffectId::Bubbles, p.bubbles.enabled);
}
