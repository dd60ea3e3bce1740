//! The boundary between the engine and the presentation layer.

use tracing::info;

use crate::ambient::{AmbientField, AmbientSettings, AmbientValue};

/// Controllable effects of the overlay application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectId {
    Flash,
    PinkFilter,
    DimFilter,
    AmbientLoop,
    FloatingText,
    Bubbles,
}

impl EffectId {
    pub const ALL: [Self; 6] = [
        Self::Flash,
        Self::PinkFilter,
        Self::DimFilter,
        Self::AmbientLoop,
        Self::FloatingText,
        Self::Bubbles,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::PinkFilter => "pink_filter",
            Self::DimFilter => "dim_filter",
            Self::AmbientLoop => "ambient_loop",
            Self::FloatingText => "floating_text",
            Self::Bubbles => "bubbles",
        }
    }
}

/// Effect control surface implemented by the presentation layer.
///
/// Every call is fire-and-forget from the engine's point of view: hosts must
/// not block, and failures on their side are theirs to log. The two ambient
/// methods form the snapshot/restore boundary; `write_ambient` is the only
/// call whose failure the engine reacts to (it logs and keeps going).
pub trait EffectHost {
    fn enable_effect(&mut self, effect: EffectId, on: bool);
    fn set_opacity(&mut self, effect: EffectId, percent: u8);
    fn set_frequency(&mut self, effect: EffectId, per_hour: u32);
    fn set_intensity(&mut self, effect: EffectId, percent: u8);
    fn set_burst_active(&mut self, effect: EffectId, active: bool, magnitude: u8);

    /// Whether the resources backing `effect` (images, audio files) are
    /// present. A delayed feature whose resources are missing is skipped for
    /// the rest of the session.
    fn effect_available(&self, _effect: EffectId) -> bool {
        true
    }

    /// Current ambient settings, read once when a session starts.
    fn ambient(&self) -> AmbientSettings;

    /// Write one ambient field back during restore.
    fn write_ambient(&mut self, field: AmbientField, value: AmbientValue) -> Result<(), String>;
}

/// Host that logs every effect call through `tracing` and keeps its ambient
/// settings in memory. The CLI runs against this; it also serves as the
/// reference for what a real presentation layer has to implement.
#[derive(Debug, Default)]
pub struct LoggingHost {
    ambient: AmbientSettings,
}

impl LoggingHost {
    pub fn new(ambient: AmbientSettings) -> Self {
        Self { ambient }
    }

    pub fn ambient_settings(&self) -> &AmbientSettings {
        &self.ambient
    }
}

impl EffectHost for LoggingHost {
    fn enable_effect(&mut self, effect: EffectId, on: bool) {
        info!(effect = effect.label(), on, "enable effect");
    }

    fn set_opacity(&mut self, effect: EffectId, percent: u8) {
        info!(effect = effect.label(), percent, "set opacity");
    }

    fn set_frequency(&mut self, effect: EffectId, per_hour: u32) {
        info!(effect = effect.label(), per_hour, "set frequency");
    }

    fn set_intensity(&mut self, effect: EffectId, percent: u8) {
        info!(effect = effect.label(), percent, "set intensity");
    }

    fn set_burst_active(&mut self, effect: EffectId, active: bool, magnitude: u8) {
        info!(effect = effect.label(), active, magnitude, "set burst");
    }

    fn ambient(&self) -> AmbientSettings {
        self.ambient
    }

    fn write_ambient(
        &mut self,
        field: AmbientField,
        value: AmbientValue,
    ) -> Result<(), String> {
        self.ambient.apply(field, value);
        Ok(())
    }
}
