//! Ambient configuration the engine is allowed to touch, plus the snapshot
//! value used to put it back when a session ends.

/// The subset of persistent user settings a session can mutate. The host
/// application owns the full settings surface; only these fields cross the
/// engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientSettings {
    pub flash_enabled: bool,
    pub flash_opacity: u8,
    pub flash_per_hour: u32,
    pub pink_filter_enabled: bool,
    pub pink_filter_opacity: u8,
    pub dim_filter_enabled: bool,
    pub dim_filter_opacity: u8,
    pub ambient_loop_enabled: bool,
    pub ambient_level: u8,
    pub floating_text_enabled: bool,
    pub bubbles_enabled: bool,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            flash_enabled: false,
            flash_opacity: 35,
            flash_per_hour: 60,
            pink_filter_enabled: false,
            pink_filter_opacity: 10,
            dim_filter_enabled: false,
            dim_filter_opacity: 20,
            ambient_loop_enabled: false,
            ambient_level: 40,
            floating_text_enabled: false,
            bubbles_enabled: false,
        }
    }
}

/// One restorable field of [`AmbientSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbientField {
    FlashEnabled,
    FlashOpacity,
    FlashPerHour,
    PinkFilterEnabled,
    PinkFilterOpacity,
    DimFilterEnabled,
    DimFilterOpacity,
    AmbientLoopEnabled,
    AmbientLevel,
    FloatingTextEnabled,
    BubblesEnabled,
}

impl AmbientField {
    pub const ALL: [Self; 11] = [
        Self::FlashEnabled,
        Self::FlashOpacity,
        Self::FlashPerHour,
        Self::PinkFilterEnabled,
        Self::PinkFilterOpacity,
        Self::DimFilterEnabled,
        Self::DimFilterOpacity,
        Self::AmbientLoopEnabled,
        Self::AmbientLevel,
        Self::FloatingTextEnabled,
        Self::BubblesEnabled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FlashEnabled => "flash_enabled",
            Self::FlashOpacity => "flash_opacity",
            Self::FlashPerHour => "flash_per_hour",
            Self::PinkFilterEnabled => "pink_filter_enabled",
            Self::PinkFilterOpacity => "pink_filter_opacity",
            Self::DimFilterEnabled => "dim_filter_enabled",
            Self::DimFilterOpacity => "dim_filter_opacity",
            Self::AmbientLoopEnabled => "ambient_loop_enabled",
            Self::AmbientLevel => "ambient_level",
            Self::FloatingTextEnabled => "floating_text_enabled",
            Self::BubblesEnabled => "bubbles_enabled",
        }
    }
}

/// Typed value of a single ambient field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientValue {
    Bool(bool),
    Percent(u8),
    PerHour(u32),
}

impl AmbientSettings {
    pub fn value(&self, field: AmbientField) -> AmbientValue {
        match field {
            AmbientField::FlashEnabled => AmbientValue::Bool(self.flash_enabled),
            AmbientField::FlashOpacity => AmbientValue::Percent(self.flash_opacity),
            AmbientField::FlashPerHour => AmbientValue::PerHour(self.flash_per_hour),
            AmbientField::PinkFilterEnabled => AmbientValue::Bool(self.pink_filter_enabled),
            AmbientField::PinkFilterOpacity => AmbientValue::Percent(self.pink_filter_opacity),
            AmbientField::DimFilterEnabled => AmbientValue::Bool(self.dim_filter_enabled),
            AmbientField::DimFilterOpacity => AmbientValue::Percent(self.dim_filter_opacity),
            AmbientField::AmbientLoopEnabled => AmbientValue::Bool(self.ambient_loop_enabled),
            AmbientField::AmbientLevel => AmbientValue::Percent(self.ambient_level),
            AmbientField::FloatingTextEnabled => AmbientValue::Bool(self.floating_text_enabled),
            AmbientField::BubblesEnabled => AmbientValue::Bool(self.bubbles_enabled),
        }
    }

    /// Write one field back. Values always originate from [`Self::value`], so
    /// a mismatched variant is dropped rather than coerced.
    pub fn apply(&mut self, field: AmbientField, value: AmbientValue) {
        match (field, value) {
            (AmbientField::FlashEnabled, AmbientValue::Bool(v)) => self.flash_enabled = v,
            (AmbientField::FlashOpacity, AmbientValue::Percent(v)) => self.flash_opacity = v,
            (AmbientField::FlashPerHour, AmbientValue::PerHour(v)) => self.flash_per_hour = v,
            (AmbientField::PinkFilterEnabled, AmbientValue::Bool(v)) => {
                self.pink_filter_enabled = v;
            }
            (AmbientField::PinkFilterOpacity, AmbientValue::Percent(v)) => {
                self.pink_filter_opacity = v;
            }
            (AmbientField::DimFilterEnabled, AmbientValue::Bool(v)) => self.dim_filter_enabled = v,
            (AmbientField::DimFilterOpacity, AmbientValue::Percent(v)) => {
                self.dim_filter_opacity = v;
            }
            (AmbientField::AmbientLoopEnabled, AmbientValue::Bool(v)) => {
                self.ambient_loop_enabled = v;
            }
            (AmbientField::AmbientLevel, AmbientValue::Percent(v)) => self.ambient_level = v,
            (AmbientField::FloatingTextEnabled, AmbientValue::Bool(v)) => {
                self.floating_text_enabled = v;
            }
            (AmbientField::BubblesEnabled, AmbientValue::Bool(v)) => self.bubbles_enabled = v,
            _ => {}
        }
    }
}

/// Value-copy of the ambient settings captured when a session starts.
/// Written once, consumed exactly once at session end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientSnapshot {
    settings: AmbientSettings,
}

impl AmbientSnapshot {
    pub fn capture(settings: &AmbientSettings) -> Self {
        Self {
            settings: *settings,
        }
    }

    pub fn value(&self, field: AmbientField) -> AmbientValue {
        self.settings.value(field)
    }

    pub fn settings(&self) -> &AmbientSettings {
        &self.settings
    }
}
