//! Session definitions: what a session controls, for how long, and the
//! phase narration shown while it runs. Definitions arrive either in memory
//! or through the line-oriented manifest format parsed here.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::timeline;

/// Immutable description of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefinition {
    pub id: String,
    pub name: String,
    pub duration_min: f32,
    pub bonus_xp: u32,
    pub phases: Vec<Phase>,
    pub params: ParameterSet,
}

/// Named sub-interval of the session timeline, used only for narration.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub start_min: f32,
    pub name: String,
    pub description: String,
}

/// Linear value ramp over a minute window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub start_value: f32,
    pub end_value: f32,
    pub start_min: f32,
    pub end_min: f32,
}

impl Ramp {
    pub fn value_at(&self, elapsed_min: f32) -> f32 {
        timeline::ramp(
            elapsed_min,
            self.start_min,
            self.end_min,
            self.start_value,
            self.end_value,
        )
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            start_value: 0.0,
            end_value: 0.0,
            start_min: 0.0,
            end_min: 1.0,
        }
    }
}

/// Every controllable effect of a session. Disabled features are inert and
/// their ramps are not validated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    pub flash: FlashParams,
    pub pink_filter: FilterParams,
    pub dim_filter: FilterParams,
    pub ambient_loop: AmbientLoopParams,
    pub floating_text: FloatingTextParams,
    pub bubbles: BurstParams,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlashParams {
    pub enabled: bool,
    pub opacity: Ramp,
    pub per_hour: Ramp,
}

/// A color filter with an optional delayed start (`start_min` of 0 means
/// immediate).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterParams {
    pub enabled: bool,
    pub start_min: f32,
    pub opacity: Ramp,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmbientLoopParams {
    pub enabled: bool,
    pub level: Ramp,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatingTextParams {
    pub enabled: bool,
    pub start_min: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BurstParams {
    pub enabled: bool,
    pub burst_count: u32,
    pub magnitude: u8,
    pub min_gap_min: f32,
    pub max_gap_min: f32,
}

impl Default for BurstParams {
    fn default() -> Self {
        Self {
            enabled: false,
            burst_count: 0,
            magnitude: 50,
            min_gap_min: 3.0,
            max_gap_min: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    Io(String),
    Parse { line: usize, message: String },
    MissingField(&'static str),
    NonPositiveDuration,
    FirstPhaseNotZero,
    UnsortedPhases { index: usize },
    PhaseBeyondDuration { index: usize },
    InvalidRamp { param: &'static str, message: String },
    InvalidBurstGap { min_gap_min: f32, max_gap_min: f32 },
    OutOfRange { field: &'static str, message: String },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::NonPositiveDuration => write!(f, "duration_min must be greater than 0"),
            Self::FirstPhaseNotZero => write!(f, "first phase must start at minute 0"),
            Self::UnsortedPhases { index } => {
                write!(f, "phase #{index} does not start after the previous phase")
            }
            Self::PhaseBeyondDuration { index } => {
                write!(f, "phase #{index} starts past the session duration")
            }
            Self::InvalidRamp { param, message } => {
                write!(f, "invalid ramp for {param}: {message}")
            }
            Self::InvalidBurstGap {
                min_gap_min,
                max_gap_min,
            } => write!(
                f,
                "invalid burst gap: min={min_gap_min} max={max_gap_min}"
            ),
            Self::OutOfRange { field, message } => {
                write!(f, "value out of range for {field}: {message}")
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

impl SessionDefinition {
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let mut id: Option<String> = None;
        let mut name: Option<String> = None;
        let mut duration_min: Option<f32> = None;
        let mut bonus_xp: u32 = 0;
        let mut phases: Vec<Phase> = Vec::new();
        let mut params = ParameterSet::default();
        let mut seen: HashSet<&'static str> = HashSet::new();

        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = trimmed.split_once('=').ok_or(DefinitionError::Parse {
                line: line_no,
                message: "expected <key>=<value>".to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "id" => {
                    mark_once(&mut seen, "id", line_no)?;
                    id = Some(value.to_string());
                }
                "name" => {
                    mark_once(&mut seen, "name", line_no)?;
                    name = Some(value.to_string());
                }
                "duration_min" => {
                    mark_once(&mut seen, "duration_min", line_no)?;
                    duration_min = Some(parse_f32(value, line_no, "duration_min")?);
                }
                "bonus_xp" => {
                    mark_once(&mut seen, "bonus_xp", line_no)?;
                    bonus_xp = parse_u32(value, line_no, "bonus_xp")?;
                }
                "phase" => {
                    phases.push(parse_phase(value, line_no)?);
                }
                "flash.enabled" => {
                    mark_once(&mut seen, "flash.enabled", line_no)?;
                    params.flash.enabled = parse_bool(value, line_no, "flash.enabled")?;
                }
                "flash.opacity" => {
                    mark_once(&mut seen, "flash.opacity", line_no)?;
                    params.flash.opacity = parse_ramp(value, line_no, "flash.opacity")?;
                }
                "flash.per_hour" => {
                    mark_once(&mut seen, "flash.per_hour", line_no)?;
                    params.flash.per_hour = parse_ramp(value, line_no, "flash.per_hour")?;
                }
                "pink_filter.enabled" => {
                    mark_once(&mut seen, "pink_filter.enabled", line_no)?;
                    params.pink_filter.enabled =
                        parse_bool(value, line_no, "pink_filter.enabled")?;
                }
                "pink_filter.start_min" => {
                    mark_once(&mut seen, "pink_filter.start_min", line_no)?;
                    params.pink_filter.start_min =
                        parse_f32(value, line_no, "pink_filter.start_min")?;
                }
                "pink_filter.opacity" => {
                    mark_once(&mut seen, "pink_filter.opacity", line_no)?;
                    params.pink_filter.opacity =
                        parse_ramp(value, line_no, "pink_filter.opacity")?;
                }
                "dim_filter.enabled" => {
                    mark_once(&mut seen, "dim_filter.enabled", line_no)?;
                    params.dim_filter.enabled = parse_bool(value, line_no, "dim_filter.enabled")?;
                }
                "dim_filter.start_min" => {
                    mark_once(&mut seen, "dim_filter.start_min", line_no)?;
                    params.dim_filter.start_min =
                        parse_f32(value, line_no, "dim_filter.start_min")?;
                }
                "dim_filter.opacity" => {
                    mark_once(&mut seen, "dim_filter.opacity", line_no)?;
                    params.dim_filter.opacity = parse_ramp(value, line_no, "dim_filter.opacity")?;
                }
                "ambient_loop.enabled" => {
                    mark_once(&mut seen, "ambient_loop.enabled", line_no)?;
                    params.ambient_loop.enabled =
                        parse_bool(value, line_no, "ambient_loop.enabled")?;
                }
                "ambient_loop.level" => {
                    mark_once(&mut seen, "ambient_loop.level", line_no)?;
                    params.ambient_loop.level = parse_ramp(value, line_no, "ambient_loop.level")?;
                }
                "floating_text.enabled" => {
                    mark_once(&mut seen, "floating_text.enabled", line_no)?;
                    params.floating_text.enabled =
                        parse_bool(value, line_no, "floating_text.enabled")?;
                }
                "floating_text.start_min" => {
                    mark_once(&mut seen, "floating_text.start_min", line_no)?;
                    params.floating_text.start_min =
                        parse_f32(value, line_no, "floating_text.start_min")?;
                }
                "bubbles.enabled" => {
                    mark_once(&mut seen, "bubbles.enabled", line_no)?;
                    params.bubbles.enabled = parse_bool(value, line_no, "bubbles.enabled")?;
                }
                "bubbles.count" => {
                    mark_once(&mut seen, "bubbles.count", line_no)?;
                    params.bubbles.burst_count = parse_u32(value, line_no, "bubbles.count")?;
                }
                "bubbles.magnitude" => {
                    mark_once(&mut seen, "bubbles.magnitude", line_no)?;
                    params.bubbles.magnitude = parse_percent(value, line_no, "bubbles.magnitude")?;
                }
                "bubbles.gap_min" => {
                    mark_once(&mut seen, "bubbles.gap_min", line_no)?;
                    params.bubbles.min_gap_min = parse_f32(value, line_no, "bubbles.gap_min")?;
                }
                "bubbles.gap_max" => {
                    mark_once(&mut seen, "bubbles.gap_max", line_no)?;
                    params.bubbles.max_gap_min = parse_f32(value, line_no, "bubbles.gap_max")?;
                }
                _ => {
                    return Err(DefinitionError::Parse {
                        line: line_no,
                        message: format!("unknown key '{key}'"),
                    });
                }
            }
        }

        let definition = Self {
            id: id.ok_or(DefinitionError::MissingField("id"))?,
            name: name.ok_or(DefinitionError::MissingField("name"))?,
            duration_min: duration_min.ok_or(DefinitionError::MissingField("duration_min"))?,
            bonus_xp,
            phases,
            params,
        };

        definition.validate()?;
        Ok(definition)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DefinitionError::Io(e.to_string()))?;
        Self::parse(&text)
    }

    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("id={}", self.id),
            format!("name={}", self.name),
            format!("duration_min={}", self.duration_min),
            format!("bonus_xp={}", self.bonus_xp),
        ];
        for phase in &self.phases {
            lines.push(format!(
                "phase={},{},{}",
                phase.start_min, phase.name, phase.description
            ));
        }
        let p = &self.params;
        lines.push(format!("flash.enabled={}", p.flash.enabled));
        lines.push(format!("flash.opacity={}", ramp_text(&p.flash.opacity)));
        lines.push(format!("flash.per_hour={}", ramp_text(&p.flash.per_hour)));
        lines.push(format!("pink_filter.enabled={}", p.pink_filter.enabled));
        lines.push(format!("pink_filter.start_min={}", p.pink_filter.start_min));
        lines.push(format!(
            "pink_filter.opacity={}",
            ramp_text(&p.pink_filter.opacity)
        ));
        lines.push(format!("dim_filter.enabled={}", p.dim_filter.enabled));
        lines.push(format!("dim_filter.start_min={}", p.dim_filter.start_min));
        lines.push(format!(
            "dim_filter.opacity={}",
            ramp_text(&p.dim_filter.opacity)
        ));
        lines.push(format!("ambient_loop.enabled={}", p.ambient_loop.enabled));
        lines.push(format!(
            "ambient_loop.level={}",
            ramp_text(&p.ambient_loop.level)
        ));
        lines.push(format!(
            "floating_text.enabled={}",
            p.floating_text.enabled
        ));
        lines.push(format!(
            "floating_text.start_min={}",
            p.floating_text.start_min
        ));
        lines.push(format!("bubbles.enabled={}", p.bubbles.enabled));
        lines.push(format!("bubbles.count={}", p.bubbles.burst_count));
        lines.push(format!("bubbles.magnitude={}", p.bubbles.magnitude));
        lines.push(format!("bubbles.gap_min={}", p.bubbles.min_gap_min));
        lines.push(format!("bubbles.gap_max={}", p.bubbles.max_gap_min));
        lines.join("\n")
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::MissingField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(DefinitionError::MissingField("name"));
        }
        if !self.duration_min.is_finite() || self.duration_min <= 0.0 {
            return Err(DefinitionError::NonPositiveDuration);
        }
        if self.phases.is_empty() {
            return Err(DefinitionError::MissingField("phase"));
        }
        if self.phases[0].start_min != 0.0 {
            return Err(DefinitionError::FirstPhaseNotZero);
        }
        for index in 1..self.phases.len() {
            if self.phases[index].start_min <= self.phases[index - 1].start_min {
                return Err(DefinitionError::UnsortedPhases { index });
            }
        }
        for (index, phase) in self.phases.iter().enumerate() {
            if phase.start_min > self.duration_min {
                return Err(DefinitionError::PhaseBeyondDuration { index });
            }
        }

        let p = &self.params;
        if p.flash.enabled {
            validate_ramp(&p.flash.opacity, "flash.opacity", self.duration_min, 100.0)?;
            validate_ramp(
                &p.flash.per_hour,
                "flash.per_hour",
                self.duration_min,
                3600.0,
            )?;
        }
        if p.pink_filter.enabled {
            validate_delay(p.pink_filter.start_min, "pink_filter.start_min")?;
            validate_ramp(
                &p.pink_filter.opacity,
                "pink_filter.opacity",
                self.duration_min,
                100.0,
            )?;
        }
        if p.dim_filter.enabled {
            validate_delay(p.dim_filter.start_min, "dim_filter.start_min")?;
            validate_ramp(
                &p.dim_filter.opacity,
                "dim_filter.opacity",
                self.duration_min,
                100.0,
            )?;
        }
        if p.ambient_loop.enabled {
            validate_ramp(
                &p.ambient_loop.level,
                "ambient_loop.level",
                self.duration_min,
                100.0,
            )?;
        }
        if p.floating_text.enabled {
            validate_delay(p.floating_text.start_min, "floating_text.start_min")?;
        }
        if p.bubbles.enabled {
            if p.bubbles.magnitude > 100 {
                return Err(DefinitionError::OutOfRange {
                    field: "bubbles.magnitude",
                    message: "must be in [0,100]".to_string(),
                });
            }
            let min = p.bubbles.min_gap_min;
            let max = p.bubbles.max_gap_min;
            if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
                return Err(DefinitionError::InvalidBurstGap {
                    min_gap_min: min,
                    max_gap_min: max,
                });
            }
        }
        Ok(())
    }
}

fn validate_ramp(
    ramp: &Ramp,
    param: &'static str,
    duration_min: f32,
    max_value: f32,
) -> Result<(), DefinitionError> {
    let finite = ramp.start_min.is_finite()
        && ramp.end_min.is_finite()
        && ramp.start_value.is_finite()
        && ramp.end_value.is_finite();
    if !finite {
        return Err(DefinitionError::InvalidRamp {
            param,
            message: "all ramp components must be finite".to_string(),
        });
    }
    if ramp.start_min < 0.0 || ramp.start_min >= ramp.end_min {
        return Err(DefinitionError::InvalidRamp {
            param,
            message: format!(
                "window [{},{}] must satisfy 0 <= start < end",
                ramp.start_min, ramp.end_min
            ),
        });
    }
    if ramp.end_min > duration_min {
        return Err(DefinitionError::InvalidRamp {
            param,
            message: format!(
                "window end {} exceeds session duration {duration_min}",
                ramp.end_min
            ),
        });
    }
    for value in [ramp.start_value, ramp.end_value] {
        if !(0.0..=max_value).contains(&value) {
            return Err(DefinitionError::OutOfRange {
                field: param,
                message: format!("value {value} outside [0,{max_value}]"),
            });
        }
    }
    Ok(())
}

fn validate_delay(start_min: f32, field: &'static str) -> Result<(), DefinitionError> {
    if !start_min.is_finite() || start_min < 0.0 {
        return Err(DefinitionError::OutOfRange {
            field,
            message: "must be finite and >= 0".to_string(),
        });
    }
    Ok(())
}

fn ramp_text(ramp: &Ramp) -> String {
    format!(
        "{}..{}@{}..{}",
        ramp.start_value, ramp.end_value, ramp.start_min, ramp.end_min
    )
}

fn mark_once(
    seen: &mut HashSet<&'static str>,
    key: &'static str,
    line: usize,
) -> Result<(), DefinitionError> {
    if !seen.insert(key) {
        return Err(DefinitionError::Parse {
            line,
            message: format!("duplicate '{key}' field"),
        });
    }
    Ok(())
}

fn parse_phase(value: &str, line: usize) -> Result<Phase, DefinitionError> {
    let mut parts = value.splitn(3, ',');
    let start = parts.next().unwrap_or("").trim();
    let name = parts.next().map(str::trim).unwrap_or("");
    let description = parts.next().map(str::trim).unwrap_or("");
    if name.is_empty() {
        return Err(DefinitionError::Parse {
            line,
            message: "phase expects: phase=<start_min>,<name>[,<description>]".to_string(),
        });
    }
    Ok(Phase {
        start_min: parse_f32(start, line, "phase")?,
        name: name.to_string(),
        description: description.to_string(),
    })
}

fn parse_ramp(value: &str, line: usize, field: &'static str) -> Result<Ramp, DefinitionError> {
    let bad = || DefinitionError::Parse {
        line,
        message: format!("{field} expects <from>..<to>@<start_min>..<end_min>"),
    };
    let (values, window) = value.split_once('@').ok_or_else(bad)?;
    let (from, to) = values.split_once("..").ok_or_else(bad)?;
    let (start, end) = window.split_once("..").ok_or_else(bad)?;
    Ok(Ramp {
        start_value: parse_f32(from.trim(), line, field)?,
        end_value: parse_f32(to.trim(), line, field)?,
        start_min: parse_f32(start.trim(), line, field)?,
        end_min: parse_f32(end.trim(), line, field)?,
    })
}

fn parse_bool(value: &str, line: usize, field: &'static str) -> Result<bool, DefinitionError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DefinitionError::Parse {
            line,
            message: format!("{field} must be true/false"),
        }),
    }
}

fn parse_f32(value: &str, line: usize, field: &'static str) -> Result<f32, DefinitionError> {
    let v = value.parse::<f32>().map_err(|_| DefinitionError::Parse {
        line,
        message: format!("invalid number for {field}"),
    })?;
    if !v.is_finite() {
        return Err(DefinitionError::Parse {
            line,
            message: format!("invalid number for {field}"),
        });
    }
    Ok(v)
}

fn parse_u32(value: &str, line: usize, field: &'static str) -> Result<u32, DefinitionError> {
    value.parse::<u32>().map_err(|_| DefinitionError::Parse {
        line,
        message: format!("invalid integer for {field}"),
    })
}

fn parse_percent(value: &str, line: usize, field: &'static str) -> Result<u8, DefinitionError> {
    let v = parse_u32(value, line, field)?;
    if v > 100 {
        return Err(DefinitionError::Parse {
            line,
            message: format!("{field} must be in [0,100]"),
        });
    }
    Ok(v as u8)
}
