use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::ambient::AmbientSettings;
use crate::config::Config;
use crate::definition::SessionDefinition;
use crate::effects::LoggingHost;
use crate::events::{EventSink, SessionEvent};
use crate::runner::SessionRunner;
use crate::session::SessionEngine;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    init_tracing();

    let definition = SessionDefinition::load(&cfg.definition)
        .with_context(|| format!("load session definition {}", cfg.definition))?;

    if cfg.check {
        print_summary(&definition);
        return Ok(());
    }

    let engine = match cfg.seed {
        Some(seed) => SessionEngine::with_seed(seed),
        None => SessionEngine::new(),
    };
    let host = LoggingHost::new(AmbientSettings::default());
    let tick_secs = if cfg.tick_secs.is_finite() {
        cfg.tick_secs.clamp(0.05, 60.0)
    } else {
        1.0
    };

    let runner = SessionRunner::spawn(
        engine,
        Box::new(host),
        Box::new(NarrationSink),
        Duration::from_secs_f32(tick_secs),
        cfg.time_scale,
    );
    let handle = runner.handle();
    handle.start(definition)?;

    while handle.is_running() {
        thread::sleep(Duration::from_millis(200));
    }
    runner.shutdown();
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn print_summary(definition: &SessionDefinition) {
    println!("{} ({})", definition.name, definition.id);
    println!("  duration: {} min", definition.duration_min);
    println!("  bonus xp: {}", definition.bonus_xp);
    for phase in &definition.phases {
        if phase.description.is_empty() {
            println!("  {:>6.1}m  {}", phase.start_min, phase.name);
        } else {
            println!(
                "  {:>6.1}m  {} - {}",
                phase.start_min, phase.name, phase.description
            );
        }
    }
    let p = &definition.params;
    let enabled: Vec<&str> = [
        ("flash", p.flash.enabled),
        ("pink_filter", p.pink_filter.enabled),
        ("dim_filter", p.dim_filter.enabled),
        ("ambient_loop", p.ambient_loop.enabled),
        ("floating_text", p.floating_text.enabled),
        ("bubbles", p.bubbles.enabled),
    ]
    .iter()
    .filter_map(|&(name, on)| on.then_some(name))
    .collect();
    println!("  effects: {}", enabled.join(", "));
}

/// Event sink playing the UI's narration role on the log stream.
struct NarrationSink;

impl EventSink for NarrationSink {
    fn emit(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Started => {}
            SessionEvent::PhaseChanged { index, name } => {
                info!(index, phase = %name, "entering phase");
            }
            SessionEvent::ProgressUpdated {
                elapsed_min,
                remaining_min,
                percent,
            } => {
                debug!(elapsed_min, remaining_min, percent, "progress");
            }
            SessionEvent::Completed {
                definition,
                elapsed_min,
                bonus_xp,
            } => {
                info!(id = %definition.id, elapsed_min, bonus_xp, "session finished");
            }
            SessionEvent::Stopped => {
                info!("session stopped before completion");
            }
        }
    }
}
