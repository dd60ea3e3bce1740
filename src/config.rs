use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "overlay-sessions", version, about = "Timed overlay effect session runner (flashes, filters, floating text, bursts)")]
pub struct Config {
    /// Path to a session definition manifest.
    #[arg(long)]
    pub definition: String,

    /// Wall-clock seconds between engine ticks.
    #[arg(long, default_value_t = 1.0)]
    pub tick_secs: f32,

    /// Session minutes per wall-clock minute (raise to preview a session
    /// faster than real time).
    #[arg(long, default_value_t = 1.0)]
    pub time_scale: f32,

    /// Seed for the scheduling RNG; omit for a fresh schedule each run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Validate the definition, print its summary and exit.
    #[arg(long, default_value_t = false)]
    pub check: bool,
}
