use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = overlay_sessions::config::Config::parse();
    overlay_sessions::app::run(cfg)
}
