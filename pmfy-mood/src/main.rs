//! pmfy-mood - mood analysis runner
//!
//! Reads a staged track file, runs the mood pipeline and writes the report
//! as JSON to a file or stdout. `--init-config` writes a default config
//! file instead and exits.

use anyhow::{Context, Result};
use clap::Parser;
use pmfy_common::config::{load_or_default, write_default_config};
use pmfy_common::logging::init_tracing;
use pmfy_mood::config::resolve_credentials;
use pmfy_mood::staging::load_tracks;
use pmfy_mood::MoodEngine;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pmfy-mood", version, about = "Classify a track list by mood and recommend one track per mood")]
struct Args {
    /// Staged tracks (JSON array of rows)
    #[arg(long, env = "PMFY_TRACKS", required_unless_present = "init_config")]
    tracks: Option<PathBuf>,

    /// Write a config file holding the defaults to this path, then exit
    #[arg(long, value_name = "PATH", conflicts_with = "tracks")]
    init_config: Option<PathBuf>,

    /// Config file (defaults to PMFY_CONFIG, then the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report destination (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.init_config {
        write_default_config(path)?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_or_default(args.config.as_deref())?;
    init_tracing(&config.logging)?;

    info!("Starting pmfy-mood");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let credentials = resolve_credentials(&config.services)?;
    let engine = MoodEngine::from_settings(&credentials, &config.pipeline)?;

    let tracks_path = args.tracks.context("--tracks is required")?;
    let tracks = load_tracks(&tracks_path)
        .with_context(|| format!("Failed to load tracks from {}", tracks_path.display()))?;
    info!(tracks = tracks.len(), "Loaded staged tracks");

    let report = engine.analyze(tracks).await?;
    if report.is_partial() {
        tracing::warn!(dropped = report.dropped, "Report built from partial data");
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
