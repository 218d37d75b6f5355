// src/main.rs
mod config;
mod drivers;
mod engine;
mod gui;
mod openbci;
mod types;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use eframe::egui;
use log::{info, warn};
use crate::config::AppConfig;
use crate::drivers::{
    render_frame_png, AlphaPipeline, PlotStyle, SampleSource, SyntheticProfile, SyntheticSource,
};
use crate::openbci::OpenBciSource;
use crate::types::EngineCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Simulated channel alternating eyes-open / eyes-closed blocks
    Sim,
    /// OpenBCI Cyton + Daisy through BrainFlow
    Openbci,
}

/// Live eyes-open / eyes-closed detection from relative EEG alpha power.
#[derive(Debug, Parser)]
#[command(name = "alphawatch", version)]
struct Cli {
    /// JSON config file; missing fields use built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = SourceKind::Sim)]
    source: SourceKind,
    /// Serial port of the OpenBCI dongle
    #[arg(long, default_value = "COM4")]
    serial_port: String,
    /// Run without a window, logging every update
    #[arg(long)]
    headless: bool,
    /// Number of ticks to run in headless mode
    #[arg(long, default_value_t = 300)]
    ticks: usize,
    /// Write the last headless frame to this PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Seed for the simulated channel's noise, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn open_source(cli: &Cli, config: &AppConfig) -> Result<Box<dyn SampleSource + Send>> {
    match cli.source {
        SourceKind::Sim => {
            info!("using simulated EEG at {} Hz", config.sampling_rate_hz);
            let profile = SyntheticProfile::new(config.sampling_rate_hz);
            Ok(Box::new(match cli.seed {
                Some(seed) => SyntheticSource::seeded(profile, seed),
                None => SyntheticSource::new(profile),
            }))
        }
        SourceKind::Openbci => {
            let mut source = OpenBciSource::connect(&cli.serial_port, config.channel_index)?;
            if (source.sample_rate_hz() - config.sampling_rate_hz).abs() > f64::EPSILON {
                bail!(
                    "board on {} streams at {} Hz but sampling_rate_hz is {}",
                    source.port_name(),
                    source.sample_rate_hz(),
                    config.sampling_rate_hz
                );
            }
            source.start_stream()?;
            Ok(Box::new(source))
        }
    }
}

fn run_headless(cli: &Cli, config: &AppConfig, mut source: Box<dyn SampleSource + Send>) -> Result<()> {
    let mut pipeline = AlphaPipeline::new(config.pipeline_settings())?;
    let last = engine::run_headless(&mut pipeline, &mut source, cli.ticks, config.tick_period());
    match &last {
        Some(frame) => info!(
            "final state: {} at t = {:.2} s (relative alpha {:.3})",
            frame.state, frame.latest_timestamp, frame.relative_power
        ),
        None => info!("final state: {}", pipeline.state()),
    }
    if let Some(path) = &cli.snapshot {
        match last {
            Some(frame) => {
                let png = render_frame_png(&frame, PlotStyle::default())?;
                std::fs::write(path, png)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("snapshot written to {}", path.display());
            }
            None => warn!("no frame was produced; snapshot skipped"),
        }
    }
    Ok(())
}

// Entry point
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    let source = open_source(&cli, &config)?;
    config.validate_channel(source.channel_count())?;
    if cli.headless {
        return run_headless(&cli, &config, source);
    }
    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    let engine = engine::spawn_thread(&config, source, tx, rx_cmd)?;
    let stop = tx_cmd.clone();
    let app = gui::AlphaWatchApp::new(&config, rx, tx_cmd);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 600.0])
            .with_title("Live EEG Alpha Power"),
        ..Default::default()
    };
    let result = eframe::run_native("alphawatch", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|err| anyhow!("window closed with error: {err}"));
    // The engine thread owns the source; joining it is what releases the device.
    stop.send(EngineCommand::Stop).ok();
    if engine.join().is_err() {
        warn!("engine thread panicked");
    }
    result
}
