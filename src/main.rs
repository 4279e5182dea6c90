// src/main.rs
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use neurostate::processing::{
    OnlineStateDetector, Phase, ReplaySource, StreamingSession, TimedEstimate,
};
use neurostate::synthetic::SyntheticBuilder;
use neurostate::{analyze_session, PipelineConfig};
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON pipeline configuration; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// ERD threshold for the online detector (relative change, e.g. -0.2)
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f64>,
    /// Seconds of REST before and after the ACTIVE block
    #[arg(long, default_value_t = 5.0)]
    rest_s: f64,
    /// Seconds of ACTIVE imagery
    #[arg(long, default_value_t = 5.0)]
    active_s: f64,
    /// Mu rhythm amplitude during ACTIVE, relative to REST
    #[arg(long, default_value_t = 0.25)]
    suppression: f64,
    /// Uniform noise amplitude added to every sample
    #[arg(long, default_value_t = 0.1)]
    noise: f64,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::with_threshold(args.threshold.unwrap_or(-0.2)),
    };
    if let Some(threshold) = args.threshold {
        config.detector.erd_threshold = threshold;
    }
    config.validate().context("invalid pipeline configuration")?;
    Ok(config)
}
/// Collapses per-sample estimates into the points where the decided state changes.
fn state_changes(estimates: &[TimedEstimate]) -> Vec<(f64, Phase, f64)> {
    let mut changes: Vec<(f64, Phase, f64)> = Vec::new();
    for e in estimates.iter().filter(|e| e.estimate.is_ready()) {
        let state = e.estimate.state();
        if changes.last().map_or(true, |&(_, last, _)| last != state) {
            changes.push((e.time_s, state, e.estimate.confidence()));
        }
    }
    changes
}
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    let recording = SyntheticBuilder::new(config.sample_rate_hz)
        .layout(config.channels.clone())
        .noise(args.noise)
        .seed(args.seed)
        .phase(Phase::Rest, args.rest_s, 1.0)
        .phase(Phase::Active, args.active_s, args.suppression)
        .phase(Phase::Rest, args.rest_s, 1.0)
        .build()
        .context("building synthetic recording")?;
    info!(
        "synthetic recording: {:.1} s, {} channels at {} Hz",
        recording.signal().duration_seconds(),
        recording.signal().num_channels(),
        config.sample_rate_hz
    );
    let report = analyze_session(&recording, &config).context("offline analysis failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    let detector = OnlineStateDetector::from_config(&config)?;
    let source = ReplaySource::new(recording.signal().clone());
    let mut session = StreamingSession::new(source, detector)?;
    let estimates = session.run_to_end().context("streaming detection failed")?;
    for (time_s, state, confidence) in state_changes(&estimates) {
        println!(
            "{time_s:8.3} s  {:<6}  confidence {confidence:.2}",
            state.as_str()
        );
    }
    Ok(())
}
