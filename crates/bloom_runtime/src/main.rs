//! Bloom Runtime
//!
//! Headless driver: loads settings, feeds pose input into the simulation one
//! 60 Hz tick at a time and logs what happens to the body and particles.
//!
//! Usage: `bloom [settings.json] [--ticks N] [--input FILE] [--log-level LEVEL]`

use anyhow::{Context, Result};
use bloom_metrics::{EventCounter, TickTimer};
use bloom_services::{LandmarkStream, PoseSource, ScriptedPose, Settings};
use bloom_sim::frame::{Frame, SimEvent};
use bloom_sim::particle::StateKind;
use bloom_sim::Simulation;
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const DEFAULT_SETTINGS: &str = "bloom.json";

#[derive(Parser, Debug)]
#[command(
    name = "bloom",
    version,
    about = "Headless particle and body-interaction simulation"
)]
struct Args {
    /// Settings file (JSON); defaults are used when it does not exist
    settings: Option<PathBuf>,
    /// Ticks to run; 0 runs until the input is exhausted
    #[arg(long)]
    ticks: Option<u64>,
    /// JSON-lines landmark recording to replay
    #[arg(long)]
    input: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let mut settings = Settings::load(&settings_path)
        .with_context(|| format!("loading {}", settings_path.display()))?;
    if let Some(ticks) = args.ticks {
        settings.runtime.ticks = ticks;
    }
    if let Some(input) = args.input {
        settings.runtime.input = Some(input);
    }

    let level_name = args.log_level.as_deref().unwrap_or(&settings.runtime.log_level);
    let level: tracing::Level = level_name
        .parse()
        .with_context(|| format!("bad log level '{level_name}'"))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("Bloom v{}", bloom_core::VERSION);
    run(&settings)
}

fn run(settings: &Settings) -> Result<()> {
    let runtime = &settings.runtime;
    let mut source: Box<dyn PoseSource> = match &runtime.input {
        Some(path) => Box::new(
            LandmarkStream::open(path)
                .with_context(|| format!("opening pose recording {}", path.display()))?,
        ),
        None => {
            tracing::info!("no pose recording, using scripted figure");
            Box::new(ScriptedPose::default())
        }
    };

    let mut frames_out = match &runtime.frames_out {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    let mut sim = Simulation::new(settings.sim.clone()).context("building simulation")?;
    sim.start_tracking();

    let mut timer = TickTimer::new(120);
    let mut counter = EventCounter::new();
    let mut tick: u64 = 0;

    loop {
        if runtime.ticks > 0 && tick >= runtime.ticks {
            break;
        }
        let Some(input) = source.next_frame().context("reading pose input")? else {
            tracing::info!(tick, "pose input exhausted");
            break;
        };

        timer.begin();
        let frame = sim.step(input.as_deref());
        timer.end();

        record_events(&frame, &mut counter);
        if let Some(out) = frames_out.as_mut() {
            serde_json::to_writer(&mut *out, &frame)?;
            out.write_all(b"\n")?;
        }

        tick += 1;
        if runtime.report_interval > 0 && tick % runtime.report_interval == 0 {
            report(&frame, &timer);
        }
    }

    if let Some(mut out) = frames_out {
        out.flush()?;
    }

    sim.stop_tracking();
    tracing::info!(ticks = tick, sim_ms = sim.now_ms(), "run finished");
    for (name, count) in counter.summary() {
        tracing::info!(event = name, count, "total");
    }
    Ok(())
}

fn record_events(frame: &Frame, counter: &mut EventCounter) {
    for event in &frame.events {
        match event {
            SimEvent::SessionStarted { .. } => counter.record("sessions", 1),
            SimEvent::Bonded { .. } => counter.record("bonds", 1),
            SimEvent::Greeting(greeting) => {
                tracing::info!(
                    name = %greeting.name,
                    user = %greeting.user_line,
                    node = %greeting.node_line,
                    "greeting"
                );
                counter.record("greetings", 1);
            }
            SimEvent::BodyDied { .. } => counter.record("deaths", 1),
            SimEvent::Absorbed { .. } => counter.record("absorptions", 1),
            SimEvent::PopulationReset { .. } => counter.record("population_resets", 1),
        }
    }
}

fn report(frame: &Frame, timer: &TickTimer) {
    let (min_ms, max_ms) = timer.tick_time_range_ms();
    tracing::info!(
        tick = frame.tick,
        phase = ?frame.phase,
        free = frame.count_state(StateKind::Free),
        connected = frame.count_state(StateKind::Connected),
        collapsing = frame.count_state(StateKind::Collapsing),
        edges = frame.connections.len(),
        tick_ms = format_args!("{:.3}", timer.tick_time_ms()),
        range_ms = format_args!("{min_ms:.3}-{max_ms:.3}"),
        "status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags_and_settings_path() {
        let args = Args::try_parse_from([
            "bloom",
            "custom.json",
            "--ticks",
            "120",
            "--input",
            "walk.jsonl",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.settings, Some(PathBuf::from("custom.json")));
        assert_eq!(args.ticks, Some(120));
        assert_eq!(args.input, Some(PathBuf::from("walk.jsonl")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_everything_optional() {
        let args = Args::try_parse_from(["bloom"]).unwrap();
        assert!(args.settings.is_none());
        assert!(args.ticks.is_none());
    }

    #[test]
    fn test_help_and_bad_values() {
        let err = Args::try_parse_from(["bloom", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let err = Args::try_parse_from(["bloom", "--ticks", "many"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
