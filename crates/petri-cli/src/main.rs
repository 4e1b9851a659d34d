//! petri-run
//!
//! Runs a place/transition net described as JSON until Ctrl-C (or until
//! `--duration-secs` elapses), printing one line per firing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use petri_core::domain::{FiringEvent, NetModel, PlaceAmount};
use petri_core::ports::FiringSink;
use petri_core::{EngineConfig, NetBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "petri-run")]
#[command(about = "Run a Petri net as concurrent workers")]
#[command(version)]
struct Cli {
    /// Net description (JSON: places, transitions, arcs)
    model: PathBuf,

    /// Simulated work per firing, in milliseconds
    #[arg(long, default_value = "500")]
    work_ms: u64,

    /// Random extra pause per firing, up to this many milliseconds
    #[arg(long, default_value = "0")]
    jitter_ms: u64,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Print firing events as JSON lines
    #[arg(long)]
    json: bool,
}

/// Prints each firing to stdout.
struct ConsoleSink {
    json: bool,
}

#[async_trait]
impl FiringSink for ConsoleSink {
    async fn emit(&self, event: FiringEvent) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "cannot encode firing event"),
            }
            return;
        }
        println!("{}", describe(&event));
    }
}

/// `[p0] => t0 => [p1]    p0 releases 2 tokens    p1 received 1 tokens`
fn describe(event: &FiringEvent) -> String {
    let names = |amounts: &[PlaceAmount]| {
        amounts
            .iter()
            .map(|a| a.place.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut line = format!(
        "[{}] => {} => [{}]",
        names(&event.inputs_debited),
        event.transition,
        names(&event.outputs_credited)
    );
    for a in &event.inputs_debited {
        line.push_str(&format!("    {} releases {} tokens", a.place, a.amount));
    }
    for a in &event.outputs_credited {
        line.push_str(&format!("    {} received {} tokens", a.place, a.amount));
    }
    line
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let source = std::fs::read_to_string(&cli.model)?;
    let model = NetModel::from_json(&source)?;

    let config = EngineConfig::new()
        .with_work_duration(Duration::from_millis(cli.work_ms))
        .with_work_jitter(Duration::from_millis(cli.jitter_ms));
    let net = NetBuilder::new(model)
        .with_config(config)
        .with_sink(Arc::new(ConsoleSink { json: cli.json }))
        .build()?;

    let group = net.start()?;
    match cli.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                r = tokio::signal::ctrl_c() => r?,
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    tracing::info!("stopping workers...");
    group.cancel();
    let report = group.await_termination().await?;

    tracing::info!(
        run = %report.run_id,
        firings = report.total_firings(),
        "net stopped"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
