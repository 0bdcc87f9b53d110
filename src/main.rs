//! Sundial Heartbeat CLI
//!
//! Compacts heartbeat event files into duration events.

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use sundial_heartbeat::{
    audit::create_shared_log_with_persistence,
    config::Config,
    core::{format_event, parse_timezone, Event, HeartbeatReducer, LocalizedEvent, Pulsetime},
    VERSION,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sundial-heartbeat")]
#[command(author = "Sundial")]
#[command(version = VERSION)]
#[command(about = "Compact activity heartbeats into duration events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce a file of heartbeats
    Reduce {
        /// Heartbeat file (.json array or .jsonl lines), ordered by timestamp
        #[arg(long, short)]
        input: PathBuf,

        /// Where to write reduced events (defaults to the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Merge tolerance in seconds (defaults to the configured value)
        #[arg(long)]
        pulsetime: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Print events in a display timezone
    Show {
        /// Event file (.json array or .jsonl lines)
        #[arg(long, short)]
        input: PathBuf,

        /// IANA timezone (defaults to config, then the system zone)
        #[arg(long)]
        tz: Option<String>,

        /// Print localized events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cumulative reduction statistics
    Stats,

    /// Show configuration
    Config,

    /// Set the default merge tolerance in seconds
    SetPulsetime {
        secs: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Jsonl,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Jsonl => "jsonl",
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Reduce {
            input,
            output,
            pulsetime,
            format,
        } => cmd_reduce(&input, output, pulsetime, format),
        Commands::Show { input, tz, json } => cmd_show(&input, tz, json),
        Commands::Stats => cmd_stats(),
        Commands::Config => cmd_config(),
        Commands::SetPulsetime { secs } => cmd_set_pulsetime(secs),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_reduce(
    input: &Path,
    output: Option<PathBuf>,
    pulsetime: Option<f64>,
    format: Format,
) -> anyhow::Result<()> {
    let config = Config::load().context("Invalid configuration")?;
    let pulsetime = match pulsetime {
        Some(secs) => Pulsetime::from_secs_f64(secs).context("Invalid --pulsetime")?,
        None => config.pulsetime().context("Invalid configuration")?,
    };

    let events = read_events(input)?;
    let run_id = Uuid::new_v4();
    tracing::debug!(%run_id, count = events.len(), "Reducing heartbeats");

    let mut reducer = HeartbeatReducer::new(pulsetime);
    let mut reduced: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        if let Some(closed) = reducer.push(event) {
            reduced.push(closed);
        }
    }
    reduced.extend(reducer.flush());
    let stats = reducer.stats();

    let output_path = match output {
        Some(path) => path,
        None => {
            if let Err(e) = config.ensure_directories() {
                tracing::warn!("Could not create directories: {e}");
            }
            config.export_path.join(format!(
                "reduced_{}.{}",
                Utc::now().format("%Y%m%d_%H%M%S"),
                format.extension()
            ))
        }
    };
    write_events(&output_path, &reduced, format)?;

    let reduction_log = create_shared_log_with_persistence(config.reduction_log_path());
    reduction_log.record_run(&stats);
    if let Err(e) = reduction_log.save() {
        tracing::warn!("Could not save reduction log: {e}");
    }

    println!("Run {run_id}");
    println!("  Pulsetime: {}s", pulsetime.as_secs_f64());
    println!("  Heartbeats in: {}", stats.received);
    println!("  Events out: {}", reduced.len());
    println!("  Merged: {}", stats.merged);
    if stats.skew_dropped > 0 {
        println!("  Dropped (clock skew): {}", stats.skew_dropped);
    }
    println!("Wrote {output_path:?}");

    Ok(())
}

fn cmd_show(input: &Path, tz: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = Config::load().context("Invalid configuration")?;
    let events = read_events(input)?;

    let zone = match tz.or(config.display_timezone) {
        Some(name) => Some(parse_timezone(&name)?),
        None => None,
    };

    if json {
        let Some(zone) = zone else {
            bail!("--json needs a timezone (--tz or display_timezone in config)");
        };
        let localized: Vec<LocalizedEvent> =
            events.iter().map(|e| LocalizedEvent::new(e, zone)).collect();
        println!("{}", serde_json::to_string_pretty(&localized)?);
        return Ok(());
    }

    for event in &events {
        let line = match zone {
            Some(zone) => format_event(event, &zone),
            None => format_event(event, &Local),
        };
        println!("{line}");
    }

    Ok(())
}

fn cmd_stats() -> anyhow::Result<()> {
    let config = Config::load().context("Invalid configuration")?;
    let path = config.reduction_log_path();

    if !path.exists() {
        println!("No reductions recorded yet.");
        return Ok(());
    }

    let reduction_log = create_shared_log_with_persistence(path);
    println!("{}", reduction_log.summary());
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("Invalid configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_set_pulsetime(secs: f64) -> anyhow::Result<()> {
    let mut config = Config::load().context("Invalid configuration")?;
    let pulsetime = config.set_pulsetime(secs).context("Invalid pulsetime")?;
    config.save().context("Error saving config")?;

    println!("Default pulsetime set to {}s.", pulsetime.as_secs_f64());
    Ok(())
}

/// Read events from a JSON array or, for `.jsonl` files, one event per line.
fn read_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Could not read {path:?}"))?;

    let is_jsonl = path.extension().map(|e| e == "jsonl").unwrap_or(false);
    if !is_jsonl {
        return serde_json::from_str(&content)
            .with_context(|| format!("Could not parse events in {path:?}"));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Could not parse event on line {} of {path:?}", n + 1))
        })
        .collect()
}

fn write_events(path: &Path, events: &[Event], format: Format) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = match format {
        Format::Json => serde_json::to_string_pretty(events)?,
        Format::Jsonl => {
            let lines = events
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            lines.join("\n")
        }
    };

    std::fs::write(path, content).with_context(|| format!("Error writing {path:?}"))?;
    Ok(())
}
