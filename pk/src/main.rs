//! Pinkeep - stable handles on actors in a live game process
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use pinkeep::cli::{Cli, Command, get_log_path};
use pinkeep::config::Config;
use pinkeep::domain::{ActorKind, PinId, derive_initials};
use pinkeep::events::{GLOBAL_LOG_DIR, PinEvent, read_pin_events, spawn_event_logger};
use pinkeep::pin::PinEnvironment;
use pinkeep::process::{SimActorSpec, SimulatedProcess};
use pinkeep::target::{PinTicker, TargetService};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Simulate { step_ms, record, json }) => {
            debug!(step_ms, record, json, "main: matched Simulate command");
            cmd_simulate(&config, Duration::from_millis(step_ms), record, json).await
        }
        Some(Command::Initials { name }) => {
            debug!(%name, "main: matched Initials command");
            cmd_initials(&name)
        }
        Some(Command::Config) => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
        Some(Command::History { pin, dir }) => {
            debug!(%pin, ?dir, "main: matched History command");
            cmd_history(&config, &pin, dir)
        }
        None => {
            debug!("main: no command, defaulting to Simulate");
            cmd_simulate(&config, Duration::from_millis(300), false, false).await
        }
    }
}

/// Scripted session: relocation, photo round trip, loss and recovery
async fn cmd_simulate(config: &Config, step: Duration, record: bool, json_output: bool) -> Result<()> {
    debug!(?step, record, json_output, "cmd_simulate: called");
    let process = SimulatedProcess::new();

    process.spawn_actor(
        SimActorSpec::new("Jane Q. Public", ActorKind::Player).with_state(json!({
            "appearance": {"hair": 7, "eyes": "green"},
            "equipment": {"head": "Straw Hat"},
        })),
    );
    process.spawn_actor(SimActorSpec::new("Al", ActorKind::Player));
    process.spawn_actor(SimActorSpec::new("Guard", ActorKind::BattleNpc).with_model_type(3));

    let env = PinEnvironment::for_process(process.clone(), config.pins.clone());
    let service = Arc::new(TargetService::new(env));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let printer = tokio::spawn(print_events(service.events().subscribe(), shutdown_rx.clone()));

    let logger = if record || config.events.record {
        let handle = spawn_event_logger(service.events(), config.events.dir.as_deref())
            .context("Failed to start event logger")?;
        Some(handle)
    } else {
        None
    };

    let ticker = PinTicker::from_config(service.clone()).spawn(shutdown_rx);

    let jane = service.pin_by_name("Jane Q. Public").await?;
    let al = service.pin_by_name("Al").await?;
    tokio::time::sleep(step).await;

    println!("{}", "-- Jane moves to a new address".bold());
    if let Some(address) = jane.pointer().await {
        process.relocate(address);
    }
    tokio::time::sleep(step).await;

    println!("{}", "-- Entering photo mode".bold());
    process.enter_photo();
    tokio::time::sleep(step).await;
    process.stage_photo_copies();
    tokio::time::sleep(step).await;

    if let Some(memory) = jane.memory().await
        && let Err(e) = memory.write_state(json!({
            "appearance": {"hair": 1, "eyes": "red"},
            "equipment": {"head": "Crown"},
        }))
    {
        warn!(error = %e, "cmd_simulate: failed to edit photo actor");
    }

    println!("{}", "-- Leaving photo mode".bold());
    process.leave_photo();
    tokio::time::sleep(step).await;

    println!("{}", "-- Al despawns, then returns".bold());
    if let Some(address) = al.pointer().await {
        process.despawn(address);
    }
    tokio::time::sleep(step).await;
    process.spawn_actor(SimActorSpec::new("Al", ActorKind::Player));
    tokio::time::sleep(step).await;

    let summaries = service.summaries().await;
    shutdown_tx.send(true).ok();
    ticker.await.context("Ticker task failed")?;
    printer.await.context("Event printer task failed")?;

    println!();
    if json_output {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        println!("{}", "Pins".bold());
        println!("----");
        for summary in &summaries {
            let state = if summary.bound {
                summary.state.to_string().green()
            } else {
                summary.state.to_string().red()
            };
            let address = summary
                .address
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} {:<6} {:<16} {:<14} {}{}",
                summary.pin_id.short().cyan(),
                summary.initials.as_deref().unwrap_or("?"),
                summary.name.as_deref().unwrap_or("<unnamed>"),
                address,
                state,
                if summary.is_selected { " (selected)" } else { "" }
            );
        }
    }

    service.shutdown().await;
    if let Some(logger) = logger {
        // Every write is flushed as it happens
        logger.abort();
    }
    Ok(())
}

/// Print pin events until shutdown
async fn print_events(mut rx: broadcast::Receiver<PinEvent>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(event) => println!("{}", format_event(&event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    println!("{} missed {} events", "!".yellow(), n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn format_event(event: &PinEvent) -> String {
    let pin = event
        .pin_id()
        .map(|id| id.short())
        .unwrap_or_else(|| "------".to_string());
    let detail = match event {
        PinEvent::Pinned { address, name, .. } => {
            format!("pinned {} at {}", name.as_deref().unwrap_or("<unnamed>"), address)
        }
        PinEvent::Unpinned { .. } => "unpinned".to_string(),
        PinEvent::Retargeted {
            old_address,
            new_address,
            reason,
            ..
        } => {
            let old = old_address.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
            match new_address {
                Some(new) => format!("retargeted {} -> {} ({})", old, new, reason).green().to_string(),
                None => format!("lost actor at {} ({})", old, reason).red().to_string(),
            }
        }
        PinEvent::PropertyChanged { property, .. } => format!("{:?} changed", property).dimmed().to_string(),
        PinEvent::SelectionChanged { pin_id } => match pin_id {
            Some(_) => "selected".to_string(),
            None => "selection cleared".to_string(),
        },
        PinEvent::BackupCaptured { address, .. } => format!("backup captured from {}", address).blue().to_string(),
        PinEvent::BackupRestored { address, .. } => format!("backup restored onto {}", address).blue().to_string(),
        PinEvent::BackupSkipped { message, .. } => format!("backup skipped: {}", message).yellow().to_string(),
    };
    format!("{} {}", pin.cyan(), detail)
}

fn cmd_initials(name: &str) -> Result<()> {
    debug!(%name, "cmd_initials: called");
    match derive_initials(name) {
        Some(initials) => println!("{}", initials),
        None => eyre::bail!("Name is blank"),
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn cmd_history(config: &Config, pin: &str, dir: Option<PathBuf>) -> Result<()> {
    debug!(%pin, ?dir, "cmd_history: called");
    // Only a pin id or the pinless log name may become a file name
    let key = if pin == GLOBAL_LOG_DIR {
        GLOBAL_LOG_DIR.to_string()
    } else {
        pin.parse::<PinId>()
            .map_err(|_| eyre::eyre!("Invalid pin id '{}'", pin))?
            .to_string()
    };

    let pins_dir = match dir.or_else(|| config.events.dir.clone()) {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .ok_or_else(|| eyre::eyre!("Could not determine data directory"))?
            .join("pinkeep")
            .join("pins"),
    };

    let entries = read_pin_events(&pins_dir, &key)?;
    if entries.is_empty() {
        println!("No events recorded for {}", key);
        return Ok(());
    }
    for entry in entries {
        println!("{} {}", entry.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(), format_event(&entry.event));
    }
    Ok(())
}
