//! `rotel` - probe, monitor and control Rotel amplifiers from the shell

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rotel_profiles::{profile, profile_keys};
use rotel_sdk::logging::{init_logging_from_env, init_logging_with_filter, LoggingMode};
use rotel_sdk::{probe_device, ClientConfig, DeviceConfig, DeviceMessage, RotelDevice};
use tracing::{info, warn};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    if !cli.command.needs_device() {
        print_profiles();
        return Ok(());
    }

    if let Command::Probe { name, save } = &cli.command {
        let host = cli
            .target
            .host
            .as_deref()
            .ok_or_else(|| anyhow!("probe needs --host"))?;
        return probe(host, cli.target.port, name.as_deref(), *save).await;
    }

    let config = cli.target.resolve()?;
    let duration = cli.command.monitor_duration();
    info!("Using {} at {}:{}", config.name, config.host, config.port);

    match cli.command {
        Command::Monitor { json, .. } => monitor(&config, json, duration).await,
        Command::Status { wait_ms } => status(&config, Duration::from_millis(wait_ms)).await,
        Command::Send { command } => {
            let client = config.client(ClientConfig::default())?;
            let result = client.command(&command).await;
            client.close().await;
            result.with_context(|| format!("Failed to send {command:?}"))
        }
        Command::Query { query, key } => {
            let client = config.client(ClientConfig::default())?;
            let answer = match key {
                Some(key) => client.query_for(&query, &key).await,
                None => client.query(&query).await,
            };
            client.close().await;
            match answer.with_context(|| format!("Query {query:?} failed"))? {
                Some(answer) => println!("{answer}"),
                None => {
                    warn!("No answer to {:?}", query);
                    println!("(no answer)");
                }
            }
            Ok(())
        }
        command => control(&config, command).await,
    }
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    match log_level {
        Some(filter) => init_logging_with_filter(LoggingMode::Development, Some(filter)),
        None => init_logging_from_env(),
    }
    .context("Failed to initialize logging")
}

fn print_profiles() {
    for key in profile_keys() {
        if let Some(profile) = profile(key) {
            println!(
                "{:<16} {} (port {}, {} sources)",
                key,
                profile.name,
                profile.port,
                profile.sources.len()
            );
        }
    }
}

async fn probe(host: &str, port: Option<u16>, name: Option<&str>, save: bool) -> Result<()> {
    let config = probe_device(host, port, name)
        .await
        .with_context(|| format!("Cannot reach a Rotel device at {host}"))?;

    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        let path = config
            .save_default()
            .context("Failed to save device configuration")?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

async fn monitor(config: &DeviceConfig, json: bool, duration: Option<Duration>) -> Result<()> {
    let client = Arc::new(config.client(ClientConfig::default())?);

    let _guard = client
        .add_listener(move |message: &DeviceMessage| {
            if json {
                match serde_json::to_string(message) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("Cannot encode message: {}", e),
                }
            } else {
                println!("{message}");
            }
        })
        .into_guard();

    let mut states = client.watch_state();
    let state_task = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            eprintln!("[{state}]");
        }
    });

    client
        .connect()
        .await
        .with_context(|| format!("Cannot connect to {}:{}", config.host, config.port))?;
    client.enable_push_updates().await;
    client.refresh_all().await;

    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
        }
    }

    client.close().await;
    state_task.abort();
    Ok(())
}

async fn status(config: &DeviceConfig, wait: Duration) -> Result<()> {
    let device = RotelDevice::from_config(config, ClientConfig::default())
        .await
        .with_context(|| format!("Cannot connect to {}:{}", config.host, config.port))?;

    tokio::time::sleep(wait).await;

    let state = device.state();
    println!("{}", serde_json::to_string_pretty(&state)?);
    if let Some(level) = device.volume_level() {
        println!("volume level: {level:.2}");
    }

    device.client().close().await;
    Ok(())
}

async fn control(config: &DeviceConfig, command: Command) -> Result<()> {
    let device = RotelDevice::from_config(config, ClientConfig::default())
        .await
        .with_context(|| format!("Cannot connect to {}:{}", config.host, config.port))?;

    let result = match command {
        Command::Power { state } if state.is_on() => device.turn_on().await,
        Command::Power { .. } => device.turn_off().await,
        Command::Mute { state } => device.set_mute(state.is_on()).await,
        Command::Volume { level, raw: true } => device.set_volume_raw(level.round() as i64).await,
        Command::Volume { level, .. } => {
            if !(0.0..=1.0).contains(&level) {
                warn!("Volume level {} outside 0.0-1.0 will be clamped", level);
            }
            device.set_volume_level(level).await
        }
        Command::Source { name, strict: true } => device.select_listed_source(&name).await,
        Command::Source { name, .. } => device.select_source(&name).await,
        other => return Err(anyhow!("{other:?} is not a control command")),
    };

    device.client().close().await;
    result.context("Command failed")
}
