//! Command line arguments

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use rotel_profiles::{profile_or_default, resolve_port, DEFAULT_PROFILE_KEY};
use rotel_sdk::{DeviceConfig, DEFAULT_NAME, UNKNOWN_MODEL};

/// Probe, monitor and control Rotel amplifiers over their IP control port
#[derive(Parser, Debug)]
#[command(name = "rotel")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Log filter (error, warn, info, debug, trace or a full directive).
    /// Without it, ROTEL_LOG_MODE and ROTEL_LOG_LEVEL apply.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TargetArgs {
    /// Amplifier host name or IP address; defaults to the saved device
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Control port; defaults to the profile's port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Command profile key
    #[arg(long, global = true)]
    pub profile: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test a device, report its model and pick a profile
    Probe {
        /// Name to record for the device
        #[arg(long)]
        name: Option<String>,

        /// Save the result as the default device
        #[arg(long)]
        save: bool,
    },

    /// Print every message the device sends
    Monitor {
        /// One JSON object per line
        #[arg(long)]
        json: bool,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Print the device state after a full refresh
    Status {
        /// How long to collect answers, in milliseconds
        #[arg(long, default_value = "500")]
        wait_ms: u64,
    },

    /// Send a raw command, e.g. `power_on!`
    Send { command: String },

    /// Send a query, e.g. `volume?`, and print the answer
    Query {
        query: String,

        /// Wait for a message carrying this key instead of the next message
        #[arg(long)]
        key: Option<String>,
    },

    /// Switch power
    Power { state: Toggle },

    /// Switch mute
    Mute { state: Toggle },

    /// Set the volume
    Volume {
        /// Fraction from 0.0 to 1.0, or a raw device value with --raw
        #[arg(allow_negative_numbers = true)]
        level: f64,

        /// Interpret the level on the device's raw scale
        #[arg(long)]
        raw: bool,
    },

    /// Select an input source
    Source {
        name: String,

        /// Refuse names the profile does not list
        #[arg(long)]
        strict: bool,
    },

    /// List the built-in command profiles
    Profiles,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl Command {
    /// Whether the command talks to a device
    pub fn needs_device(&self) -> bool {
        !matches!(self, Command::Profiles)
    }

    pub fn monitor_duration(&self) -> Option<Duration> {
        match self {
            Command::Monitor { duration, .. } => duration.map(Duration::from_secs),
            _ => None,
        }
    }
}

impl TargetArgs {
    /// The device to talk to: explicit arguments, else the saved configuration.
    pub fn resolve(&self) -> Result<DeviceConfig> {
        match &self.host {
            Some(host) => {
                let key = self.profile.as_deref().unwrap_or(DEFAULT_PROFILE_KEY);
                let profile = profile_or_default(Some(key));
                Ok(DeviceConfig {
                    host: host.trim().to_string(),
                    port: resolve_port(self.port, profile),
                    name: DEFAULT_NAME.to_string(),
                    model: UNKNOWN_MODEL.to_string(),
                    profile: profile.key.clone(),
                })
            }
            None => {
                let mut config = DeviceConfig::load_default()
                    .context("No --host given and no saved device (run `rotel probe --host <HOST> --save`)")?;
                if let Some(port) = self.port {
                    config.port = port;
                }
                if let Some(profile) = &self.profile {
                    config.profile = profile.clone();
                }
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["rotel", "--host", "amp", "power", "on"])]
    #[case(&["rotel", "power", "off", "--host", "amp", "--port", "9596"])]
    #[case(&["rotel", "volume", "0.5", "--host", "amp"])]
    #[case(&["rotel", "query", "model?", "--key", "model", "--host", "amp"])]
    #[case(&["rotel", "monitor", "--json", "--duration", "10"])]
    #[case(&["rotel", "profiles"])]
    fn test_parses(#[case] argv: &[&str]) {
        assert!(Cli::try_parse_from(argv).is_ok());
    }

    #[test]
    fn test_rejects_invalid_toggle() {
        assert!(Cli::try_parse_from(["rotel", "power", "maybe"]).is_err());
    }

    #[test]
    fn test_resolve_explicit_target() {
        let cli = Cli::try_parse_from(["rotel", "--host", " amp.local ", "status"]).unwrap();
        let config = cli.target.resolve().unwrap();

        assert_eq!(config.host, "amp.local");
        assert_eq!(config.port, 9590);
        assert_eq!(config.profile, DEFAULT_PROFILE_KEY);
        assert_eq!(config.name, DEFAULT_NAME);
    }

    #[test]
    fn test_monitor_duration() {
        let cli = Cli::try_parse_from(["rotel", "monitor", "--duration", "3"]).unwrap();
        assert_eq!(cli.command.monitor_duration(), Some(Duration::from_secs(3)));
        assert!(cli.command.needs_device());
        assert!(!Command::Profiles.needs_device());
    }
}
