//! Device setup: one-shot probing and the persisted configuration entry.

use std::fs;
use std::path::{Path, PathBuf};

use rotel_client::{ClientConfig, RotelClient};
use rotel_profiles::{profile_or_default, select_profile, CommandName};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SdkError};

/// Name given to a device when none is supplied
pub const DEFAULT_NAME: &str = "Rotel Amplifier";

/// Model recorded when the device does not answer the model query
pub const UNKNOWN_MODEL: &str = "unknown";

/// A configured device, as produced by [`probe_device`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub model: String,
    /// Profile key, e.g. `rotel_ascii_v1`
    pub profile: String,
}

impl DeviceConfig {
    /// Identifier that is stable for a host and port
    pub fn unique_id(&self) -> String {
        format!("rotel_ip_{}_{}", self.host, self.port)
    }

    /// `<config dir>/rotel-ip/device.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rotel-ip").join("device.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved device configuration to {}", path.display());
        Ok(())
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path().ok_or(SdkError::NoConfigDir)?)
    }

    /// Save to [`default_path`](Self::default_path) and return the path used.
    pub fn save_default(&self) -> Result<PathBuf> {
        let path = Self::default_path().ok_or(SdkError::NoConfigDir)?;
        self.save(&path)?;
        Ok(path)
    }

    /// Build an unconnected client for this device.
    ///
    /// Unknown profile keys fall back to the default profile.
    pub fn client(&self, config: ClientConfig) -> Result<RotelClient> {
        let client = RotelClient::builder(self.host.as_str())
            .with_port(Some(self.port))
            .with_profile(profile_or_default(Some(&self.profile)).clone())
            .with_config(config)
            .build()?;
        Ok(client)
    }
}

/// Test a device and describe it.
///
/// Connects with the default profile, asks for the model, disconnects and
/// picks the profile matching the reported model.
pub async fn probe_device(host: &str, port: Option<u16>, name: Option<&str>) -> Result<DeviceConfig> {
    probe_device_with(host, port, name, ClientConfig::default()).await
}

/// [`probe_device`] with explicit client timings.
pub async fn probe_device_with(
    host: &str,
    port: Option<u16>,
    name: Option<&str>,
    config: ClientConfig,
) -> Result<DeviceConfig> {
    let host = host.trim();
    let profile = profile_or_default(None);
    let client = RotelClient::builder(host)
        .with_port(port)
        .with_profile(profile.clone())
        .with_config(config)
        .build()?;

    client.connect().await?;
    let model = match profile.command(CommandName::ModelQuery) {
        Some(query) => client.query(query).await,
        None => Ok(None),
    };
    client.close().await;
    let model = model?;

    let profile_key = select_profile(model.as_deref());
    info!(
        "Probed {}:{}: model {:?}, profile {}",
        host,
        client.port(),
        model,
        profile_key
    );

    Ok(DeviceConfig {
        host: host.to_string(),
        port: client.port(),
        name: name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_string(),
        model: model.unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        profile: profile_key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DeviceConfig {
        DeviceConfig {
            host: "192.168.1.40".to_string(),
            port: 9590,
            name: DEFAULT_NAME.to_string(),
            model: "ra-1572".to_string(),
            profile: "rotel_ascii_v1".to_string(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("device.json");

        config().save(&path).unwrap();
        assert_eq!(DeviceConfig::load(&path).unwrap(), config());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        fs::write(&path, "{\"host\": 5}").unwrap();

        assert!(matches!(DeviceConfig::load(&path), Err(SdkError::Config(_))));
        assert!(matches!(
            DeviceConfig::load(&dir.path().join("missing.json")),
            Err(SdkError::Io(_))
        ));
    }

    #[test]
    fn test_unique_id_and_client() {
        let config = config();
        assert_eq!(config.unique_id(), "rotel_ip_192.168.1.40_9590");

        let client = config.client(ClientConfig::default()).unwrap();
        assert_eq!(client.port(), 9590);
        assert_eq!(client.profile().key, "rotel_ascii_v1");

        let unknown = DeviceConfig {
            profile: "retired_profile".to_string(),
            ..config
        };
        assert_eq!(
            unknown.client(ClientConfig::default()).unwrap().profile().key,
            "rotel_ascii_v1"
        );
    }

    #[test]
    fn test_default_path_layout() {
        if let Some(path) = DeviceConfig::default_path() {
            assert!(path.ends_with("rotel-ip/device.json"));
        }
    }
}
