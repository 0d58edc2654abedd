//! Device handle with state tracking and controls
//!
//! [`RotelDevice`] is the host-facing view of one amplifier. It keeps a
//! [`DeviceState`] up to date from pushed messages and maps power, mute,
//! volume and source controls onto the bound profile's commands.

use std::sync::Arc;

use parking_lot::Mutex;
use rotel_client::{ClientConfig, ListenerHandle, RotelClient};
use rotel_profiles::{CommandName, CommandProfile};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Result, SdkError};
use crate::setup::{DeviceConfig, DEFAULT_NAME};
use crate::state::DeviceState;

/// An attached amplifier.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rotel_client::RotelClient;
/// use rotel_profiles::profile_or_default;
/// use rotel_sdk::RotelDevice;
///
/// # async fn example() -> rotel_sdk::Result<()> {
/// let client = Arc::new(RotelClient::new("192.168.1.40", None, profile_or_default(None)));
/// let device = RotelDevice::attach(client, None, None).await?;
///
/// device.turn_on().await?;
/// device.set_volume_level(0.25).await?;
///
/// let mut updates = device.watch();
/// updates.changed().await.ok();
/// println!("{:?}", device.state());
/// # Ok(())
/// # }
/// ```
pub struct RotelDevice {
    client: Arc<RotelClient>,
    name: String,
    model: String,
    state: Arc<watch::Sender<DeviceState>>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl RotelDevice {
    /// Bind to a client, start tracking state and prime it.
    ///
    /// Connects if needed, enables push updates and polls the full state.
    pub async fn attach(
        client: Arc<RotelClient>,
        name: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self> {
        let (state_tx, _) = watch::channel(DeviceState::default());
        let state = Arc::new(state_tx);

        let sink = Arc::clone(&state);
        let listener = client.add_listener(move |message| {
            sink.send_if_modified(|state| state.apply(message));
        });

        let device = Self {
            client,
            name: name.unwrap_or(DEFAULT_NAME).to_string(),
            model: model.unwrap_or("Rotel").to_string(),
            state,
            listener: Mutex::new(Some(listener)),
        };

        device.client.ensure_connected().await?;
        device.client.enable_push_updates().await;
        device.client.refresh_all().await;
        Ok(device)
    }

    /// Create a client from a saved configuration, connect it and attach.
    pub async fn from_config(config: &DeviceConfig, client_config: ClientConfig) -> Result<Self> {
        let client = config.client(client_config)?;
        client.connect().await?;
        Self::attach(Arc::new(client), Some(&config.name), Some(&config.model)).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Stable identifier, `host:port`
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.client.host(), self.client.port())
    }

    pub fn client(&self) -> &Arc<RotelClient> {
        &self.client
    }

    fn profile(&self) -> &CommandProfile {
        self.client.profile()
    }

    pub fn state(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<DeviceState> {
        self.state.subscribe()
    }

    pub fn is_available(&self) -> bool {
        self.client.is_connected()
    }

    pub fn volume_level(&self) -> Option<f64> {
        self.state.borrow().volume_level(&self.profile().volume_range)
    }

    pub fn source_list(&self) -> Vec<String> {
        self.profile()
            .source_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.client.send_command(CommandName::PowerOn).await?;
        Ok(())
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.client.send_command(CommandName::PowerOff).await?;
        Ok(())
    }

    pub async fn set_mute(&self, mute: bool) -> Result<()> {
        let name = if mute {
            CommandName::MuteOn
        } else {
            CommandName::MuteOff
        };
        self.client.send_command(name).await?;
        Ok(())
    }

    /// Set the volume from a `[0, 1]` fraction; out-of-range values are clamped.
    pub async fn set_volume_level(&self, level: f64) -> Result<()> {
        let command = self.profile().volume_command_for_level(level)?;
        self.client.command(&command).await?;
        Ok(())
    }

    /// Set the volume on the raw scale; clamped to the profile's range.
    pub async fn set_volume_raw(&self, raw: i64) -> Result<()> {
        let command = self.profile().volume_command(raw)?;
        self.client.command(&command).await?;
        Ok(())
    }

    /// Select an input by name.
    ///
    /// Names missing from the profile are sent literally with the profile's
    /// command terminator appended.
    pub async fn select_source(&self, source: &str) -> Result<()> {
        let source = source.to_lowercase();
        let command = match self.profile().source_command(&source) {
            Some(command) => command.to_string(),
            None => {
                debug!("Unknown source {}, falling back to literal", source);
                format!("{}{}", source, self.profile().terminator_tx)
            }
        };
        self.client.command(&command).await?;
        Ok(())
    }

    /// Like [`select_source`](Self::select_source) but rejecting names the
    /// profile does not list.
    pub async fn select_listed_source(&self, source: &str) -> Result<()> {
        let command = self
            .profile()
            .source_command(source)
            .ok_or_else(|| SdkError::UnknownSource(source.to_string()))?
            .to_string();
        self.client.command(&command).await?;
        Ok(())
    }

    /// Stop tracking state. Returns false if already detached.
    pub fn detach(&self) -> bool {
        self.listener
            .lock()
            .take()
            .map(|handle| handle.unsubscribe())
            .unwrap_or(false)
    }
}

impl Drop for RotelDevice {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for RotelDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotelDevice")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("id", &self.identifier())
            .field("state", &*self.state.borrow())
            .finish()
    }
}
