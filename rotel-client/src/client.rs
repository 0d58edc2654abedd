//! The protocol client.

use std::sync::Arc;

use parking_lot::Mutex;
use rotel_parser::DeviceMessage;
use rotel_profiles::{CommandName, CommandProfile};
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::backoff::ConnectionState;
use crate::best_effort::BestEffort;
use crate::builder::RotelClientBuilder;
use crate::config::ClientConfig;
use crate::connection::ConnectionReader;
use crate::error::Result;
use crate::listeners::ListenerHandle;
use crate::receive_loop::ReceiveLoopHandle;
use crate::shared::Shared;

/// A persistent, self-healing session with one device.
///
/// `connect` opens the transport and starts a background receive loop that
/// decodes pushed status lines and hands them to every registered listener.
/// When the connection drops, the loop reconnects with exponential backoff
/// and re-synchronises device state.
///
/// All methods take `&self`; share the client behind an `Arc`. Dropping the
/// client stops its receive loop.
///
/// # Example
///
/// ```rust,no_run
/// use rotel_client::RotelClient;
/// use rotel_profiles::profile_or_default;
///
/// # async fn example() -> rotel_client::Result<()> {
/// let client = RotelClient::new("192.168.1.40", None, profile_or_default(None));
/// client.connect().await?;
///
/// let _handle = client.add_listener(|message| println!("{message}"));
/// client.enable_push_updates().await;
/// client.refresh_all().await;
///
/// let model = client.query("model?").await?;
/// println!("model: {model:?}");
///
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct RotelClient {
    shared: Arc<Shared>,
    receiver: Mutex<Option<ReceiveLoopHandle>>,
}

impl RotelClient {
    /// Create a client with the default configuration and TCP transport.
    ///
    /// `port` falls back to the profile's port, then to the protocol default.
    pub fn new(host: impl Into<String>, port: Option<u16>, profile: &CommandProfile) -> Self {
        Self::from_shared(
            RotelClientBuilder::new(host)
                .with_port(port)
                .with_profile(profile.clone())
                .into_shared(),
        )
    }

    /// Start building a client with a custom configuration or transport.
    pub fn builder(host: impl Into<String>) -> RotelClientBuilder {
        RotelClientBuilder::new(host)
    }

    pub(crate) fn from_shared(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
            receiver: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.shared.host
    }

    pub fn port(&self) -> u16 {
        self.shared.port
    }

    pub fn profile(&self) -> &CommandProfile {
        &self.shared.profile
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Whether the transport is open and not being torn down.
    pub fn is_connected(&self) -> bool {
        self.shared.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Observe connection state transitions, including reconnect attempts.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.subscribe_state()
    }

    /// Open the connection and start the receive loop.
    ///
    /// Does nothing when already connected. Fails when the transport cannot
    /// be opened; the caller may retry.
    pub async fn connect(&self) -> Result<()> {
        let _lifecycle = self.shared.lifecycle.lock().await;
        if self.shared.state().is_connected() {
            return Ok(());
        }

        let reader = self.shared.open_connection().await?;
        self.start_receiving(reader).await;
        debug!("Connected to {}", self.shared.addr());
        Ok(())
    }

    async fn start_receiving(&self, reader: ConnectionReader) {
        let existing = self.receiver.lock().take();
        let reader = match existing {
            // A loop waiting to reconnect takes the new connection over.
            Some(handle) if !handle.is_finished() => match handle.hand_off(reader) {
                Ok(()) => {
                    *self.receiver.lock() = Some(handle);
                    return;
                }
                Err(reader) => {
                    handle.stop().await;
                    reader
                }
            },
            Some(handle) => {
                handle.stop().await;
                reader
            }
            None => reader,
        };

        let handle = ReceiveLoopHandle::spawn(Arc::clone(&self.shared), reader);
        *self.receiver.lock() = Some(handle);
    }

    pub async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect().await
    }

    /// Stop the receive loop and close the connection.
    ///
    /// Interrupts a pending read or reconnect attempt and waits for the loop
    /// to finish, so no listener is invoked after this returns. Idempotent.
    pub async fn close(&self) {
        let early = self.receiver.lock().take();
        if let Some(handle) = &early {
            handle.cancel();
        }

        let _lifecycle = self.shared.lifecycle.lock().await;
        let late = self.receiver.lock().take();
        for handle in early.into_iter().chain(late) {
            handle.stop().await;
        }

        self.shared.close_writer().await;
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Register a callback for every decoded message.
    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&DeviceMessage) + Send + Sync + 'static,
    {
        let id = self.shared.listeners.add(Arc::new(listener));
        ListenerHandle::new(id, &self.shared.listeners)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    /// Write a command verbatim without connecting first.
    pub async fn send(&self, command: &str) -> Result<()> {
        self.shared.send(command).await
    }

    /// Connect if needed, then write `command` verbatim. No response is awaited.
    pub async fn command(&self, command: &str) -> Result<()> {
        self.ensure_connected().await?;
        self.shared.send(command).await
    }

    /// Send the bound profile's string for a canonical command.
    pub async fn send_command(&self, name: CommandName) -> Result<()> {
        let command = self.shared.profile.require_command(name)?;
        self.command(command).await
    }

    /// Send a query and wait for the next decoded message.
    ///
    /// A single-attribute answer yields its value, a multi-attribute one its
    /// `k=v,k=v` rendering. Returns `Ok(None)` when nothing arrives within
    /// the query timeout. An unrelated push arriving first is taken as the
    /// answer; use [`query_for`](Self::query_for) to wait for a specific key.
    pub async fn query(&self, query: &str) -> Result<Option<String>> {
        let answer = self.await_message(query, |_| true).await?;
        Ok(answer.map(|message| match message.single_value() {
            Some(value) => value.to_string(),
            None => message.to_string(),
        }))
    }

    /// Send a query and wait for the first message carrying `key`.
    pub async fn query_for(&self, query: &str, key: &str) -> Result<Option<String>> {
        let key = key.to_lowercase();
        let wanted = key.clone();
        let answer = self
            .await_message(query, move |message| message.contains_key(&wanted))
            .await?;
        Ok(answer.and_then(|message| message.get(&key).map(str::to_string)))
    }

    async fn await_message<F>(&self, query: &str, accept: F) -> Result<Option<DeviceMessage>>
    where
        F: Fn(&DeviceMessage) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let _once = self
            .add_listener(move |message| {
                if accept(message) {
                    if let Some(tx) = slot.lock().take() {
                        let _ = tx.send(message.clone());
                    }
                }
            })
            .into_guard();

        self.ensure_connected().await?;
        self.shared.send(query).await?;

        match tokio::time::timeout(self.shared.config.query_timeout, rx).await {
            Ok(Ok(message)) => Ok(Some(message)),
            _ => {
                debug!("No answer to {:?} within {:?}", query, self.shared.config.query_timeout);
                Ok(None)
            }
        }
    }

    /// Ask the device to push state changes. Failures are logged and ignored.
    pub async fn enable_push_updates(&self) {
        self.shared.enable_push_updates().await;
    }

    /// Ask the device to stop pushing state changes. Failures are logged and ignored.
    pub async fn disable_push_updates(&self) {
        if let Some(command) = self.shared.profile.command(CommandName::PushOff) {
            self.shared.send(command).await.best_effort("Disable push updates");
        }
    }

    /// Poll power, volume, mute and source, pacing the queries.
    ///
    /// Answers arrive through the listeners. Individual failures are logged
    /// and do not stop the remaining queries.
    pub async fn refresh_all(&self) {
        self.shared.refresh_all().await;
    }
}

impl std::fmt::Debug for RotelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotelClient")
            .field("addr", &self.shared.addr())
            .field("profile", &self.shared.profile.key)
            .field("state", &self.shared.state())
            .finish()
    }
}
