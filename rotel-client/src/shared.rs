//! State shared between a client and its receive loop.

use std::sync::Arc;

use rotel_profiles::{CommandName, CommandProfile};
use tokio::sync::{watch, Mutex};
use tracing::{debug, trace, warn};

use crate::backoff::ConnectionState;
use crate::best_effort::BestEffort;
use crate::config::ClientConfig;
use crate::connection::{ConnectionReader, ConnectionWriter, Connector};
use crate::error::{ClientError, Result};
use crate::listeners::ListenerSet;

pub(crate) struct Shared {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) profile: Arc<CommandProfile>,
    pub(crate) config: ClientConfig,
    pub(crate) listeners: Arc<ListenerSet>,
    /// Serialises opening and closing the transport
    pub(crate) lifecycle: Mutex<()>,
    connector: Arc<dyn Connector>,
    writer: Mutex<Option<ConnectionWriter>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    pub(crate) fn new(
        host: String,
        port: u16,
        profile: Arc<CommandProfile>,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            host,
            port,
            profile,
            config,
            listeners: Arc::new(ListenerSet::default()),
            lifecycle: Mutex::new(()),
            connector,
            writer: Mutex::new(None),
            state_tx,
        }
    }

    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("{}: {} -> {}", self.addr(), previous, state);
        }
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Open the transport and install its write half.
    ///
    /// Callers must hold the lifecycle lock.
    pub(crate) async fn open_connection(&self) -> Result<ConnectionReader> {
        let addr = self.addr();
        self.set_state(ConnectionState::Connecting);
        debug!("Connecting to {}", addr);

        let timeout = self.config.connect_timeout;
        let opened =
            match tokio::time::timeout(timeout, self.connector.open(&self.host, self.port)).await {
                Ok(opened) => opened,
                Err(_) => Err(ClientError::ConnectTimeout { addr, timeout }),
            };

        let connection = match opened {
            Ok(connection) => connection,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let (reader, writer) = connection.split();
        let stale = self.writer.lock().await.replace(writer);
        if let Some(mut stale) = stale {
            stale.close().await;
        }
        self.set_state(ConnectionState::Connected);
        Ok(reader)
    }

    /// Close and forget the current write half, if any.
    ///
    /// Bounded by the write timeout: a send holds the writer for at most that
    /// long, and a shutdown that stalls is abandoned.
    pub(crate) async fn close_writer(&self) {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let timeout = self.config.write_timeout;
            if tokio::time::timeout(timeout, writer.close()).await.is_err() {
                warn!("Shutdown of {} did not finish within {:?}", self.addr(), timeout);
            }
        }
    }

    pub(crate) async fn send(&self, command: &str) -> Result<()> {
        if !command.is_ascii() {
            return Err(ClientError::InvalidCommand(command.to_string()));
        }
        if !command.ends_with(self.profile.terminator_tx.as_str()) && !command.ends_with('?') {
            debug!("Sending atypical command: {}", command);
        }

        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(ClientError::NotConnected)?;
        trace!("{} <- {}", self.host, command);

        let timeout = self.config.write_timeout;
        match tokio::time::timeout(timeout, writer.send(command.as_bytes())).await {
            Ok(sent) => sent,
            Err(_) => {
                warn!("Write of {:?} to {} stalled for {:?}", command, self.addr(), timeout);
                Err(ClientError::WriteTimeout {
                    addr: self.addr(),
                    timeout,
                })
            }
        }
    }

    pub(crate) async fn enable_push_updates(&self) {
        let command = self
            .profile
            .require_command(CommandName::PushOn)
            .map_err(ClientError::from)
            .best_effort("Enable push updates");
        if let Some(command) = command {
            self.send(command).await.best_effort("Enable push updates");
        }
    }

    pub(crate) async fn refresh_all(&self) {
        for name in CommandName::REFRESH_QUERIES {
            let Some(command) = self.profile.command(name) else {
                continue;
            };
            if self.send(command).await.best_effort(name.as_str()).is_some() {
                tokio::time::sleep(self.config.refresh_pacing).await;
            }
        }
    }
}
