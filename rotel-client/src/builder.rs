//! Builder for creating and configuring a RotelClient.
//!
//! # Example
//!
//! ```rust
//! use rotel_client::{ClientConfig, RotelClient};
//! use std::time::Duration;
//!
//! let client = RotelClient::builder("192.168.1.40")
//!     .with_port(Some(9590))
//!     .with_config(ClientConfig::fast_reconnect().with_query_timeout(Duration::from_secs(1)))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(client.port(), 9590);
//! ```

use std::sync::Arc;

use rotel_profiles::{profile, profile_or_default, resolve_port, CommandProfile, ProfileError};

use crate::client::RotelClient;
use crate::config::ClientConfig;
use crate::connection::{Connector, TcpConnector};
use crate::error::{ClientError, Result};
use crate::shared::Shared;

/// Builder for a [`RotelClient`].
///
/// Defaults: the built-in default profile, its port, [`ClientConfig::default`]
/// and plain TCP.
pub struct RotelClientBuilder {
    host: String,
    port: Option<u16>,
    profile: CommandProfile,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
}

impl RotelClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            profile: profile_or_default(None).clone(),
            config: ClientConfig::default(),
            connector: Arc::new(TcpConnector),
        }
    }

    /// Set the TCP port. `None` or `Some(0)` uses the profile's port.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_profile(mut self, profile: CommandProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Use a built-in profile by key.
    pub fn with_profile_key(mut self, key: &str) -> Result<Self> {
        self.profile = profile(key)
            .ok_or_else(|| ProfileError::UnknownProfile(key.to_string()))?
            .clone();
        Ok(self)
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the transport, e.g. with an in-memory connector in tests.
    pub fn with_connector<C: Connector>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Validate the configuration and create the client.
    pub fn build(self) -> Result<RotelClient> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Configuration("Host must not be empty".to_string()));
        }
        self.config.validate()?;
        Ok(RotelClient::from_shared(self.into_shared()))
    }

    pub(crate) fn into_shared(self) -> Shared {
        let port = resolve_port(self.port, &self.profile);
        Shared::new(
            self.host,
            port,
            Arc::new(self.profile),
            self.config,
            self.connector,
        )
    }
}
