//! # rotel-client
//!
//! A resilient async client for the line-oriented Rotel ASCII control
//! protocol.
//!
//! The client keeps one TCP session open to a device, writes commands and
//! queries, and decodes the asynchronous status lines the device pushes back.
//! Decoded [`DeviceMessage`]s are fanned out to every registered listener.
//! When the connection drops, the receive loop reconnects with exponential
//! backoff (1s doubling up to 30s by default) and re-synchronises state by
//! re-enabling push updates and polling power, volume, mute and source.
//!
//! ## Architecture
//!
//! - [`Connector`] / [`Connection`]: the transport, split into a reader owned
//!   by the receive loop and a writer owned by the client
//! - [`RotelClient`]: lifecycle, commands, query correlation and listeners
//! - [`ReconnectMachine`]: the backoff state machine driven by read and
//!   connect outcomes
//! - [`BestEffort`]: log-and-continue handling for optional operations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rotel_client::{ClientConfig, RotelClient};
//! use rotel_profiles::CommandName;
//!
//! # async fn example() -> rotel_client::Result<()> {
//! let client = RotelClient::builder("192.168.1.40")
//!     .with_config(ClientConfig::fast_reconnect())
//!     .build()?;
//!
//! let handle = client.add_listener(|message| {
//!     if let Some(volume) = message.get("volume") {
//!         println!("volume is now {volume}");
//!     }
//! });
//!
//! client.connect().await?;
//! client.enable_push_updates().await;
//! client.send_command(CommandName::PowerOn).await?;
//!
//! handle.unsubscribe();
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod best_effort;
pub mod builder;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod listeners;

mod receive_loop;
mod shared;

pub use backoff::{Backoff, ConnectionState, ReconnectEvent, ReconnectMachine};
pub use best_effort::BestEffort;
pub use builder::RotelClientBuilder;
pub use client::RotelClient;
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionReader, ConnectionWriter, Connector, TcpConnector};
pub use error::{ClientError, ReadError, Result};
pub use listeners::{Listener, ListenerGuard, ListenerHandle, ListenerId};

pub use rotel_parser::DeviceMessage;
