//! # Rotel SDK - device-level API for Rotel amplifiers
//!
//! Builds on [`rotel_client`] to give applications a device view:
//!
//! ```rust,no_run
//! use rotel_client::ClientConfig;
//! use rotel_sdk::{probe_device, RotelDevice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rotel_sdk::SdkError> {
//!     // One-shot test of the device, then persist what was learned
//!     let config = probe_device("192.168.1.40", None, Some("Living Room")).await?;
//!     config.save_default()?;
//!
//!     let device = RotelDevice::from_config(&config, ClientConfig::default()).await?;
//!     device.set_volume_level(0.3).await?;
//!     device.select_source("opt1").await?;
//!
//!     let mut state = device.watch();
//!     while state.changed().await.is_ok() {
//!         println!("{:?}", *state.borrow());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! rotel-sdk (device state, controls, setup)
//!     ↓
//! rotel-client (connection, receive loop, reconnect)
//!     ↓
//! rotel-parser / rotel-profiles (wire format, command vocabulary)
//! ```

pub mod logging;

mod device;
mod error;
mod setup;
mod state;

pub use device::RotelDevice;
pub use error::{Result, SdkError};
pub use setup::{probe_device, probe_device_with, DeviceConfig, DEFAULT_NAME, UNKNOWN_MODEL};
pub use state::DeviceState;

pub use rotel_client::{ClientConfig, ConnectionState, RotelClient};
pub use rotel_parser::DeviceMessage;
pub use rotel_profiles::{CommandName, CommandProfile};
