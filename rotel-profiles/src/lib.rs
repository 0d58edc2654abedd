//! # rotel-profiles
//!
//! Protocol parameters and command vocabularies for Rotel devices speaking the
//! ASCII control protocol.
//!
//! A [`CommandProfile`] bundles everything the protocol client needs to talk
//! to one device family: TCP port, TX/RX terminators, the raw volume range and
//! set-volume template, canonical commands, and source select commands. The
//! client never hardcodes any of these strings.
//!
//! ## Usage
//!
//! ```rust
//! use rotel_profiles::{profile_or_default, select_profile, CommandName};
//!
//! let key = select_profile(Some("RA-1572"));
//! let profile = profile_or_default(Some(key));
//!
//! assert_eq!(profile.port, 9590);
//! assert_eq!(profile.command(CommandName::PowerOn), Some("power_on!"));
//! assert_eq!(profile.volume_command_for_level(0.5).unwrap(), "vol_48!");
//! ```

pub mod error;
pub mod profile;
pub mod registry;

pub use error::{ProfileError, Result};
pub use profile::{format_volume_template, CommandName, CommandProfile, VolumeRange};
pub use registry::{
    profile, profile_keys, profile_or_default, resolve_port, select_profile, DEFAULT_PORT,
    DEFAULT_PROFILE_KEY,
};
