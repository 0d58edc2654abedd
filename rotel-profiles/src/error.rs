//! Error types for profile lookup and command formatting

use thiserror::Error;

use crate::profile::CommandName;

/// Errors that can occur while resolving profile data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// No profile is registered under the requested key
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// The profile does not define the requested command
    #[error("Profile {profile} has no {command} command")]
    MissingCommand {
        profile: String,
        command: CommandName,
    },

    /// The volume template could not be rendered
    #[error("Invalid volume template: {0}")]
    InvalidTemplate(String),

    /// The volume range is empty or inverted
    #[error("Invalid volume range [{lo}, {hi}]")]
    InvalidVolumeRange { lo: i64, hi: i64 },
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;
