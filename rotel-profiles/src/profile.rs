//! Command profile types
//!
//! This module defines the vocabulary of canonical commands and the per-family
//! [`CommandProfile`] that maps them to literal wire strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Canonical command names understood by every profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandName {
    PowerOn,
    PowerOff,
    PowerQuery,
    VolumeQuery,
    MuteOn,
    MuteOff,
    MuteQuery,
    SourceQuery,
    PushOn,
    PushOff,
    ModelQuery,
    VersionQuery,
}

impl CommandName {
    /// Every canonical command, in declaration order
    pub const ALL: [CommandName; 12] = [
        CommandName::PowerOn,
        CommandName::PowerOff,
        CommandName::PowerQuery,
        CommandName::VolumeQuery,
        CommandName::MuteOn,
        CommandName::MuteOff,
        CommandName::MuteQuery,
        CommandName::SourceQuery,
        CommandName::PushOn,
        CommandName::PushOff,
        CommandName::ModelQuery,
        CommandName::VersionQuery,
    ];

    /// Queries polled, in this order, when refreshing the full device state
    pub const REFRESH_QUERIES: [CommandName; 4] = [
        CommandName::PowerQuery,
        CommandName::VolumeQuery,
        CommandName::MuteQuery,
        CommandName::SourceQuery,
    ];

    /// The canonical snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::PowerOn => "power_on",
            CommandName::PowerOff => "power_off",
            CommandName::PowerQuery => "power_query",
            CommandName::VolumeQuery => "volume_query",
            CommandName::MuteOn => "mute_on",
            CommandName::MuteOff => "mute_off",
            CommandName::MuteQuery => "mute_query",
            CommandName::SourceQuery => "source_query",
            CommandName::PushOn => "push_on",
            CommandName::PushOff => "push_off",
            CommandName::ModelQuery => "model_query",
            CommandName::VersionQuery => "version_query",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown command name: {s}"))
    }
}

/// Raw volume scale of a device family
///
/// Deserialization goes through [`VolumeRange::new`], so an inverted range in
/// a custom profile is rejected when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVolumeRange")]
pub struct VolumeRange {
    pub lo: i64,
    pub hi: i64,
}

#[derive(Deserialize)]
struct RawVolumeRange {
    lo: i64,
    hi: i64,
}

impl TryFrom<RawVolumeRange> for VolumeRange {
    type Error = ProfileError;

    fn try_from(raw: RawVolumeRange) -> Result<Self> {
        VolumeRange::new(raw.lo, raw.hi)
    }
}

impl VolumeRange {
    /// Create a range, rejecting `hi < lo`
    pub fn new(lo: i64, hi: i64) -> Result<Self> {
        if hi < lo {
            return Err(ProfileError::InvalidVolumeRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    // Ordered bounds, tolerating a range built with inverted fields
    fn bounds(&self) -> (i64, i64) {
        (self.lo.min(self.hi), self.lo.max(self.hi))
    }

    fn span(&self) -> f64 {
        let (lo, hi) = self.bounds();
        hi.saturating_sub(lo) as f64
    }

    /// Map a volume fraction onto the raw scale.
    ///
    /// The fraction is clamped to `[0, 1]` (NaN counts as 0), scaled, rounded
    /// half to even and clamped to `[lo, hi]`.
    pub fn level_to_raw(&self, level: f64) -> i64 {
        let (lo, _) = self.bounds();
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        let raw = (level * self.span() + lo as f64).round_ties_even() as i64;
        self.clamp(raw)
    }

    /// Map a raw device value onto a `[0, 1]` fraction
    pub fn raw_to_level(&self, raw: i64) -> f64 {
        let (lo, _) = self.bounds();
        ((raw as f64 - lo as f64) / self.span().max(1.0)).clamp(0.0, 1.0)
    }

    /// Clamp a raw value into the range
    pub fn clamp(&self, raw: i64) -> i64 {
        let (lo, hi) = self.bounds();
        raw.clamp(lo, hi)
    }
}

/// Protocol parameters and vocabulary for one device family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandProfile {
    /// Registry key, e.g. `rotel_ascii_v1`
    pub key: String,
    /// Human readable name
    pub name: String,
    /// TCP port of the control interface
    pub port: u16,
    /// Terminator appended to outbound commands
    pub terminator_tx: String,
    /// Terminator delimiting inbound messages
    pub terminator_rx: String,
    /// Raw volume scale
    pub volume_range: VolumeRange,
    /// Set-volume template, e.g. `vol_{value:02d}!`
    pub volume_set_template: String,
    /// Canonical command name to literal command string
    pub commands: BTreeMap<CommandName, String>,
    /// Source name to select command, in presentation order
    pub sources: Vec<(String, String)>,
}

impl CommandProfile {
    /// Literal command string for a canonical command
    pub fn command(&self, name: CommandName) -> Option<&str> {
        self.commands.get(&name).map(String::as_str)
    }

    /// Like [`command`](Self::command) but failing when the command is missing
    pub fn require_command(&self, name: CommandName) -> Result<&str> {
        self.command(name).ok_or_else(|| ProfileError::MissingCommand {
            profile: self.key.clone(),
            command: name,
        })
    }

    /// Select command for a source, matched case-insensitively
    pub fn source_command(&self, source: &str) -> Option<&str> {
        let wanted = source.to_lowercase();
        self.sources
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, command)| command.as_str())
    }

    /// Source names in presentation order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Render the set-volume command for a raw value, clamped into range
    pub fn volume_command(&self, raw: i64) -> Result<String> {
        format_volume_template(&self.volume_set_template, self.volume_range.clamp(raw))
    }

    /// Render the set-volume command for a `[0, 1]` volume fraction
    pub fn volume_command_for_level(&self, level: f64) -> Result<String> {
        self.volume_command(self.volume_range.level_to_raw(level))
    }
}

/// Render a volume template.
///
/// Supports `{value}`, `{value:d}`, `{value:Nd}` (space padded) and
/// `{value:0Nd}` (zero padded). Any other placeholder is rejected.
///
/// ```rust
/// use rotel_profiles::format_volume_template;
///
/// assert_eq!(format_volume_template("vol_{value:02d}!", 7).unwrap(), "vol_07!");
/// assert_eq!(format_volume_template("volume_{value}!", 7).unwrap(), "volume_7!");
/// ```
pub fn format_volume_template(template: &str, value: i64) -> Result<String> {
    let mut output = String::with_capacity(template.len() + 4);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let close = after_open
            .find('}')
            .ok_or_else(|| ProfileError::InvalidTemplate(template.to_string()))?;
        let placeholder = &after_open[..close];
        output.push_str(&render_placeholder(placeholder, value, template)?);
        rest = &after_open[close + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn render_placeholder(placeholder: &str, value: i64, template: &str) -> Result<String> {
    let invalid = || ProfileError::InvalidTemplate(template.to_string());

    let format = match placeholder.split_once(':') {
        None if placeholder == "value" => return Ok(value.to_string()),
        Some(("value", format)) => format,
        _ => return Err(invalid()),
    };

    let format = format.strip_suffix('d').unwrap_or(format);
    if format.is_empty() {
        return Ok(value.to_string());
    }

    let (zero_pad, width) = match format.strip_prefix('0') {
        Some(width) => (true, width),
        None => (false, format),
    };
    let width: usize = if width.is_empty() {
        0
    } else {
        width.parse().map_err(|_| invalid())?
    };

    Ok(if zero_pad {
        format!("{value:0width$}")
    } else {
        format!("{value:width$}")
    })
}
