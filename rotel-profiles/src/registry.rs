//! Built-in profile table and model based profile selection

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::profile::{CommandName, CommandProfile, VolumeRange};

/// Port of the Rotel IP control interface
pub const DEFAULT_PORT: u16 = 9590;

/// Profile used when a model is unknown or unmatched
pub const DEFAULT_PROFILE_KEY: &str = "rotel_ascii_v1";

static PROFILES: LazyLock<BTreeMap<&'static str, CommandProfile>> = LazyLock::new(|| {
    let mut profiles = BTreeMap::new();
    profiles.insert(DEFAULT_PROFILE_KEY, rotel_ascii_v1());
    profiles
});

/// Case-insensitive model patterns, checked in order
static MODEL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)(a12|a14)", DEFAULT_PROFILE_KEY),
        (r"(?i)(ra-?1572|ra-?1592)", DEFAULT_PROFILE_KEY),
    ]
    .into_iter()
    .filter_map(|(pattern, key)| match Regex::new(pattern) {
        Ok(regex) => Some((regex, key)),
        Err(e) => {
            tracing::error!("Skipping invalid model pattern {}: {}", pattern, e);
            None
        }
    })
    .collect()
});

fn rotel_ascii_v1() -> CommandProfile {
    let commands = [
        (CommandName::PowerOn, "power_on!"),
        (CommandName::PowerOff, "power_off!"),
        (CommandName::PowerQuery, "power?"),
        (CommandName::VolumeQuery, "volume?"),
        (CommandName::MuteOn, "mute_on!"),
        (CommandName::MuteOff, "mute_off!"),
        (CommandName::MuteQuery, "mute?"),
        (CommandName::SourceQuery, "source?"),
        (CommandName::PushOn, "rs232_update_on!"),
        (CommandName::PushOff, "rs232_update_off!"),
        (CommandName::ModelQuery, "model?"),
        (CommandName::VersionQuery, "version?"),
    ]
    .into_iter()
    .map(|(name, command)| (name, command.to_string()))
    .collect();

    let sources = [
        "cd", "phono", "tuner", "aux1", "aux2", "pcusb", "coax1", "coax2", "opt1", "opt2",
        "bluetooth",
    ]
    .into_iter()
    .map(|source| (source.to_string(), format!("{source}!")))
    .collect();

    CommandProfile {
        key: DEFAULT_PROFILE_KEY.to_string(),
        name: "Rotel ASCII v1 (A12/A14 family)".to_string(),
        port: DEFAULT_PORT,
        terminator_tx: "!".to_string(),
        terminator_rx: "$".to_string(),
        volume_range: VolumeRange { lo: 0, hi: 96 },
        volume_set_template: "vol_{value:02d}!".to_string(),
        commands,
        sources,
    }
}

/// Look up a built-in profile by key
pub fn profile(key: &str) -> Option<&'static CommandProfile> {
    PROFILES.get(key)
}

/// Look up a profile, falling back to the default profile
///
/// Unknown keys are logged and resolved to [`DEFAULT_PROFILE_KEY`].
pub fn profile_or_default(key: Option<&str>) -> &'static CommandProfile {
    let key = key.unwrap_or(DEFAULT_PROFILE_KEY);
    match PROFILES.get(key) {
        Some(profile) => profile,
        None => {
            tracing::warn!("Unknown profile {}, using {}", key, DEFAULT_PROFILE_KEY);
            &PROFILES[DEFAULT_PROFILE_KEY]
        }
    }
}

/// Keys of all built-in profiles
pub fn profile_keys() -> Vec<&'static str> {
    PROFILES.keys().copied().collect()
}

/// Pick a profile key for a reported model string.
///
/// `None`, an empty model, or a model matching no pattern yields
/// [`DEFAULT_PROFILE_KEY`].
pub fn select_profile(model: Option<&str>) -> &'static str {
    let Some(model) = model.filter(|m| !m.is_empty()) else {
        return DEFAULT_PROFILE_KEY;
    };

    MODEL_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(model))
        .map(|(_, key)| *key)
        .unwrap_or(DEFAULT_PROFILE_KEY)
}

/// Resolve the TCP port: explicit port, else the profile's, else [`DEFAULT_PORT`]
pub fn resolve_port(explicit: Option<u16>, profile: &CommandProfile) -> u16 {
    explicit
        .filter(|port| *port != 0)
        .or_else(|| Some(profile.port).filter(|port| *port != 0))
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("RA-1572"), DEFAULT_PROFILE_KEY)]
    #[case(Some("ra1592"), DEFAULT_PROFILE_KEY)]
    #[case(Some("Rotel A14MKII"), DEFAULT_PROFILE_KEY)]
    #[case(Some("X99"), DEFAULT_PROFILE_KEY)]
    #[case(Some(""), DEFAULT_PROFILE_KEY)]
    #[case(None, DEFAULT_PROFILE_KEY)]
    fn test_select_profile(#[case] model: Option<&str>, #[case] expected: &str) {
        assert_eq!(select_profile(model), expected);
    }

    #[test]
    fn test_model_patterns_match_case_insensitively() {
        assert!(MODEL_PATTERNS.iter().any(|(p, _)| p.is_match("RA-1572")));
        assert!(MODEL_PATTERNS.iter().any(|(p, _)| p.is_match("ra1572")));
        assert!(!MODEL_PATTERNS.iter().any(|(p, _)| p.is_match("X99")));
    }

    #[test]
    fn test_builtin_profile_contents() {
        let profile = profile(DEFAULT_PROFILE_KEY).unwrap();
        assert_eq!(profile.port, 9590);
        assert_eq!(profile.terminator_tx, "!");
        assert_eq!(profile.terminator_rx, "$");
        assert_eq!(profile.volume_range, VolumeRange { lo: 0, hi: 96 });
        assert_eq!(profile.command(CommandName::PushOn), Some("rs232_update_on!"));
        assert_eq!(profile.command(CommandName::VolumeQuery), Some("volume?"));
        assert_eq!(profile.source_command("Bluetooth"), Some("bluetooth!"));
        assert_eq!(profile.source_names().len(), 11);
        assert_eq!(profile.source_names()[0], "cd");

        for name in CommandName::ALL {
            assert!(profile.command(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_volume_command_for_half_level() {
        let profile = profile(DEFAULT_PROFILE_KEY).unwrap();
        assert_eq!(profile.volume_command_for_level(0.5).unwrap(), "vol_48!");
        assert_eq!(profile.volume_command(150).unwrap(), "vol_96!");
    }

    #[test]
    fn test_profile_or_default() {
        assert_eq!(profile_or_default(None).key, DEFAULT_PROFILE_KEY);
        assert_eq!(profile_or_default(Some("nope")).key, DEFAULT_PROFILE_KEY);
        assert!(profile("nope").is_none());
        assert_eq!(profile_keys(), vec![DEFAULT_PROFILE_KEY]);
    }

    #[test]
    fn test_resolve_port() {
        let profile = profile(DEFAULT_PROFILE_KEY).unwrap();
        assert_eq!(resolve_port(Some(1234), profile), 1234);
        assert_eq!(resolve_port(None, profile), 9590);
        assert_eq!(resolve_port(Some(0), profile), 9590);

        let mut portless = profile.clone();
        portless.port = 0;
        assert_eq!(resolve_port(None, &portless), DEFAULT_PORT);
    }
}
