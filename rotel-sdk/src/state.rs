//! Device state tracked from decoded messages.

use rotel_parser::DeviceMessage;
use rotel_profiles::VolumeRange;
use serde::Serialize;

/// Last known state of an amplifier.
///
/// Fields stay `None` until the device has reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub power: Option<bool>,
    pub muted: bool,
    /// Volume on the profile's raw scale
    pub volume_raw: Option<i64>,
    pub source: Option<String>,
}

impl DeviceState {
    /// Fold a message into the state. Returns true if anything changed.
    ///
    /// Unparsable volume values are ignored.
    pub fn apply(&mut self, message: &DeviceMessage) -> bool {
        let before = self.clone();

        if let Some(power) = message.get("power") {
            self.power = Some(power == "on");
        }
        if let Some(mute) = message.get("mute") {
            self.muted = mute == "on";
        }
        if let Some(volume) = message.get("volume") {
            match volume.parse::<i64>() {
                Ok(raw) => self.volume_raw = Some(raw),
                Err(_) => tracing::debug!("Ignoring volume value {:?}", volume),
            }
        }
        if let Some(source) = message.get("source") {
            self.source = Some(source.to_string());
        }

        *self != before
    }

    /// Volume as a fraction of the profile's range
    pub fn volume_level(&self, range: &VolumeRange) -> Option<f64> {
        self.volume_raw.map(|raw| range.raw_to_level(raw))
    }

    pub fn is_on(&self) -> Option<bool> {
        self.power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn message(line: &str) -> DeviceMessage {
        line.parse().unwrap()
    }

    #[test]
    fn test_apply_tracks_fields() {
        let mut state = DeviceState::default();

        assert!(state.apply(&message("power=on,volume=45")));
        assert!(state.apply(&message("mute=on")));
        assert!(state.apply(&message("source=opt1")));

        assert_eq!(
            state,
            DeviceState {
                power: Some(true),
                muted: true,
                volume_raw: Some(45),
                source: Some("opt1".to_string()),
            }
        );
    }

    #[test]
    fn test_apply_reports_no_change() {
        let mut state = DeviceState::default();
        state.apply(&message("power=standby"));
        assert_eq!(state.power, Some(false));

        assert!(!state.apply(&message("power=standby")));
        assert!(!state.apply(&message("model=ra-1572")));
        assert!(!state.apply(&message("volume=max")));
        assert_eq!(state.volume_raw, None);
    }

    #[rstest]
    #[case(Some(0), Some(0.0))]
    #[case(Some(48), Some(0.5))]
    #[case(Some(96), Some(1.0))]
    #[case(Some(120), Some(1.0))]
    #[case(None, None)]
    fn test_volume_level(#[case] raw: Option<i64>, #[case] expected: Option<f64>) {
        let state = DeviceState {
            volume_raw: raw,
            ..Default::default()
        };
        let range = VolumeRange::new(0, 96).unwrap();
        assert_eq!(state.volume_level(&range), expected);
    }

    proptest::proptest! {
        #[test]
        fn prop_reapplying_a_message_changes_nothing(
            power in proptest::bool::ANY,
            volume in 0i64..=96,
            source in "[a-z][a-z0-9]{0,7}",
        ) {
            let line = format!(
                "power={},volume={},source={}",
                if power { "on" } else { "standby" },
                volume,
                source
            );
            let mut state = DeviceState::default();
            proptest::prop_assert!(state.apply(&message(&line)));
            proptest::prop_assert!(!state.apply(&message(&line)));
            proptest::prop_assert_eq!(state.volume_raw, Some(volume));
        }
    }
}
