//! Power states — what the controller believes, and what a driver observed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The stored, believed state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    Off,
    On,
    /// Power-on command issued, outcome not yet confirmed.
    PendingOn,
    /// Power-off command issued, outcome not yet confirmed.
    PendingOff,
    /// Extended power-on transition (projector lamps).
    Warming,
    /// Extended power-off transition.
    Cooling,
    /// The last command or verification failed; see `last_error`.
    Error,
    /// The driver returned a status it could not normalise.
    #[default]
    Unknown,
}

impl PowerState {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Off,
        Self::On,
        Self::PendingOn,
        Self::PendingOff,
        Self::Warming,
        Self::Cooling,
        Self::Error,
        Self::Unknown,
    ];

    /// Whether this state denotes a power transition still in progress.
    #[must_use]
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            Self::PendingOn | Self::PendingOff | Self::Warming | Self::Cooling
        )
    }

    /// Whether this is one of the states a finished command may leave behind.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::On | Self::Off | Self::Error)
    }

    /// Wire/storage representation (`"PENDING_ON"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
            Self::PendingOn => "PENDING_ON",
            Self::PendingOff => "PENDING_OFF",
            Self::Warming => "WARMING",
            Self::Cooling => "COOLING",
            Self::Error => "ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised [`PowerState`] string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown power state {0:?}")]
pub struct UnknownPowerState(pub String);

impl FromStr for PowerState {
    type Err = UnknownPowerState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownPowerState(s.to_string()))
    }
}

/// A driver's normalised answer to a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerStatus {
    On,
    Off,
    Warming,
    Cooling,
    Unknown,
}

impl PowerStatus {
    /// Whether the hardware reports it is still changing power state.
    #[must_use]
    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Warming | Self::Cooling)
    }
}

impl From<PowerStatus> for PowerState {
    fn from(status: PowerStatus) -> Self {
        match status {
            PowerStatus::On => Self::On,
            PowerStatus::Off => Self::Off,
            PowerStatus::Warming => Self::Warming,
            PowerStatus::Cooling => Self::Cooling,
            PowerStatus::Unknown => Self::Unknown,
        }
    }
}

/// The requested direction of a power command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerAction {
    On,
    Off,
}

impl PowerAction {
    /// Verb used in the command API path and in log/diagnostic messages.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::On => "wake",
            Self::Off => "shutdown",
        }
    }

    /// The settled state this action aims for.
    #[must_use]
    pub fn target(self) -> PowerState {
        match self {
            Self::On => PowerState::On,
            Self::Off => PowerState::Off,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("On"),
            Self::Off => f.write_str("Off"),
        }
    }
}

impl FromStr for PowerAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "On" => Ok(Self::On),
            "Off" => Ok(Self::Off),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_transition_states() {
        let transitional: Vec<_> = PowerState::ALL
            .into_iter()
            .filter(|s| s.is_transitional())
            .collect();
        assert_eq!(
            transitional,
            vec![
                PowerState::PendingOn,
                PowerState::PendingOff,
                PowerState::Warming,
                PowerState::Cooling
            ]
        );
    }

    #[test]
    fn should_only_treat_on_off_and_error_as_terminal() {
        assert!(PowerState::On.is_terminal());
        assert!(PowerState::Off.is_terminal());
        assert!(PowerState::Error.is_terminal());
        assert!(!PowerState::Unknown.is_terminal());
        assert!(!PowerState::Warming.is_terminal());
    }

    #[test]
    fn should_parse_every_displayed_state() {
        for state in PowerState::ALL {
            assert_eq!(state.to_string().parse::<PowerState>().unwrap(), state);
        }
    }

    #[test]
    fn should_reject_unknown_state_string() {
        assert!("STANDBY".parse::<PowerState>().is_err());
    }

    #[test]
    fn should_serialize_state_in_screaming_snake_case() {
        let json = serde_json::to_string(&PowerState::PendingOff).unwrap();
        assert_eq!(json, "\"PENDING_OFF\"");
    }

    #[test]
    fn should_map_status_onto_state() {
        assert_eq!(PowerState::from(PowerStatus::Warming), PowerState::Warming);
        assert_eq!(PowerState::from(PowerStatus::Unknown), PowerState::Unknown);
    }

    #[test]
    fn should_parse_actions_case_sensitively() {
        assert_eq!("On".parse::<PowerAction>().unwrap(), PowerAction::On);
        assert_eq!(
            "on".parse::<PowerAction>(),
            Err(ValidationError::UnknownAction("on".to_string()))
        );
    }
}
