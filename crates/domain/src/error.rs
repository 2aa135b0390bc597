//! Common error types used across the workspace.
//!
//! Every layer converts its own failures into [`PowerHubError`] through
//! typed `From` conversions. Validation problems are modelled as a closed
//! enum so adapters can map them to precise client responses.

use std::time::Duration;

/// Base error type shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum PowerHubError {
    /// Input rejected before any state mutation.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced device or schedule does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The device is locked by a command in flight or is mid-transition.
    #[error("device busy")]
    Busy(#[from] BusyError),

    /// The driver failed to carry out a power command.
    #[error("driver failure")]
    Driver(#[from] DriverFailure),

    /// Persistence failure, boxed so the domain stays IO-agnostic.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

impl PowerHubError {
    /// Whether the error is a [`Busy`](Self::Busy) rejection.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// One-line description including the wrapped cause.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::NotFound(err) => err.to_string(),
            Self::Busy(err) => format!("{err}: {}", err.message()),
            Self::Driver(err) => format!("{err}: {}", err.source),
            Self::Storage(err) => format!("storage error: {err}"),
        }
    }
}

/// Reasons an input value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("address must not be empty")]
    EmptyAddress,

    #[error("time must be in HH:MM format (e.g. 08:30, 14:00), got {0:?}")]
    InvalidTime(String),

    #[error("at least one device is required")]
    NoDevices,

    #[error("at least one day of week is required")]
    NoDays,

    #[error("days of week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    DayOutOfRange(i64),

    #[error("unknown device category {0:?}")]
    UnknownCategory(String),

    #[error("action must be \"On\" or \"Off\", got {0:?}")]
    UnknownAction(String),

    #[error("device {device} category mismatch: expected {expected}, got {actual}")]
    CategoryMismatch {
        device: String,
        expected: String,
        actual: String,
    },

    #[error("invalid identifier {0:?}")]
    InvalidId(String),
}

/// A lookup that returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record that was looked up (`"Device"`, `"Schedule"`).
    pub entity: &'static str,
    /// The key used for the lookup.
    pub id: String,
}

/// Why a command was refused with "busy".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    /// Another command holds the device lock.
    Locked,
    /// The stored state is a transition that has not settled yet.
    InTransition,
}

/// A command was refused because the device is already being driven.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{device_name} is busy")]
pub struct BusyError {
    pub device_name: String,
    pub reason: BusyReason,
}

impl BusyError {
    /// Human readable explanation, suitable for client display.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self.reason {
            BusyReason::Locked => "Another command is in progress. Please wait a moment.",
            BusyReason::InTransition => "Device is in a transition state. Please wait.",
        }
    }
}

/// Failure reported by a driver, or produced by the caller's timeout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The operation did not complete within the allotted time.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The device could not be reached (connection refused, no route, ...).
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The device answered but refused the command (protocol NAK, vendor error).
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The driver cannot perform this operation for this device.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Whether this failure means the device did not answer at all.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unreachable(_))
    }
}

/// A driver error attributed to the device it happened on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to {operation} {device_name}")]
pub struct DriverFailure {
    pub device_name: String,
    /// `"wake"` or `"shutdown"`.
    pub operation: &'static str,
    #[source]
    pub source: DriverError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_base_error() {
        let err: PowerHubError = ValidationError::NoDays.into();
        assert!(matches!(
            err,
            PowerHubError::Validation(ValidationError::NoDays)
        ));
    }

    #[test]
    fn should_flag_busy_errors() {
        let err: PowerHubError = BusyError {
            device_name: "proj1".to_string(),
            reason: BusyReason::Locked,
        }
        .into();
        assert!(err.is_busy());
        assert!(!PowerHubError::from(ValidationError::EmptyName).is_busy());
    }

    #[test]
    fn should_include_cause_in_detail() {
        let err: PowerHubError = DriverFailure {
            device_name: "proj1".to_string(),
            operation: "shutdown",
            source: DriverError::Timeout(Duration::from_secs(10)),
        }
        .into();
        assert_eq!(err.detail(), "failed to shutdown proj1: timed out after 10000ms");

        let busy: PowerHubError = BusyError {
            device_name: "proj1".to_string(),
            reason: BusyReason::InTransition,
        }
        .into();
        assert_eq!(
            busy.detail(),
            "proj1 is busy: Device is in a transition state. Please wait."
        );
    }

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "lobby".to_string(),
        };
        assert_eq!(err.to_string(), "Device lobby not found");
    }

    #[test]
    fn should_treat_timeouts_as_unreachable() {
        assert!(DriverError::Timeout(Duration::from_secs(3)).is_unreachable());
        assert!(DriverError::Unreachable("refused".to_string()).is_unreachable());
        assert!(!DriverError::Rejected("NAK 0x01".to_string()).is_unreachable());
    }

    #[test]
    fn should_display_timeout_in_milliseconds() {
        let err = DriverError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "timed out after 1500ms");
    }

    #[test]
    fn should_expose_driver_error_as_source_of_failure() {
        let failure = DriverFailure {
            device_name: "pc1".to_string(),
            operation: "wake",
            source: DriverError::Rejected("nope".to_string()),
        };
        assert_eq!(failure.to_string(), "failed to wake pc1");
        let source = std::error::Error::source(&failure).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("command rejected: nope"));
    }
}
