//! Category profiles — the timing table that parameterises command
//! execution and reconciliation per [`Category`].
//!
//! The pending timeout is the bounded-staleness contract between the two:
//! a transition state younger than it belongs to the command executor, an
//! older one may be force-checked by the reconciler.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::device::{Category, PowerAction, PowerState};
use crate::error::DriverError;

/// Delays before verifying a command's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyDelays {
    /// Wait before the first status query.
    pub first: Duration,
    /// Extra wait before the single retry, used only if the first query still
    /// reports a transition.
    pub retry: Duration,
}

impl VerifyDelays {
    #[must_use]
    pub const fn secs(first: u64, retry: u64) -> Self {
        Self {
            first: Duration::from_secs(first),
            retry: Duration::from_secs(retry),
        }
    }
}

/// Timing and policy for one device category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProfile {
    /// How long a command holds the device lock at most.
    pub lock_duration: Duration,
    /// Period of the reconciliation poll.
    pub reconcile_interval: Duration,
    /// Maximum age of a transition state before reconciliation may override it.
    pub pending_timeout: Duration,
    /// Bound on `power_on` / `power_off` driver calls.
    pub command_timeout: Duration,
    /// Bound on `query_status` driver calls.
    pub status_timeout: Duration,
    pub verify_on: VerifyDelays,
    pub verify_off: VerifyDelays,
    /// Use `WARMING`/`COOLING` instead of `PENDING_ON`/`PENDING_OFF` while a
    /// command is being confirmed.
    pub extended_transition: bool,
    /// An unreachable device is reported as `OFF` rather than as an error.
    ///
    /// Sound only for categories where "powered off" means "nothing listens
    /// on the control port".
    pub unreachable_is_off: bool,
}

impl CategoryProfile {
    /// Built-in defaults for a category.
    #[must_use]
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::Display => Self {
                lock_duration: Duration::from_secs(15),
                reconcile_interval: Duration::from_secs(10),
                pending_timeout: Duration::from_secs(30),
                command_timeout: Duration::from_secs(5),
                status_timeout: Duration::from_secs(5),
                verify_on: VerifyDelays::secs(5, 10),
                verify_off: VerifyDelays::secs(5, 10),
                extended_transition: false,
                unreachable_is_off: true,
            },
            Category::Computer => Self {
                lock_duration: Duration::from_secs(30),
                reconcile_interval: Duration::from_secs(15),
                pending_timeout: Duration::from_secs(120),
                command_timeout: Duration::from_secs(5),
                status_timeout: Duration::from_secs(5),
                verify_on: VerifyDelays::secs(60, 30),
                verify_off: VerifyDelays::secs(30, 30),
                extended_transition: false,
                unreachable_is_off: true,
            },
            Category::Light => Self {
                lock_duration: Duration::from_secs(10),
                reconcile_interval: Duration::from_secs(10),
                pending_timeout: Duration::from_secs(30),
                command_timeout: Duration::from_secs(5),
                status_timeout: Duration::from_secs(5),
                verify_on: VerifyDelays::secs(3, 5),
                verify_off: VerifyDelays::secs(3, 5),
                extended_transition: false,
                unreachable_is_off: false,
            },
            Category::Projector => Self {
                lock_duration: Duration::from_secs(20),
                reconcile_interval: Duration::from_secs(15),
                pending_timeout: Duration::from_secs(60),
                command_timeout: Duration::from_secs(10),
                status_timeout: Duration::from_secs(8),
                verify_on: VerifyDelays::secs(20, 15),
                verify_off: VerifyDelays::secs(25, 20),
                extended_transition: true,
                unreachable_is_off: true,
            },
        }
    }

    /// State written while a command for `action` awaits confirmation.
    #[must_use]
    pub fn transition_state(&self, action: PowerAction) -> PowerState {
        match (action, self.extended_transition) {
            (PowerAction::On, false) => PowerState::PendingOn,
            (PowerAction::Off, false) => PowerState::PendingOff,
            (PowerAction::On, true) => PowerState::Warming,
            (PowerAction::Off, true) => PowerState::Cooling,
        }
    }

    /// State implied by a failed status query, if the category's policy
    /// implies one.
    ///
    /// Only an unreachable device on a category with
    /// [`unreachable_is_off`](Self::unreachable_is_off) maps to `OFF`; any
    /// other failure carries no information about the power state.
    #[must_use]
    pub fn state_on_failure(&self, err: &DriverError) -> Option<PowerState> {
        (self.unreachable_is_off && err.is_unreachable()).then_some(PowerState::Off)
    }

    /// Verification delays for `action`.
    #[must_use]
    pub fn verify_delays(&self, action: PowerAction) -> VerifyDelays {
        match action {
            PowerAction::On => self.verify_on,
            PowerAction::Off => self.verify_off,
        }
    }
}

/// Per-category profile table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProfiles {
    profiles: BTreeMap<Category, CategoryProfile>,
}

impl Default for CategoryProfiles {
    fn default() -> Self {
        Self {
            profiles: Category::ALL
                .into_iter()
                .map(|c| (c, CategoryProfile::default_for(c)))
                .collect(),
        }
    }
}

impl CategoryProfiles {
    /// Profile for `category`.
    #[must_use]
    pub fn get(&self, category: Category) -> &CategoryProfile {
        // The table is filled for every category at construction and entries
        // are only ever replaced.
        &self.profiles[&category]
    }

    /// Replace the profile for `category`.
    pub fn set(&mut self, category: Category, profile: CategoryProfile) {
        self.profiles.insert(category, profile);
    }

    /// Iterate over all `(category, profile)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryProfile)> {
        self.profiles.iter().map(|(c, p)| (*c, p))
    }
}
