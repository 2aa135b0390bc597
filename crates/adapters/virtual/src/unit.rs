//! Power-cycle model of one simulated device.

use std::time::Duration;

use tokio::time::Instant;

use powerhub_domain::device::{PowerAction, PowerStatus};

/// How long a simulated device takes to settle after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lag {
    pub warm_up: Duration,
    pub cool_down: Duration,
}

impl Lag {
    fn of(self, action: PowerAction) -> Duration {
        match action {
            PowerAction::On => self.warm_up,
            PowerAction::Off => self.cool_down,
        }
    }
}

/// One simulated device: settled power plus an optional cycle in progress.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Unit {
    powered: bool,
    cycle: Option<(PowerAction, Instant)>,
}

impl Unit {
    /// Start moving towards `action`. Repeating the current direction keeps
    /// the original start time.
    pub(crate) fn command(&mut self, action: PowerAction, at: Instant) {
        match self.cycle {
            Some((current, _)) if current == action => {}
            _ => self.cycle = Some((action, at)),
        }
    }

    /// Status at `at`. `extended` devices report `WARMING`/`COOLING` while a
    /// cycle runs; others keep reporting the previous state until it ends.
    pub(crate) fn status(&mut self, at: Instant, lag: Lag, extended: bool) -> PowerStatus {
        if let Some((action, started)) = self.cycle {
            if at.saturating_duration_since(started) >= lag.of(action) {
                self.powered = action == PowerAction::On;
                self.cycle = None;
            } else if extended {
                return match action {
                    PowerAction::On => PowerStatus::Warming,
                    PowerAction::Off => PowerStatus::Cooling,
                };
            }
        }
        if self.powered {
            PowerStatus::On
        } else {
            PowerStatus::Off
        }
    }

    /// Flip the settled state without a command, as a person at the device would.
    pub(crate) fn force(&mut self, powered: bool) {
        self.powered = powered;
        self.cycle = None;
    }
}
