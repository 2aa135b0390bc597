//! Command executor — runs one wake/shutdown request through the device
//! state machine.
//!
//! ```text
//!   stable ──lock──▶ PENDING_* / WARMING / COOLING ──driver ok──▶ (caller answered)
//!                         │                                         │ delay, query
//!                         └──driver error──▶ ERROR, unlock          ▼ (retry once)
//!                                                             observed state, unlock
//! ```
//!
//! The caller gets its answer as soon as the driver accepted the command; the
//! outcome is confirmed by a spawned verification task. That task commits
//! only if its [`Generation`] is still the latest issued for the device.

use std::sync::Arc;

use tokio::task::JoinHandle;

use powerhub_domain::device::{Category, Device, PowerAction, PowerState, PowerStatus};
use powerhub_domain::error::{
    BusyError, BusyReason, DriverError, DriverFailure, NotFoundError, PowerHubError,
};
use powerhub_domain::profile::{CategoryProfile, CategoryProfiles};

use crate::lock_manager::{Generation, LockManager};
use crate::ports::driver::bounded;
use crate::ports::{DevicePublisher, DeviceRepository, Driver, DriverRegistry};
use crate::state_writer::StateWriter;

/// A command the driver accepted; verification is still running.
#[derive(Debug)]
pub struct Accepted {
    /// The device as written in its transition state.
    pub device: Device,
    /// Human readable summary for the client.
    pub message: String,
    pub generation: Generation,
    verification: JoinHandle<()>,
}

impl Accepted {
    /// Wait until the verification task has committed or discarded its result.
    pub async fn verified(self) {
        if let Err(err) = self.verification.await {
            tracing::error!(error = %err, "verification task failed");
        }
    }
}

/// Orchestrates wake/shutdown commands.
pub struct CommandExecutor<R, P> {
    writer: Arc<StateWriter<R, P>>,
    locks: Arc<LockManager>,
    drivers: DriverRegistry,
    profiles: Arc<CategoryProfiles>,
}

impl<R, P> CommandExecutor<R, P>
where
    R: DeviceRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    pub fn new(
        writer: Arc<StateWriter<R, P>>,
        locks: Arc<LockManager>,
        drivers: DriverRegistry,
        profiles: Arc<CategoryProfiles>,
    ) -> Self {
        Self {
            writer,
            locks,
            drivers,
            profiles,
        }
    }

    /// The device store behind this executor.
    pub fn repo(&self) -> &R {
        self.writer.repo()
    }

    /// Resolve `name` within `category` and run `action` on it.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::NotFound`] if no device of that category has
    /// that name, otherwise anything [`execute`](Self::execute) returns.
    #[tracing::instrument(skip(self))]
    pub async fn execute_by_name(
        self: &Arc<Self>,
        category: Category,
        name: &str,
        action: PowerAction,
    ) -> Result<Accepted, PowerHubError> {
        let device = self
            .repo()
            .find_by_name(name)
            .await?
            .filter(|d| d.category == category)
            .ok_or_else(|| NotFoundError {
                entity: "Device",
                id: name.to_string(),
            })?;
        self.execute(device, action).await
    }

    /// Run `action` on `device`.
    ///
    /// # Errors
    ///
    /// - [`PowerHubError::Busy`] if a command holds the lock or the device is
    ///   mid-transition. Nothing is written in that case.
    /// - [`PowerHubError::Driver`] if the driver refused or timed out; the
    ///   device is left in `ERROR` and the lock is released.
    /// - [`PowerHubError::NotFound`] if the device vanished, or a storage
    ///   error; the lock is released in both cases.
    #[tracing::instrument(
        skip(self, device),
        fields(device = %device.name, category = %device.category)
    )]
    pub async fn execute(
        self: &Arc<Self>,
        device: Device,
        action: PowerAction,
    ) -> Result<Accepted, PowerHubError> {
        let profile = self.profiles.get(device.category).clone();
        let busy = |reason| BusyError {
            device_name: device.name.clone(),
            reason,
        };

        if self.locks.is_locked(device.id) {
            return Err(busy(BusyReason::Locked).into());
        }
        if device.state.is_transitional() {
            return Err(busy(BusyReason::InTransition).into());
        }
        let Some(generation) = self.locks.try_acquire(device.id, profile.lock_duration) else {
            return Err(busy(BusyReason::Locked).into());
        };
        tracing::debug!(%generation, "lock acquired");

        match self.start(device, action, &profile, generation).await {
            Ok((pending, driver)) => {
                let message = accepted_message(&pending.name, &profile, action);
                let this = Arc::clone(self);
                let target = pending.clone();
                let verification = tokio::spawn(async move {
                    this.verify(driver, target, action, profile, generation).await;
                });
                Ok(Accepted {
                    device: pending,
                    message,
                    generation,
                    verification,
                })
            }
            Err(err) => {
                self.locks.release_if_current(err.device_id, generation);
                Err(err.error)
            }
        }
    }

    /// Steps up to and including the driver call. On any error the lock is
    /// still held and must be released by the caller.
    async fn start(
        &self,
        device: Device,
        action: PowerAction,
        profile: &CategoryProfile,
        generation: Generation,
    ) -> Result<(Device, Arc<dyn Driver>), StartError> {
        let id = device.id;
        let fail = |error: PowerHubError| StartError {
            device_id: id,
            error,
        };

        let pending = self
            .writer
            .write(&device, profile.transition_state(action), None)
            .await
            .map_err(fail)?
            .ok_or_else(|| {
                fail(
                    NotFoundError {
                        entity: "Device",
                        id: device.name.clone(),
                    }
                    .into(),
                )
            })?;

        let outcome = match self.drivers.get(pending.category) {
            Ok(driver) => {
                let timeout = profile.command_timeout;
                let result = match action {
                    PowerAction::On => bounded(timeout, driver.power_on(&pending, timeout)).await,
                    PowerAction::Off => bounded(timeout, driver.power_off(&pending, timeout)).await,
                };
                result.map(|()| driver)
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(driver) => Ok((pending, driver)),
            Err(source) => {
                tracing::warn!(%generation, error = %source, "driver rejected command");
                self.writer
                    .write(&pending, PowerState::Error, Some(source.to_string()))
                    .await
                    .map_err(fail)?;
                Err(fail(
                    DriverFailure {
                        device_name: pending.name,
                        operation: action.verb(),
                        source,
                    }
                    .into(),
                ))
            }
        }
    }

    /// Delayed confirmation of an accepted command.
    async fn verify(
        &self,
        driver: Arc<dyn Driver>,
        device: Device,
        action: PowerAction,
        profile: CategoryProfile,
        generation: Generation,
    ) {
        let delays = profile.verify_delays(action);
        let timeout = profile.status_timeout;

        tokio::time::sleep(delays.first).await;
        let mut observed = bounded(timeout, driver.query_status(&device, timeout)).await;
        if matches!(observed, Ok(status) if status.is_transitional()) {
            tracing::debug!(device = %device.name, "still in transition, retrying once");
            tokio::time::sleep(delays.retry).await;
            observed = bounded(timeout, driver.query_status(&device, timeout)).await;
        }
        let (state, last_error) = settle(&profile, observed);

        if !self.locks.is_current(device.id, generation) {
            tracing::info!(
                device = %device.name,
                %generation,
                observed = %state,
                "discarding stale verification"
            );
            return;
        }

        match self.commit(&device, state, last_error).await {
            Ok(()) => tracing::debug!(device = %device.name, %generation, %state, "command verified"),
            Err(err) => tracing::error!(device = %device.name, error = %err, "failed to store verified state"),
        }
        self.locks.release_if_current(device.id, generation);
    }

    async fn commit(
        &self,
        device: &Device,
        state: PowerState,
        last_error: Option<String>,
    ) -> Result<(), PowerHubError> {
        // re-read: the stored record is the baseline for change detection
        let Some(current) = self.repo().get_by_id(device.id).await? else {
            return Ok(());
        };
        self.writer.write(&current, state, last_error).await?;
        Ok(())
    }
}

struct StartError {
    device_id: powerhub_domain::id::DeviceId,
    error: PowerHubError,
}

/// Final state and error message for a verification query result.
fn settle(
    profile: &CategoryProfile,
    observed: Result<PowerStatus, DriverError>,
) -> (PowerState, Option<String>) {
    match observed {
        Ok(status) => (status.into(), None),
        Err(err) => match profile.state_on_failure(&err) {
            Some(state) => (state, None),
            None => (PowerState::Error, Some(err.to_string())),
        },
    }
}

fn accepted_message(name: &str, profile: &CategoryProfile, action: PowerAction) -> String {
    match (action, profile.extended_transition) {
        (PowerAction::On, true) => format!("{name} power on command sent. Warming up..."),
        (PowerAction::Off, true) => format!("{name} power off command sent. Cooling down..."),
        (PowerAction::On, false) => format!("Power on command sent to {name}"),
        (PowerAction::Off, false) => format!("Power off command sent to {name}"),
    }
}
