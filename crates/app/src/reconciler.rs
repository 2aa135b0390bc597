//! Reconciliation loop — periodic per-category re-poll that corrects drift
//! between stored and real device state.
//!
//! A device is skipped while a command holds its lock, and while a
//! transition state is younger than the category's pending timeout: both
//! mean the command executor is still resolving it. Devices of one category
//! are polled concurrently; each category ticks on its own interval.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use powerhub_domain::device::{Category, Device, PowerState};
use powerhub_domain::error::PowerHubError;
use powerhub_domain::profile::CategoryProfiles;
use powerhub_domain::time::{elapsed_since, now};

use crate::lock_manager::LockManager;
use crate::ports::driver::bounded;
use crate::ports::{DevicePublisher, DeviceRepository, DriverRegistry};
use crate::state_writer::StateWriter;

/// What reconciliation did with one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A command holds the lock.
    Locked,
    /// A transition younger than the pending timeout.
    Settling,
    /// Observed state equals stored state; nothing written.
    Unchanged,
    /// Another writer changed the record while the driver was being queried.
    Superseded,
    /// Stored state was corrected.
    Updated(PowerState),
    /// The status query failed and the category gives no fallback state.
    Unreadable,
}

/// Tally of one category pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub skipped: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub failed: usize,
}

impl Report {
    fn add(&mut self, outcome: &Result<Outcome, PowerHubError>) {
        match outcome {
            Ok(Outcome::Locked | Outcome::Settling | Outcome::Superseded) => self.skipped += 1,
            Ok(Outcome::Unchanged) => self.unchanged += 1,
            Ok(Outcome::Updated(_)) => self.updated += 1,
            Ok(Outcome::Unreadable) | Err(_) => self.failed += 1,
        }
    }
}

pub struct Reconciler<R, P> {
    writer: Arc<StateWriter<R, P>>,
    locks: Arc<LockManager>,
    drivers: DriverRegistry,
    profiles: Arc<CategoryProfiles>,
}

impl<R, P> Reconciler<R, P>
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

    /// Spawn one ticker per category. The first pass runs immediately.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.run(category).await })
            })
            .collect()
    }

    /// Tick forever for `category`.
    pub async fn run(self: Arc<Self>, category: Category) {
        let period = self.profiles.get(category).reconcile_interval;
        tracing::info!(%category, ?period, "reconciliation started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.reconcile_category(category).await {
                Ok(report) if report.updated > 0 || report.failed > 0 => {
                    tracing::info!(%category, ?report, "reconciliation pass");
                }
                Ok(report) => tracing::debug!(%category, ?report, "reconciliation pass"),
                Err(err) => tracing::error!(%category, error = %err, "reconciliation pass failed"),
            }
        }
    }

    /// Poll every device of `category` once, concurrently.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the device list cannot be read. Per-device
    /// failures are logged and counted, never returned.
    pub async fn reconcile_category(
        self: &Arc<Self>,
        category: Category,
    ) -> Result<Report, PowerHubError> {
        let devices = self.writer.repo().find_by_category(category).await?;
        let mut tasks = JoinSet::new();
        for device in devices {
            let this = Arc::clone(self);
            tasks.spawn(async move {
                let outcome = this.reconcile_device(&device).await;
                if let Err(err) = &outcome {
                    tracing::warn!(device = %device.name, error = %err, "reconciliation failed");
                }
                outcome
            });
        }

        let mut report = Report::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.add(&outcome),
                Err(err) => {
                    tracing::error!(%category, error = %err, "reconciliation task panicked");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Poll one device and correct its stored state if it drifted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if writing the device fails.
    pub async fn reconcile_device(&self, device: &Device) -> Result<Outcome, PowerHubError> {
        let profile = self.profiles.get(device.category);

        if self.locks.is_locked(device.id) {
            tracing::debug!(device = %device.name, "skipping, command in flight");
            return Ok(Outcome::Locked);
        }
        if device.state.is_transitional()
            && elapsed_since(device.timestamp, now()) < profile.pending_timeout
        {
            tracing::debug!(device = %device.name, state = %device.state, "skipping, transition settling");
            return Ok(Outcome::Settling);
        }

        let timeout = profile.status_timeout;
        let queried = match self.drivers.get(device.category) {
            Ok(driver) => bounded(timeout, driver.query_status(device, timeout)).await,
            Err(err) => Err(err),
        };
        let observed = match queried {
            Ok(status) => PowerState::from(status),
            Err(err) => match profile.state_on_failure(&err) {
                Some(state) => state,
                None => {
                    tracing::warn!(device = %device.name, error = %err, "status query failed");
                    return Ok(Outcome::Unreadable);
                }
            },
        };

        // A command may have started while the driver was being queried.
        if self.locks.is_locked(device.id) {
            return Ok(Outcome::Locked);
        }
        if !device.differs_from(observed, None) {
            return Ok(Outcome::Unchanged);
        }
        // Commits only if nothing was written since `device` was listed.
        match self.writer.write_if_unchanged(device, observed, None).await? {
            Some(updated) => Ok(Outcome::Updated(updated.state)),
            None => {
                tracing::debug!(device = %device.name, "skipping, state written during poll");
                Ok(Outcome::Superseded)
            }
        }
    }
}
