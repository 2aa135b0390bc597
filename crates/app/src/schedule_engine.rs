//! Schedule trigger engine — minute-granularity matcher that fans schedule
//! actions out to the command executor.
//!
//! Each tick selects the active schedules due at the current local weekday and
//! minute (with a short lookback so a late tick is not lost), skips those
//! that ran within the duplicate guard, and runs every target device in
//! parallel. One device's failure is recorded in its result slot and never
//! affects its siblings. Every run records `last_executed` and the per-device
//! results; a non-repeating schedule is then deleted, and one left behind by
//! a failed delete is never run again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, Timelike, Utc, Weekday};
use tokio::task::JoinHandle;

use powerhub_domain::device::PowerAction;
use powerhub_domain::error::PowerHubError;
use powerhub_domain::id::ScheduleId;
use powerhub_domain::schedule::{ExecutionResult, Schedule, ScheduleTarget};
use powerhub_domain::time::{Timestamp, now};

use crate::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};
use crate::services::command_executor::CommandExecutor;

/// Tunables of the trigger engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// How many minutes back a scheduled time still counts as due.
    pub lookback_minutes: u32,
    /// A schedule that ran less than this long ago is not run again.
    pub duplicate_guard: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            lookback_minutes: 1,
            duplicate_guard: Duration::from_secs(120),
        }
    }
}

/// Summary of one schedule executed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRun {
    pub schedule_id: ScheduleId,
    pub name: String,
    /// One entry per target, in the schedule's device order.
    pub results: Vec<ExecutionResult>,
    /// The schedule was one-shot and has been removed.
    pub deleted: bool,
}

impl ScheduleRun {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

pub struct ScheduleEngine<S, R, P> {
    schedules: S,
    executor: Arc<CommandExecutor<R, P>>,
    settings: SchedulerSettings,
}

impl<S, R, P> ScheduleEngine<S, R, P>
where
    S: ScheduleRepository + Send + Sync + 'static,
    R: DeviceRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    pub fn new(
        schedules: S,
        executor: Arc<CommandExecutor<R, P>>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            schedules,
            executor,
            settings,
        }
    }

    /// Spawn the minute ticker.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run().await })
    }

    /// Tick at every wall-clock minute boundary, forever.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(settings = ?self.settings, "schedule engine started");
        loop {
            tokio::time::sleep(until_next_minute(&Local::now())).await;
            match self.tick().await {
                Ok(runs) => {
                    for run in runs {
                        tracing::info!(
                            schedule = %run.name,
                            succeeded = run.succeeded(),
                            total = run.results.len(),
                            deleted = run.deleted,
                            "schedule executed"
                        );
                    }
                }
                Err(err) => tracing::error!(error = %err, "schedule tick failed"),
            }
        }
    }

    /// Evaluate schedules against the local clock.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the schedules cannot be listed.
    pub async fn tick(&self) -> Result<Vec<ScheduleRun>, PowerHubError> {
        let local = Local::now();
        let minute_of_day = local.hour() * 60 + local.minute();
        self.run_due(local.weekday(), minute_of_day, local.with_timezone(&Utc))
            .await
    }

    /// Run every schedule due on `weekday` at `minute_of_day`, `at` being the
    /// same instant in UTC.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the schedules cannot be listed. Failures to
    /// delete or update a single schedule are logged.
    #[tracing::instrument(skip(self, at))]
    pub async fn run_due(
        &self,
        weekday: Weekday,
        minute_of_day: u32,
        at: Timestamp,
    ) -> Result<Vec<ScheduleRun>, PowerHubError> {
        let schedules = self.schedules.get_all().await?;
        let mut runs = Vec::new();
        for schedule in schedules {
            if !schedule.repeat_weekly && schedule.last_executed.is_some() {
                self.retry_delete(&schedule).await;
                continue;
            }
            if !schedule.is_active
                || !schedule.is_due(weekday, minute_of_day, self.settings.lookback_minutes)
            {
                continue;
            }
            if schedule.recently_executed(at, self.settings.duplicate_guard) {
                tracing::debug!(schedule = %schedule.name, "skipping, already executed recently");
                continue;
            }
            runs.push(self.run_schedule(schedule, at).await);
        }
        Ok(runs)
    }

    async fn run_schedule(&self, schedule: Schedule, at: Timestamp) -> ScheduleRun {
        tracing::info!(schedule = %schedule.name, action = %schedule.action, "executing schedule");
        let results = self.fan_out(&schedule).await;

        // Stamped first so a one-time schedule whose delete fails never fires again.
        if let Err(err) = self
            .schedules
            .record_execution(schedule.id, at, results.clone())
            .await
        {
            tracing::error!(schedule = %schedule.name, error = %err, "failed to record execution");
        }
        let deleted = if schedule.repeat_weekly {
            false
        } else {
            match self.schedules.delete(schedule.id).await {
                Ok(deleted) => deleted,
                Err(err) => {
                    tracing::error!(schedule = %schedule.name, error = %err, "failed to delete one-time schedule");
                    false
                }
            }
        };

        ScheduleRun {
            schedule_id: schedule.id,
            name: schedule.name,
            results,
            deleted,
        }
    }

    /// A one-time schedule that already ran but is still stored.
    async fn retry_delete(&self, schedule: &Schedule) {
        match self.schedules.delete(schedule.id).await {
            Ok(_) => tracing::info!(schedule = %schedule.name, "removed executed one-time schedule"),
            Err(err) => {
                tracing::warn!(schedule = %schedule.name, error = %err, "executed one-time schedule still pending deletion");
            }
        }
    }

    /// One task per target; results keep the schedule's device order.
    async fn fan_out(&self, schedule: &Schedule) -> Vec<ExecutionResult> {
        let handles: Vec<_> = schedule
            .devices
            .iter()
            .map(|&target| {
                let executor = Arc::clone(&self.executor);
                let action = schedule.action;
                (
                    target,
                    tokio::spawn(async move { run_target(executor, target, action).await }),
                )
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => ExecutionResult::failed(target, None, err.to_string(), now()),
            };
            results.push(result);
        }
        results
    }
}

async fn run_target<R, P>(
    executor: Arc<CommandExecutor<R, P>>,
    target: ScheduleTarget,
    action: PowerAction,
) -> ExecutionResult
where
    R: DeviceRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    let device = match executor.repo().get_by_id(target.device_id).await {
        Ok(Some(device)) => device,
        Ok(None) => return ExecutionResult::failed(target, None, "Device not found", now()),
        Err(err) => return ExecutionResult::failed(target, None, err.detail(), now()),
    };
    if device.category != target.category {
        let message = format!(
            "Category mismatch: expected {}, got {}",
            target.category, device.category
        );
        return ExecutionResult::failed(target, Some(device.name), message, now());
    }

    let name = device.name.clone();
    match executor.execute(device, action).await {
        Ok(accepted) => ExecutionResult::succeeded(target, accepted.device.name, now()),
        Err(err) => {
            tracing::warn!(device = %name, error = %err.detail(), "scheduled command failed");
            ExecutionResult::failed(target, Some(name), err.detail(), now())
        }
    }
}

/// Time left until the next wall-clock minute starts.
fn until_next_minute(now: &impl Timelike) -> Duration {
    let into_minute = Duration::new(
        u64::from(now.second()),
        now.nanosecond() % 1_000_000_000,
    );
    Duration::from_secs(60).saturating_sub(into_minute)
}
