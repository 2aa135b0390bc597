//! Schedule — a weekly, minute-granularity power command over a set of
//! devices.
//!
//! A non-repeating schedule runs once and is then deleted by the trigger
//! engine; a repeating one keeps its record and accumulates
//! `last_executed` / `last_execution_results`.

mod days;
mod outcome;
mod time;

pub use days::DaysOfWeek;
pub use outcome::ExecutionResult;
pub use time::ScheduleTime;

use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::device::{Category, PowerAction};
use crate::error::{PowerHubError, ValidationError};
use crate::id::{DeviceId, ScheduleId};
use crate::time::{Timestamp, elapsed_since, now};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// One device a schedule drives, with the category it was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub device_id: DeviceId,
    pub category: Category,
}

/// A stored schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub scheduled_time: ScheduleTime,
    pub devices: Vec<ScheduleTarget>,
    pub action: PowerAction,
    pub days_of_week: DaysOfWeek,
    pub repeat_weekly: bool,
    pub is_active: bool,
    pub last_executed: Option<Timestamp>,
    #[serde(default)]
    pub last_execution_results: Vec<ExecutionResult>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Schedule {
    /// Create a builder for constructing a [`Schedule`].
    #[must_use]
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] when the name is blank or the
    /// device list is empty.
    pub fn validate(&self) -> Result<(), PowerHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.devices.is_empty() {
            return Err(ValidationError::NoDevices.into());
        }
        Ok(())
    }

    /// Whether the schedule should fire on `weekday` at `minute_of_day`.
    ///
    /// The scheduled minute matches when it lies at most `lookback_minutes`
    /// before `minute_of_day`, so a tick delayed past the minute boundary
    /// still picks it up. The window reaches back into the previous weekday
    /// when the tick falls just after midnight.
    #[must_use]
    pub fn is_due(&self, weekday: Weekday, minute_of_day: u32, lookback_minutes: u32) -> bool {
        let scheduled = self.scheduled_time.minute_of_day();
        let same_day = self.days_of_week.contains(weekday)
            && scheduled <= minute_of_day
            && minute_of_day - scheduled <= lookback_minutes;
        let previous_day = self.days_of_week.contains(weekday.pred())
            && minute_of_day + MINUTES_PER_DAY - scheduled <= lookback_minutes;
        same_day || previous_day
    }

    /// Whether the last run is younger than `guard`.
    #[must_use]
    pub fn recently_executed(&self, at: Timestamp, guard: Duration) -> bool {
        self.last_executed
            .is_some_and(|last| last <= at && elapsed_since(last, at) < guard)
    }

    /// Whether `device_id` is one of the targets.
    #[must_use]
    pub fn targets(&self, device_id: DeviceId) -> bool {
        self.devices.iter().any(|t| t.device_id == device_id)
    }
}

/// Partial update of the user-editable fields of a [`Schedule`].
///
/// Bookkeeping fields (`id`, `last_executed`, `last_execution_results`,
/// `created_at`) are not part of the patch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchedulePatch {
    pub name: Option<String>,
    pub scheduled_time: Option<ScheduleTime>,
    pub devices: Option<Vec<ScheduleTarget>>,
    pub action: Option<PowerAction>,
    pub days_of_week: Option<DaysOfWeek>,
    pub repeat_weekly: Option<bool>,
    pub is_active: Option<bool>,
}

impl SchedulePatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply onto `schedule`, touching `updated_at`, and re-validate.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] when the patched schedule breaks
    /// an invariant. `schedule` is left modified in that case, callers should
    /// work on a copy.
    pub fn apply(self, schedule: &mut Schedule, at: Timestamp) -> Result<(), PowerHubError> {
        if let Some(name) = self.name {
            schedule.name = name;
        }
        if let Some(time) = self.scheduled_time {
            schedule.scheduled_time = time;
        }
        if let Some(devices) = self.devices {
            schedule.devices = devices;
        }
        if let Some(action) = self.action {
            schedule.action = action;
        }
        if let Some(days) = self.days_of_week {
            schedule.days_of_week = days;
        }
        if let Some(repeat) = self.repeat_weekly {
            schedule.repeat_weekly = repeat;
        }
        if let Some(active) = self.is_active {
            schedule.is_active = active;
        }
        schedule.updated_at = at;
        schedule.validate()
    }
}

/// Step-by-step builder for [`Schedule`].
#[derive(Debug, Default)]
pub struct ScheduleBuilder {
    id: Option<ScheduleId>,
    name: Option<String>,
    scheduled_time: Option<ScheduleTime>,
    devices: Vec<ScheduleTarget>,
    action: Option<PowerAction>,
    days_of_week: Option<DaysOfWeek>,
    repeat_weekly: Option<bool>,
    is_active: Option<bool>,
    created_at: Option<Timestamp>,
}

impl ScheduleBuilder {
    #[must_use]
    pub fn id(mut self, id: ScheduleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn scheduled_time(mut self, time: ScheduleTime) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    #[must_use]
    pub fn device(mut self, device_id: DeviceId, category: Category) -> Self {
        self.devices.push(ScheduleTarget {
            device_id,
            category,
        });
        self
    }

    #[must_use]
    pub fn devices(mut self, devices: Vec<ScheduleTarget>) -> Self {
        self.devices = devices;
        self
    }

    #[must_use]
    pub fn action(mut self, action: PowerAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn days_of_week(mut self, days: DaysOfWeek) -> Self {
        self.days_of_week = Some(days);
        self
    }

    #[must_use]
    pub fn repeat_weekly(mut self, repeat: bool) -> Self {
        self.repeat_weekly = Some(repeat);
        self
    }

    #[must_use]
    pub fn is_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: Timestamp) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Consume the builder, validate, and return a [`Schedule`].
    ///
    /// `repeat_weekly` and `is_active` default to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] if the time, action or days are
    /// missing, or if the assembled schedule is invalid.
    pub fn build(self) -> Result<Schedule, PowerHubError> {
        let scheduled_time = self
            .scheduled_time
            .ok_or_else(|| ValidationError::InvalidTime(String::new()))?;
        let action = self
            .action
            .ok_or_else(|| ValidationError::UnknownAction(String::new()))?;
        let days_of_week = self.days_of_week.ok_or(ValidationError::NoDays)?;
        let created_at = self.created_at.unwrap_or_else(now);
        let schedule = Schedule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            scheduled_time,
            devices: self.devices,
            action,
            days_of_week,
            repeat_weekly: self.repeat_weekly.unwrap_or(true),
            is_active: self.is_active.unwrap_or(true),
            last_executed: None,
            last_execution_results: Vec::new(),
            created_at,
            updated_at: created_at,
        };
        schedule.validate()?;
        Ok(schedule)
    }
}
