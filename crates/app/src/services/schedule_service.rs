//! Schedule service — validated CRUD over the schedule store.
//!
//! Every referenced device must exist and be registered under the category
//! the schedule names; both are checked before anything is written.

use powerhub_domain::device::PowerAction;
use powerhub_domain::error::{NotFoundError, PowerHubError, ValidationError};
use powerhub_domain::id::{DeviceId, ScheduleId};
use powerhub_domain::schedule::{Schedule, SchedulePatch, ScheduleTarget};
use powerhub_domain::time::now;

use crate::ports::{DeviceRepository, ScheduleRepository};

/// Optional criteria for [`ScheduleService::list_schedules`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub is_active: Option<bool>,
    /// Only schedules targeting this device.
    pub device_id: Option<DeviceId>,
    /// Only schedules active on this weekday index (0 = Sunday).
    pub day: Option<u8>,
    pub action: Option<PowerAction>,
}

impl ScheduleFilter {
    #[must_use]
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.is_active.is_none_or(|active| schedule.is_active == active)
            && self.device_id.is_none_or(|id| schedule.targets(id))
            && self.day.is_none_or(|day| schedule.days_of_week.contains_index(day))
            && self.action.is_none_or(|action| schedule.action == action)
    }
}

/// Application service for schedule CRUD operations.
pub struct ScheduleService<S, R> {
    schedules: S,
    devices: R,
}

impl<S, R> ScheduleService<S, R>
where
    S: ScheduleRepository,
    R: DeviceRepository,
{
    /// Create a new service backed by the given repositories.
    pub fn new(schedules: S, devices: R) -> Self {
        Self { schedules, devices }
    }

    /// Create a new schedule after validating it and its targets.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] if invariants fail or a target's
    /// category does not match, [`PowerHubError::NotFound`] if a target
    /// device does not exist, or a storage error.
    #[tracing::instrument(skip(self, schedule), fields(schedule = %schedule.name))]
    pub async fn create_schedule(&self, schedule: Schedule) -> Result<Schedule, PowerHubError> {
        schedule.validate()?;
        self.check_targets(&schedule.devices).await?;
        let created = self.schedules.create(schedule).await?;
        tracing::info!(id = %created.id, time = %created.scheduled_time, "schedule created");
        Ok(created)
    }

    /// Look up a schedule by id.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::NotFound`] when no schedule with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_schedule(&self, id: ScheduleId) -> Result<Schedule, PowerHubError> {
        self.schedules.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Schedule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List schedules matching `filter`, earliest time of day first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_schedules(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<Schedule>, PowerHubError> {
        let mut schedules: Vec<Schedule> = self
            .schedules
            .get_all()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        schedules.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(schedules)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Same as [`create_schedule`](Self::create_schedule), plus
    /// [`PowerHubError::NotFound`] when the schedule does not exist.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_schedule(
        &self,
        id: ScheduleId,
        patch: SchedulePatch,
    ) -> Result<Schedule, PowerHubError> {
        let mut schedule = self.get_schedule(id).await?;
        if let Some(devices) = &patch.devices {
            if devices.is_empty() {
                return Err(ValidationError::NoDevices.into());
            }
            self.check_targets(devices).await?;
        }
        patch.apply(&mut schedule, now())?;
        self.schedules.update(schedule).await
    }

    /// Delete a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::NotFound`] when the schedule does not exist,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_schedule(&self, id: ScheduleId) -> Result<(), PowerHubError> {
        if self.schedules.delete(id).await? {
            Ok(())
        } else {
            Err(NotFoundError {
                entity: "Schedule",
                id: id.to_string(),
            }
            .into())
        }
    }

    async fn check_targets(&self, targets: &[ScheduleTarget]) -> Result<(), PowerHubError> {
        for target in targets {
            let device = self
                .devices
                .get_by_id(target.device_id)
                .await?
                .ok_or_else(|| NotFoundError {
                    entity: "Device",
                    id: target.device_id.to_string(),
                })?;
            if device.category != target.category {
                return Err(ValidationError::CategoryMismatch {
                    device: device.name,
                    expected: target.category.to_string(),
                    actual: device.category.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}
