//! Storage port — repository traits for persistence.

use std::future::Future;
use std::sync::Arc;

use powerhub_domain::device::{Category, Device, PowerState};
use powerhub_domain::error::PowerHubError;
use powerhub_domain::id::{DeviceId, ScheduleId};
use powerhub_domain::schedule::{ExecutionResult, Schedule};
use powerhub_domain::time::Timestamp;

/// Persistence for device records and their believed state.
pub trait DeviceRepository {
    /// Insert a new device.
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, PowerHubError>> + Send;

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send;

    /// Look up a device by its unique name.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send;

    fn find_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send;

    /// Atomically overwrite `state`, `last_error` and `timestamp`.
    ///
    /// Returns the updated record, or `None` when the device no longer exists.
    fn update_state(
        &self,
        id: DeviceId,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send;

    /// Like [`update_state`](Self::update_state), but only applied while the
    /// stored `state` and `timestamp` still equal those of `expected`.
    ///
    /// Returns `None` when the device was written since `expected` was read,
    /// or no longer exists.
    fn update_state_if(
        &self,
        expected: &Device,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send;

    /// Insert, or update the descriptive fields of the device with the same
    /// name. The stored id and state are preserved on update.
    fn upsert_by_name(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, PowerHubError>> + Send;
}

/// Persistence for schedules.
pub trait ScheduleRepository {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send;

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, PowerHubError>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, PowerHubError>> + Send;

    /// Replace the user-editable fields of an existing schedule.
    fn update(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send;

    /// Remove a schedule. Returns whether a record was deleted.
    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<bool, PowerHubError>> + Send;

    /// Store the outcome of a run of a repeating schedule.
    fn record_execution(
        &self,
        id: ScheduleId,
        executed_at: Timestamp,
        results: Vec<ExecutionResult>,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send;
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for Arc<T> {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        (**self).create(device)
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        (**self).get_by_id(id)
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        (**self).find_by_name(name)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        (**self).get_all()
    }

    fn find_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        (**self).find_by_category(category)
    }

    fn update_state(
        &self,
        id: DeviceId,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        (**self).update_state(id, state, last_error, timestamp)
    }

    fn update_state_if(
        &self,
        expected: &Device,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        (**self).update_state_if(expected, state, last_error, timestamp)
    }

    fn upsert_by_name(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        (**self).upsert_by_name(device)
    }
}

impl<T: ScheduleRepository + Send + Sync> ScheduleRepository for Arc<T> {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        (**self).create(schedule)
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, PowerHubError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, PowerHubError>> + Send {
        (**self).get_all()
    }

    fn update(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        (**self).update(schedule)
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<bool, PowerHubError>> + Send {
        (**self).delete(id)
    }

    fn record_execution(
        &self,
        id: ScheduleId,
        executed_at: Timestamp,
        results: Vec<ExecutionResult>,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        (**self).record_execution(id, executed_at, results)
    }
}
