//! Shared application state for axum handlers.

use std::sync::Arc;

use powerhub_app::notification_bus::NotificationBus;
use powerhub_app::ports::{DevicePublisher, DeviceRepository, ScheduleRepository};
use powerhub_app::services::command_executor::CommandExecutor;
use powerhub_app::services::device_service::DeviceService;
use powerhub_app::services::schedule_service::ScheduleService;

/// Application state shared across all axum handlers.
///
/// Generic over the device repository, schedule repository and state
/// publisher to avoid dynamic dispatch. `Clone` is implemented manually so
/// the underlying types themselves do not need to be `Clone` — only the
/// `Arc` wrappers are cloned.
pub struct AppState<DR, SR, P> {
    /// Wake/shutdown orchestration.
    pub executor: Arc<CommandExecutor<DR, P>>,
    /// Read-only device queries.
    pub device_service: Arc<DeviceService<DR>>,
    /// Schedule CRUD service.
    pub schedule_service: Arc<ScheduleService<SR, DR>>,
    /// Live update fan-out.
    pub bus: Arc<NotificationBus>,
}

impl<DR, SR, P> Clone for AppState<DR, SR, P> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            device_service: Arc::clone(&self.device_service),
            schedule_service: Arc::clone(&self.schedule_service),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<DR, SR, P> AppState<DR, SR, P>
where
    DR: DeviceRepository + Send + Sync + 'static,
    SR: ScheduleRepository + Send + Sync + 'static,
    P: DevicePublisher + Send + Sync + 'static,
{
    /// Create a new application state from pre-wrapped `Arc` services.
    ///
    /// The executor and bus are shared with the background loops, so they
    /// are built by the caller.
    pub fn from_arcs(
        executor: Arc<CommandExecutor<DR, P>>,
        device_service: Arc<DeviceService<DR>>,
        schedule_service: Arc<ScheduleService<SR, DR>>,
        bus: Arc<NotificationBus>,
    ) -> Self {
        Self {
            executor,
            device_service,
            schedule_service,
            bus,
        }
    }
}
