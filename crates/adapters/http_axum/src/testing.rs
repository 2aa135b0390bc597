//! Minimal in-memory wiring for the handler tests.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use axum::response::Response;

use powerhub_app::lock_manager::LockManager;
use powerhub_app::notification_bus::NotificationBus;
use powerhub_app::ports::{DeviceRepository, Driver, DriverRegistry, ScheduleRepository};
use powerhub_app::services::command_executor::CommandExecutor;
use powerhub_app::services::device_service::DeviceService;
use powerhub_app::services::schedule_service::ScheduleService;
use powerhub_app::state_writer::StateWriter;
use powerhub_domain::device::{Category, Device, PowerState, PowerStatus};
use powerhub_domain::error::{DriverError, PowerHubError};
use powerhub_domain::id::{DeviceId, ScheduleId};
use powerhub_domain::profile::CategoryProfiles;
use powerhub_domain::schedule::{ExecutionResult, Schedule};
use powerhub_domain::time::Timestamp;

use crate::state::AppState;

pub(crate) type TestState =
    AppState<Arc<MemDevices>, Arc<MemSchedules>, Arc<NotificationBus>>;

#[derive(Default)]
pub(crate) struct MemDevices(Mutex<Vec<Device>>);

impl MemDevices {
    pub(crate) fn find(&self, name: &str) -> Option<Device> {
        self.0.lock().unwrap().iter().find(|d| d.name == name).cloned()
    }
}

impl DeviceRepository for MemDevices {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        self.0.lock().unwrap().push(device.clone());
        async { Ok(device) }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let found = self.0.lock().unwrap().iter().find(|d| d.id == id).cloned();
        async { Ok(found) }
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let found = self.find(name);
        async { Ok(found) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let all = self.0.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn find_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let found: Vec<Device> = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.category == category)
            .cloned()
            .collect();
        async { Ok(found) }
    }

    fn update_state(
        &self,
        id: DeviceId,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let updated = self.0.lock().unwrap().iter_mut().find(|d| d.id == id).map(|d| {
            d.state = state;
            d.last_error = last_error;
            d.timestamp = timestamp;
            d.clone()
        });
        async { Ok(updated) }
    }

    fn update_state_if(
        &self,
        expected: &Device,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let updated = self
            .0
            .lock()
            .unwrap()
            .iter_mut()
            .find(|d| {
                d.id == expected.id && d.state == expected.state && d.timestamp == expected.timestamp
            })
            .map(|d| {
                d.state = state;
                d.last_error = last_error;
                d.timestamp = timestamp;
                d.clone()
            });
        async { Ok(updated) }
    }

    fn upsert_by_name(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        self.0.lock().unwrap().push(device.clone());
        async { Ok(device) }
    }
}

#[derive(Default)]
pub(crate) struct MemSchedules(Mutex<Vec<Schedule>>);

impl ScheduleRepository for MemSchedules {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        self.0.lock().unwrap().push(schedule.clone());
        async { Ok(schedule) }
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, PowerHubError>> + Send {
        let found = self.0.lock().unwrap().iter().find(|s| s.id == id).cloned();
        async { Ok(found) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, PowerHubError>> + Send {
        let all = self.0.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn update(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        let mut store = self.0.lock().unwrap();
        store.retain(|s| s.id != schedule.id);
        store.push(schedule.clone());
        async { Ok(schedule) }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<bool, PowerHubError>> + Send {
        let mut store = self.0.lock().unwrap();
        let before = store.len();
        store.retain(|s| s.id != id);
        let removed = store.len() < before;
        async move { Ok(removed) }
    }

    fn record_execution(
        &self,
        _id: ScheduleId,
        _executed_at: Timestamp,
        _results: Vec<ExecutionResult>,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        async { Ok(()) }
    }
}

/// Driver that accepts every command, or refuses all of them.
pub(crate) struct StubDriver {
    failure: Option<DriverError>,
}

#[async_trait]
impl Driver for StubDriver {
    async fn power_on(&self, _device: &Device, _timeout: Duration) -> Result<(), DriverError> {
        self.failure.clone().map_or(Ok(()), Err)
    }

    async fn power_off(&self, _device: &Device, _timeout: Duration) -> Result<(), DriverError> {
        self.failure.clone().map_or(Ok(()), Err)
    }

    async fn query_status(
        &self,
        _device: &Device,
        _timeout: Duration,
    ) -> Result<PowerStatus, DriverError> {
        Ok(PowerStatus::On)
    }
}

/// State over the given devices. Lights get a driver that rejects every
/// command; other categories one that accepts.
pub(crate) fn test_state(devices: Vec<Device>) -> (TestState, Arc<MemDevices>) {
    let repo = Arc::new(MemDevices(Mutex::new(devices)));
    let bus = Arc::new(NotificationBus::default());
    let ok = Arc::new(StubDriver { failure: None });
    let drivers = DriverRegistry::new()
        .with(Category::Display, ok.clone())
        .with(Category::Computer, ok.clone())
        .with(Category::Projector, ok)
        .with(
            Category::Light,
            Arc::new(StubDriver {
                failure: Some(DriverError::Rejected("relay stuck".to_string())),
            }),
        );
    let executor = Arc::new(CommandExecutor::new(
        Arc::new(StateWriter::new(Arc::clone(&repo), Arc::clone(&bus))),
        Arc::new(LockManager::new()),
        drivers,
        Arc::new(CategoryProfiles::default()),
    ));
    let state = AppState::from_arcs(
        executor,
        Arc::new(DeviceService::new(Arc::clone(&repo))),
        Arc::new(ScheduleService::new(
            Arc::new(MemSchedules::default()),
            Arc::clone(&repo),
        )),
        bus,
    );
    (state, repo)
}

pub(crate) fn device(name: &str, category: Category, state: PowerState) -> Device {
    Device::builder()
        .name(name)
        .category(category)
        .address("192.168.1.50")
        .state(state)
        .build()
        .unwrap()
}

pub(crate) fn request(method: &str, uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match json {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
