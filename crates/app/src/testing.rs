//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use powerhub_domain::device::{Category, Device, PowerState, PowerStatus};
use powerhub_domain::error::{DriverError, PowerHubError};
use powerhub_domain::id::{DeviceId, ScheduleId};
use powerhub_domain::schedule::{ExecutionResult, Schedule};
use powerhub_domain::time::Timestamp;

use crate::ports::{DevicePublisher, DeviceRepository, Driver, ScheduleRepository};

// ── Device repo ────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryDeviceRepo {
    store: Mutex<HashMap<DeviceId, Device>>,
    state_writes: AtomicUsize,
    before_conditional_write: Mutex<Option<StoreHook>>,
}

type StoreHook = Box<dyn FnOnce(&mut Device) + Send>;

impl InMemoryDeviceRepo {
    pub(crate) fn with(devices: Vec<Device>) -> Self {
        Self {
            store: Mutex::new(devices.into_iter().map(|d| (d.id, d)).collect()),
            state_writes: AtomicUsize::new(0),
            before_conditional_write: Mutex::new(None),
        }
    }

    /// Runs `hook` on the stored record right before the next
    /// `update_state_if` compares it, as a concurrent writer would.
    pub(crate) fn before_next_conditional_write(
        &self,
        hook: impl FnOnce(&mut Device) + Send + 'static,
    ) {
        *self.before_conditional_write.lock().unwrap() = Some(Box::new(hook));
    }

    pub(crate) fn get(&self, id: DeviceId) -> Device {
        self.store.lock().unwrap()[&id].clone()
    }

    pub(crate) fn state_writes(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }
}

impl DeviceRepository for InMemoryDeviceRepo {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        self.store.lock().unwrap().insert(device.id, device.clone());
        async { Ok(device) }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let result = self.store.lock().unwrap().get(&id).cloned();
        async { Ok(result) }
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let result = self
            .store
            .lock()
            .unwrap()
            .values()
            .find(|d| d.name == name)
            .cloned();
        async { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let mut result: Vec<Device> = self.store.lock().unwrap().values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        async { Ok(result) }
    }

    fn find_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Device>, PowerHubError>> + Send {
        let result: Vec<Device> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.category == category)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update_state(
        &self,
        id: DeviceId,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        let result = store.get_mut(&id).map(|device| {
            device.state = state;
            device.last_error = last_error;
            device.timestamp = timestamp;
            device.clone()
        });
        if result.is_some() {
            self.state_writes.fetch_add(1, Ordering::SeqCst);
        }
        async { Ok(result) }
    }

    fn update_state_if(
        &self,
        expected: &Device,
        state: PowerState,
        last_error: Option<String>,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, PowerHubError>> + Send {
        let hook = self.before_conditional_write.lock().unwrap().take();
        let mut store = self.store.lock().unwrap();
        let result = store.get_mut(&expected.id).and_then(|device| {
            if let Some(hook) = hook {
                hook(device);
            }
            if device.state != expected.state || device.timestamp != expected.timestamp {
                return None;
            }
            device.state = state;
            device.last_error = last_error;
            device.timestamp = timestamp;
            Some(device.clone())
        });
        if result.is_some() {
            self.state_writes.fetch_add(1, Ordering::SeqCst);
        }
        async { Ok(result) }
    }

    fn upsert_by_name(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, PowerHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        let existing = store.values().find(|d| d.name == device.name).cloned();
        let saved = match existing {
            Some(existing) => Device {
                id: existing.id,
                state: existing.state,
                last_error: existing.last_error,
                timestamp: existing.timestamp,
                ..device
            },
            None => device,
        };
        store.insert(saved.id, saved.clone());
        async { Ok(saved) }
    }
}

// ── Schedule repo ──────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryScheduleRepo {
    store: Mutex<HashMap<ScheduleId, Schedule>>,
    failing_deletes: AtomicBool,
}

impl InMemoryScheduleRepo {
    pub(crate) fn with(schedules: Vec<Schedule>) -> Self {
        Self {
            store: Mutex::new(schedules.into_iter().map(|s| (s.id, s)).collect()),
            failing_deletes: AtomicBool::new(false),
        }
    }

    /// Every subsequent delete fails with a storage error.
    pub(crate) fn fail_deletes(&self) {
        self.failing_deletes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn find(&self, id: ScheduleId) -> Option<Schedule> {
        self.store.lock().unwrap().get(&id).cloned()
    }
}

impl ScheduleRepository for InMemoryScheduleRepo {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(schedule.id, schedule.clone());
        async { Ok(schedule) }
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, PowerHubError>> + Send {
        let result = self.find(id);
        async { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, PowerHubError>> + Send {
        let result: Vec<Schedule> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, PowerHubError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(schedule.id, schedule.clone());
        async { Ok(schedule) }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<bool, PowerHubError>> + Send {
        let result = if self.failing_deletes.load(Ordering::SeqCst) {
            Err(PowerHubError::Storage("database is locked".into()))
        } else {
            Ok(self.store.lock().unwrap().remove(&id).is_some())
        };
        async move { result }
    }

    fn record_execution(
        &self,
        id: ScheduleId,
        executed_at: Timestamp,
        results: Vec<ExecutionResult>,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        if let Some(schedule) = self.store.lock().unwrap().get_mut(&id) {
            schedule.last_executed = Some(executed_at);
            schedule.last_execution_results = results;
            schedule.updated_at = executed_at;
        }
        async { Ok(()) }
    }
}

// ── Publisher ──────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct SpyPublisher {
    published: Mutex<Vec<Device>>,
}

impl SpyPublisher {
    pub(crate) fn published(&self) -> Vec<Device> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn states(&self) -> Vec<PowerState> {
        self.published().into_iter().map(|d| d.state).collect()
    }
}

impl DevicePublisher for SpyPublisher {
    fn publish(&self, device: Device) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        self.published.lock().unwrap().push(device);
        async { Ok(()) }
    }
}

// ── Driver ─────────────────────────────────────────────────────

/// A driver whose answers are set up front.
///
/// Queued statuses are consumed in order; once exhausted every query returns
/// the fallback.
pub(crate) struct ScriptedDriver {
    command: Mutex<Result<(), DriverError>>,
    queued: Mutex<VecDeque<Result<PowerStatus, DriverError>>>,
    fallback: Mutex<Result<PowerStatus, DriverError>>,
    command_delay: Duration,
    power_on_calls: AtomicUsize,
    power_off_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedDriver {
    pub(crate) fn reporting(status: PowerStatus) -> Self {
        Self {
            command: Mutex::new(Ok(())),
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(status)),
            command_delay: Duration::ZERO,
            power_on_calls: AtomicUsize::new(0),
            power_off_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Commands fail with `err`; status queries report it too.
    pub(crate) fn failing(err: DriverError) -> Self {
        let driver = Self::reporting(PowerStatus::Unknown);
        *driver.command.lock().unwrap() = Err(err.clone());
        *driver.fallback.lock().unwrap() = Err(err);
        driver
    }

    pub(crate) fn then(self, status: Result<PowerStatus, DriverError>) -> Self {
        self.queued.lock().unwrap().push_back(status);
        self
    }

    pub(crate) fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    pub(crate) fn set_status(&self, status: Result<PowerStatus, DriverError>) {
        *self.fallback.lock().unwrap() = status;
    }

    pub(crate) fn power_on_calls(&self) -> usize {
        self.power_on_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn power_off_calls(&self) -> usize {
        self.power_off_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn command(&self) -> Result<(), DriverError> {
        if !self.command_delay.is_zero() {
            tokio::time::sleep(self.command_delay).await;
        }
        self.command.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn power_on(&self, _device: &Device, _timeout: Duration) -> Result<(), DriverError> {
        self.power_on_calls.fetch_add(1, Ordering::SeqCst);
        self.command().await
    }

    async fn power_off(&self, _device: &Device, _timeout: Duration) -> Result<(), DriverError> {
        self.power_off_calls.fetch_add(1, Ordering::SeqCst);
        self.command().await
    }

    async fn query_status(
        &self,
        _device: &Device,
        _timeout: Duration,
    ) -> Result<PowerStatus, DriverError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

// ── Fixtures ───────────────────────────────────────────────────

pub(crate) fn device(name: &str, category: Category, state: PowerState) -> Device {
    Device::builder()
        .name(name)
        .category(category)
        .address("192.168.1.50")
        .state(state)
        .build()
        .unwrap()
}
