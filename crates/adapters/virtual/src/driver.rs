//! Simulated driver for one device category.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use powerhub_app::ports::Driver;
use powerhub_domain::device::{Category, Device, PowerAction, PowerStatus};
use powerhub_domain::error::DriverError;

use crate::unit::{Lag, Unit};

/// Injected fault for one device, keyed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Nothing answers on the control port.
    Unreachable,
    /// The device answers but refuses every command.
    Failing,
}

#[derive(Default)]
struct Inner {
    units: HashMap<String, Unit>,
    faults: HashMap<String, Fault>,
    slow: HashSet<String>,
}

/// A [`Driver`] backed by in-memory units.
///
/// Projectors report `WARMING`/`COOLING` while a power cycle runs; other
/// categories report their previous state until the lag has elapsed.
pub struct VirtualDriver {
    category: Category,
    lag: Lag,
    latency: Duration,
    inner: Mutex<Inner>,
}

impl VirtualDriver {
    #[must_use]
    pub fn new(category: Category, lag: Lag, latency: Duration) -> Self {
        Self {
            category,
            lag,
            latency,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Inject or clear a fault for the device called `name`.
    pub fn set_fault(&self, name: &str, fault: Option<Fault>) {
        let mut inner = self.lock();
        match fault {
            Some(fault) => inner.faults.insert(name.to_string(), fault),
            None => inner.faults.remove(name),
        };
    }

    /// Make every call for `name` hang past any timeout.
    pub fn set_slow(&self, name: &str, slow: bool) {
        let mut inner = self.lock();
        if slow {
            inner.slow.insert(name.to_string());
        } else {
            inner.slow.remove(name);
        }
    }

    /// Change the settled power of `name` without a command.
    pub fn set_powered(&self, name: &str, powered: bool) {
        self.lock()
            .units
            .entry(name.to_string())
            .or_default()
            .force(powered);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulated round trip: wait the configured latency, or the whole
    /// budget for a device marked slow, then check for an injected fault.
    async fn round_trip(&self, device: &Device, timeout: Duration) -> Result<(), DriverError> {
        let slow = self.lock().slow.contains(&device.name);
        if slow {
            tokio::time::sleep(timeout).await;
            return Err(DriverError::Timeout(timeout));
        }
        if self.latency > timeout {
            tokio::time::sleep(timeout).await;
            return Err(DriverError::Timeout(timeout));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.lock().faults.get(&device.name) {
            Some(Fault::Unreachable) => Err(DriverError::Unreachable(format!(
                "connection to {} refused",
                device.address
            ))),
            Some(Fault::Failing) => Err(DriverError::Rejected("simulated fault".to_string())),
            None => Ok(()),
        }
    }

    async fn command(
        &self,
        device: &Device,
        action: PowerAction,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.round_trip(device, timeout).await?;
        self.lock()
            .units
            .entry(device.name.clone())
            .or_default()
            .command(action, Instant::now());
        tracing::debug!(device = %device.name, category = %self.category, %action, "virtual command");
        Ok(())
    }
}

#[async_trait]
impl Driver for VirtualDriver {
    async fn power_on(&self, device: &Device, timeout: Duration) -> Result<(), DriverError> {
        self.command(device, PowerAction::On, timeout).await
    }

    async fn power_off(&self, device: &Device, timeout: Duration) -> Result<(), DriverError> {
        self.command(device, PowerAction::Off, timeout).await
    }

    async fn query_status(
        &self,
        device: &Device,
        timeout: Duration,
    ) -> Result<PowerStatus, DriverError> {
        self.round_trip(device, timeout).await?;
        let extended = self.category == Category::Projector;
        Ok(self
            .lock()
            .units
            .entry(device.name.clone())
            .or_default()
            .status(Instant::now(), self.lag, extended))
    }
}
