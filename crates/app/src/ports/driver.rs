//! Driver port — the per-category capability that actually powers hardware
//! on and off.
//!
//! Concrete wire protocols live in adapter crates. The core only sees the
//! three operations below and always bounds them with its own timeout, so a
//! misbehaving driver cannot stall a command past its category's budget.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use powerhub_domain::device::{Category, Device, PowerStatus};
use powerhub_domain::error::DriverError;

/// Remote power control for one device category.
///
/// `timeout` is the budget the caller grants; implementations should give up
/// and return [`DriverError::Timeout`] once it is spent.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn power_on(&self, device: &Device, timeout: Duration) -> Result<(), DriverError>;

    async fn power_off(&self, device: &Device, timeout: Duration) -> Result<(), DriverError>;

    async fn query_status(
        &self,
        device: &Device,
        timeout: Duration,
    ) -> Result<PowerStatus, DriverError>;
}

/// Category → driver lookup table.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<Category, Arc<dyn Driver>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("categories", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DriverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` for `category`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, category: Category, driver: Arc<dyn Driver>) -> Self {
        self.drivers.insert(category, driver);
        self
    }

    /// Driver bound to `category`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Unsupported`] when none is registered.
    pub fn get(&self, category: Category) -> Result<Arc<dyn Driver>, DriverError> {
        self.drivers
            .get(&category)
            .cloned()
            .ok_or_else(|| DriverError::Unsupported(format!("no driver for category {category}")))
    }
}

/// Run a driver call under `timeout`, mapping expiry to [`DriverError::Timeout`].
pub(crate) async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, DriverError>>,
) -> Result<T, DriverError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(DriverError::Timeout(timeout)))
}
