//! # powerhub-adapter-virtual
//!
//! Simulated drivers for demos and end-to-end tests.
//!
//! ## Behaviour
//!
//! | Category | While cycling | After the lag |
//! |----------|---------------|---------------|
//! | Projector | `WARMING` / `COOLING` | `ON` / `OFF` |
//! | Display, Computer, Light | previous state | `ON` / `OFF` |
//!
//! Any device can be marked unreachable, failing or slow to exercise the
//! error paths of the command executor and the reconciler.
//!
//! ## Dependency rule
//!
//! Depends on `powerhub-app` (port traits) and `powerhub-domain` only.

mod driver;
mod unit;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use powerhub_app::ports::{Driver, DriverRegistry};
use powerhub_domain::device::Category;

pub use driver::{Fault, VirtualDriver};
pub use unit::Lag;

/// Timing of the simulated hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSettings {
    pub lag: Lag,
    /// Round-trip time of every driver call.
    pub latency: Duration,
}

impl Default for VirtualSettings {
    fn default() -> Self {
        Self {
            lag: Lag {
                warm_up: Duration::from_secs(15),
                cool_down: Duration::from_secs(20),
            },
            latency: Duration::from_millis(50),
        }
    }
}

/// One [`VirtualDriver`] per category.
pub struct VirtualFleet {
    drivers: BTreeMap<Category, Arc<VirtualDriver>>,
}

impl VirtualFleet {
    #[must_use]
    pub fn new(settings: VirtualSettings) -> Self {
        Self {
            drivers: Category::ALL
                .into_iter()
                .map(|c| {
                    let driver = VirtualDriver::new(c, settings.lag, settings.latency);
                    (c, Arc::new(driver))
                })
                .collect(),
        }
    }

    /// The driver serving `category`.
    #[must_use]
    pub fn driver(&self, category: Category) -> Option<Arc<VirtualDriver>> {
        self.drivers.get(&category).cloned()
    }

    /// A registry routing every category to its virtual driver.
    #[must_use]
    pub fn registry(&self) -> DriverRegistry {
        self.drivers
            .iter()
            .fold(DriverRegistry::new(), |registry, (category, driver)| {
                let driver: Arc<dyn Driver> = driver.clone();
                registry.with(*category, driver)
            })
    }
}
