//! Publisher port — fan device state writes out to live observers.

use std::future::Future;

use powerhub_domain::device::Device;
use powerhub_domain::error::PowerHubError;

/// Broadcasts a freshly written device record.
///
/// Implementations must not block on slow observers.
pub trait DevicePublisher {
    fn publish(&self, device: Device) -> impl Future<Output = Result<(), PowerHubError>> + Send;
}

impl<T: DevicePublisher + Send + Sync> DevicePublisher for std::sync::Arc<T> {
    fn publish(&self, device: Device) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        (**self).publish(device)
    }
}
