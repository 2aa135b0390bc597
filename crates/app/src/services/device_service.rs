//! Device service — read access to the device store and startup registration.
//!
//! Device records are owned by an external registry; this service only lists
//! them, resolves them by name and seeds them from configuration.

use powerhub_domain::device::Device;
use powerhub_domain::error::{NotFoundError, PowerHubError};

use crate::ports::DeviceRepository;

/// Application service for device lookups.
pub struct DeviceService<R> {
    repo: R,
}

impl<R: DeviceRepository> DeviceService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// The underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// List all devices.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_devices(&self) -> Result<Vec<Device>, PowerHubError> {
        self.repo.get_all().await
    }

    /// Look up a device by its unique name.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::NotFound`] when no device has that name, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_device(&self, name: &str) -> Result<Device, PowerHubError> {
        self.repo.find_by_name(name).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: name.to_string(),
            }
            .into()
        })
    }

    /// Create a device or refresh the descriptive fields of the one with the
    /// same name, keeping its id and believed state.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, device), fields(device = %device.name))]
    pub async fn register_device(&self, device: Device) -> Result<Device, PowerHubError> {
        device.validate()?;
        self.repo.upsert_by_name(device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDeviceRepo, device};
    use powerhub_domain::device::{Category, PowerState};
    use powerhub_domain::error::ValidationError;

    #[tokio::test]
    async fn should_return_device_when_name_exists() {
        let screen = device("lobby", Category::Display, PowerState::On);
        let service = DeviceService::new(InMemoryDeviceRepo::with(vec![screen.clone()]));

        let found = service.get_device("lobby").await.unwrap();

        assert_eq!(found.id, screen.id);
    }

    #[tokio::test]
    async fn should_return_not_found_when_name_unknown() {
        let service = DeviceService::new(InMemoryDeviceRepo::default());

        let result = service.get_device("nope").await;

        assert!(matches!(result, Err(PowerHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_preserve_id_and_state_when_registering_existing_name() {
        let stored = device("lobby", Category::Display, PowerState::On);
        let service = DeviceService::new(InMemoryDeviceRepo::with(vec![stored.clone()]));
        let seed = Device::builder()
            .name("lobby")
            .category(Category::Display)
            .address("192.168.1.99")
            .build()
            .unwrap();

        let saved = service.register_device(seed).await.unwrap();

        assert_eq!(saved.id, stored.id);
        assert_eq!(saved.state, PowerState::On);
        assert_eq!(saved.address, "192.168.1.99");
        assert_eq!(service.list_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_invalid_device_on_register() {
        let service = DeviceService::new(InMemoryDeviceRepo::default());
        let mut invalid = device("lobby", Category::Display, PowerState::Off);
        invalid.address = String::new();

        let result = service.register_device(invalid).await;

        assert!(matches!(
            result,
            Err(PowerHubError::Validation(ValidationError::EmptyAddress))
        ));
    }
}
