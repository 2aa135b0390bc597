//! Device — a remotely powered piece of hardware and its believed state.

mod category;
mod state;

pub use category::Category;
pub use state::{PowerAction, PowerState, PowerStatus, UnknownPowerState};

use serde::{Deserialize, Serialize};

use crate::error::{PowerHubError, ValidationError};
use crate::id::DeviceId;
use crate::time::{Timestamp, now};

/// Category-specific secrets needed by a driver.
///
/// Never serialized as part of a [`Device`] sent to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Hardware address, used by wake packets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

impl Credentials {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.mac.is_none()
    }
}

/// A device record with its current believed power state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Unique, used as the external command key.
    pub name: String,
    pub category: Category,
    /// Network address (IP or hostname) the driver talks to.
    pub address: String,
    #[serde(skip_serializing, default)]
    pub credentials: Option<Credentials>,
    pub state: PowerState,
    pub last_error: Option<String>,
    /// When `state` was last written.
    pub timestamp: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] when `name` or `address` is empty.
    pub fn validate(&self) -> Result<(), PowerHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.address.trim().is_empty() {
            return Err(ValidationError::EmptyAddress.into());
        }
        Ok(())
    }

    /// Whether a new state write would change anything observable.
    #[must_use]
    pub fn differs_from(&self, state: PowerState, last_error: Option<&str>) -> bool {
        self.state != state || self.last_error.as_deref() != last_error
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    category: Option<Category>,
    address: Option<String>,
    credentials: Option<Credentials>,
    state: Option<PowerState>,
    last_error: Option<String>,
    timestamp: Option<Timestamp>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn state(mut self, state: PowerState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn last_error(mut self, last_error: impl Into<String>) -> Self {
        self.last_error = Some(last_error.into());
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// Category defaults to [`Category::Light`], state to
    /// [`PowerState::Unknown`] and the timestamp to now.
    ///
    /// # Errors
    ///
    /// Returns [`PowerHubError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<Device, PowerHubError> {
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            category: self.category.unwrap_or(Category::Light),
            address: self.address.unwrap_or_default(),
            credentials: self.credentials.filter(|c| !c.is_empty()),
            state: self.state.unwrap_or_default(),
            last_error: self.last_error,
            timestamp: self.timestamp.unwrap_or_else(now),
        };
        device.validate()?;
        Ok(device)
    }
}
