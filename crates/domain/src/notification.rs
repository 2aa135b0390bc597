//! Payloads pushed to live observers.

use serde::Serialize;

use crate::device::Device;

/// A message on the live update channel.
///
/// Serialized with a `type` tag: `{"type":"INITIAL_STATE","devices":[..]}`
/// and `{"type":"DEVICE_UPDATE","device":{..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// Full snapshot, sent once when an observer connects.
    InitialState { devices: Vec<Device> },
    /// A single device whose state was just written.
    DeviceUpdate { device: Device },
}

impl Notification {
    /// Name of the variant, used as the SSE event name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialState { .. } => "INITIAL_STATE",
            Self::DeviceUpdate { .. } => "DEVICE_UPDATE",
        }
    }
}
