//! Per-device outcome of one schedule run.

use serde::{Deserialize, Serialize};

use crate::device::Category;
use crate::id::DeviceId;
use crate::time::Timestamp;

use super::ScheduleTarget;

/// What happened to one target device when a schedule fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub device_id: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    pub category: Category,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: Timestamp,
}

impl ExecutionResult {
    #[must_use]
    pub fn succeeded(target: ScheduleTarget, device_name: impl Into<String>, at: Timestamp) -> Self {
        Self {
            device_id: target.device_id,
            device_name: Some(device_name.into()),
            category: target.category,
            success: true,
            error: None,
            executed_at: at,
        }
    }

    /// A failed run; `device_name` is absent when the device could not be
    /// resolved.
    #[must_use]
    pub fn failed(
        target: ScheduleTarget,
        device_name: Option<String>,
        error: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            device_id: target.device_id,
            device_name,
            category: target.category,
            success: false,
            error: Some(error.into()),
            executed_at: at,
        }
    }
}
