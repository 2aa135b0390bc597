//! The single path through which device state is written.
//!
//! The command executor goes through [`StateWriter::write`], the reconciler
//! through [`StateWriter::write_if_unchanged`]. Both persist only when
//! something observable changed and broadcast every persisted change exactly
//! once.

use powerhub_domain::device::{Device, PowerState};
use powerhub_domain::error::PowerHubError;
use powerhub_domain::time::now;

use crate::ports::{DevicePublisher, DeviceRepository};

/// Persist-then-broadcast helper over the device store and the publisher.
pub struct StateWriter<R, P> {
    repo: R,
    publisher: P,
}

impl<R, P> StateWriter<R, P>
where
    R: DeviceRepository + Send + Sync,
    P: DevicePublisher + Send + Sync,
{
    pub fn new(repo: R, publisher: P) -> Self {
        Self { repo, publisher }
    }

    /// The underlying device store, for reads.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Write `state` / `last_error` over `current` with a fresh timestamp.
    ///
    /// Returns `Ok(None)` without touching storage when `current` already
    /// holds the same values, or when the device disappeared meanwhile.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails. A publish failure is
    /// logged, never returned: the write already happened.
    pub async fn write(
        &self,
        current: &Device,
        state: PowerState,
        last_error: Option<String>,
    ) -> Result<Option<Device>, PowerHubError> {
        if !current.differs_from(state, last_error.as_deref()) {
            return Ok(None);
        }
        let Some(updated) = self
            .repo
            .update_state(current.id, state, last_error, now())
            .await?
        else {
            tracing::warn!(device = %current.name, "device vanished before state write");
            return Ok(None);
        };
        self.announce(current, &updated).await;
        Ok(Some(updated))
    }

    /// Like [`write`](Self::write), but only commits while the stored record
    /// still carries `current`'s state and timestamp.
    ///
    /// Returns `Ok(None)` when another writer got there first; nothing is
    /// persisted or broadcast in that case.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn write_if_unchanged(
        &self,
        current: &Device,
        state: PowerState,
        last_error: Option<String>,
    ) -> Result<Option<Device>, PowerHubError> {
        if !current.differs_from(state, last_error.as_deref()) {
            return Ok(None);
        }
        let Some(updated) = self
            .repo
            .update_state_if(current, state, last_error, now())
            .await?
        else {
            tracing::debug!(device = %current.name, "record changed since read, write dropped");
            return Ok(None);
        };
        self.announce(current, &updated).await;
        Ok(Some(updated))
    }

    async fn announce(&self, previous: &Device, updated: &Device) {
        tracing::info!(
            device = %updated.name,
            category = %updated.category,
            from = %previous.state,
            to = %updated.state,
            "device state changed"
        );
        if let Err(err) = self.publisher.publish(updated.clone()).await {
            tracing::warn!(device = %updated.name, error = %err, "failed to broadcast state change");
        }
    }
}
