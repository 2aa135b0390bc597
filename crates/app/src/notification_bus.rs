//! In-process notification bus for live device updates.
//!
//! Each observer owns a bounded [`mpsc`] queue. Publishing never waits: a full
//! queue drops that observer's copy of the message, a closed one is pruned.
//! A [`Subscription`] deregisters itself when dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use powerhub_domain::device::Device;
use powerhub_domain::error::PowerHubError;
use powerhub_domain::notification::Notification;

use crate::ports::{DevicePublisher, DeviceRepository};

/// Default per-observer queue length.
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

struct Observer {
    id: u64,
    sender: mpsc::Sender<Notification>,
}

/// Registry of live observers.
pub struct NotificationBus {
    observers: Mutex<Vec<Observer>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}

impl NotificationBus {
    /// Create a bus whose observers each buffer up to `buffer` messages.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            buffer: buffer.max(1),
        }
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Observer>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Register a new observer receiving every message broadcast from now on.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.observers().push(Observer { id, sender });
        tracing::debug!(observer = id, "observer connected");
        Subscription {
            id,
            receiver,
            bus: Arc::clone(self),
        }
    }

    /// Register an observer and read the snapshot it starts from.
    ///
    /// Registration happens first so that no write landing between the
    /// snapshot read and the registration is lost; such a write may be seen
    /// twice instead.
    ///
    /// # Errors
    ///
    /// Returns a storage error if reading the devices fails.
    pub async fn connect<R: DeviceRepository>(
        self: &Arc<Self>,
        repo: &R,
    ) -> Result<(Notification, Subscription), PowerHubError> {
        let subscription = self.subscribe();
        let devices = repo.get_all().await?;
        Ok((Notification::InitialState { devices }, subscription))
    }

    /// Deliver `notification` to every observer without waiting.
    pub fn broadcast(&self, notification: &Notification) {
        self.observers().retain(|observer| {
            match observer.sender.try_send(notification.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        observer = observer.id,
                        kind = notification.kind(),
                        "observer queue full, dropping message"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(observer = observer.id, "pruning closed observer");
                    false
                }
            }
        });
    }

    fn remove(&self, id: u64) {
        self.observers().retain(|observer| observer.id != id);
    }
}

impl DevicePublisher for NotificationBus {
    fn publish(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<(), PowerHubError>> + Send {
        self.broadcast(&Notification::DeviceUpdate { device });
        async { Ok(()) }
    }
}

/// A live observer's end of the bus.
///
/// Also a [`Stream`](tokio_stream::Stream) of notifications.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Notification>,
    bus: Arc<NotificationBus>,
}

impl Subscription {
    /// Wait for the next notification.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }
}

impl tokio_stream::Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.remove(self.id);
        tracing::debug!(observer = self.id, "observer disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryDeviceRepo;
    use powerhub_domain::device::PowerState;

    fn device(name: &str) -> Device {
        Device::builder()
            .name(name)
            .address("10.0.0.1")
            .build()
            .unwrap()
    }

    fn update_for(notification: Option<Notification>) -> Device {
        match notification {
            Some(Notification::DeviceUpdate { device }) => device,
            other => panic!("expected a device update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_deliver_update_to_every_observer() {
        let bus = Arc::new(NotificationBus::new(8));
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(device("plug")).await.unwrap();

        assert_eq!(update_for(a.recv().await).name, "plug");
        assert_eq!(update_for(b.recv().await).name, "plug");
    }

    #[tokio::test]
    async fn should_succeed_when_no_observers() {
        let bus = NotificationBus::new(8);
        assert!(bus.publish(device("plug")).await.is_ok());
    }

    #[tokio::test]
    async fn should_drop_message_instead_of_blocking_when_queue_full() {
        let bus = Arc::new(NotificationBus::new(1));
        let mut slow = bus.subscribe();

        bus.publish(device("first")).await.unwrap();
        bus.publish(device("second")).await.unwrap();

        assert_eq!(update_for(slow.recv().await).name, "first");
        assert!(slow.receiver.try_recv().is_err());
        assert_eq!(bus.observer_count(), 1);
    }

    #[tokio::test]
    async fn should_deregister_observer_when_subscription_dropped() {
        let bus = Arc::new(NotificationBus::new(8));
        let subscription = bus.subscribe();
        assert_eq!(bus.observer_count(), 1);
        drop(subscription);
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn should_prune_observer_whose_receiver_is_closed() {
        let bus = Arc::new(NotificationBus::new(8));
        let mut subscription = bus.subscribe();
        subscription.receiver.close();

        bus.publish(device("plug")).await.unwrap();

        // pruned by the send, then the drop finds nothing left to remove
        assert_eq!(bus.observer_count(), 0);
        drop(subscription);
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn should_send_snapshot_then_deltas_on_connect() {
        let repo = InMemoryDeviceRepo::with(vec![device("screen-1"), device("screen-2")]);
        let bus = Arc::new(NotificationBus::new(8));

        let (initial, mut subscription) = bus.connect(&repo).await.unwrap();
        let Notification::InitialState { devices } = initial else {
            panic!("expected initial state");
        };
        assert_eq!(devices.len(), 2);

        let mut changed = device("screen-1");
        changed.state = PowerState::On;
        bus.publish(changed).await.unwrap();
        assert_eq!(update_for(subscription.recv().await).state, PowerState::On);
    }
}
