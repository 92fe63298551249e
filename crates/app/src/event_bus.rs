//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use meshlight_domain::error::MeshError;
use meshlight_domain::event::LightEvent;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<LightEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LightEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: LightEvent) -> impl Future<Output = Result<(), MeshError>> + Send {
        // Sending only fails without receivers.
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlight_domain::address::MeshAddress;
    use meshlight_domain::device::Device;
    use meshlight_domain::event::EventOrigin;
    use meshlight_domain::light::LightState;

    fn event(address: u16) -> LightEvent {
        let device = Device {
            unique_id: format!("uid-{address}"),
            mac_address: String::new(),
            display_name: format!("Bulb {address}"),
            mesh_address: MeshAddress::new(address).unwrap(),
            device_type: 65,
            control_type: 1,
            wiring_type: 1,
            groups: Vec::new(),
        };
        LightEvent::new(EventOrigin::Device, LightState::from_device(&device))
    }

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(event(10)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.address.get(), 10);
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(event(11)).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().address.get(), 11);
        assert_eq!(rx2.recv().await.unwrap().address.get(), 11);
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        assert!(bus.publish(event(12)).await.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(event(10)).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(event(13)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().address.get(), 13);
    }
}
