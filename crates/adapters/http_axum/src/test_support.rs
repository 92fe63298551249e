//! Shared fixtures for handler tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use meshlight_app::connector::MeshConnector;
use meshlight_app::event_bus::InProcessEventBus;
use meshlight_app::outbound_queue::QueueConfig;
use meshlight_app::ports::{MeshTransport, TransportError};
use meshlight_app::services::light_service::{LightConfig, LightService};
use meshlight_domain::address::MeshAddress;
use meshlight_domain::device::{Device, Roster};
use meshlight_domain::message::ControlMessage;

use crate::state::AppState;

pub type TestState = AppState<RecordingTransport, Arc<InProcessEventBus>>;

#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<ControlMessage>>,
    requests: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn published(&self) -> Vec<ControlMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn outcome(&self) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TransportError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl MeshTransport for RecordingTransport {
    fn publish_control(
        &self,
        message: &ControlMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let outcome = self.outcome();
        if outcome.is_ok() {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.clone());
        }
        std::future::ready(outcome)
    }

    fn request_status(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.requests.fetch_add(1, Ordering::SeqCst);
        std::future::ready(self.outcome())
    }
}

fn device(address: u16, wiring_type: u32) -> Device {
    Device {
        unique_id: format!("uid-{address}"),
        mac_address: String::new(),
        display_name: format!("Bulb {address}"),
        mesh_address: MeshAddress::new(address).unwrap(),
        device_type: 65,
        control_type: 1,
        wiring_type,
        groups: Vec::new(),
    }
}

/// Two lights (10, 11) and one non-light device (20).
pub fn test_state() -> (TestState, Arc<RecordingTransport>) {
    let roster = Roster::new(vec![device(10, 1), device(11, 1), device(20, 0)]).unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let config = QueueConfig {
        debounce: Duration::from_millis(5),
        ..QueueConfig::default()
    };
    let connector = Arc::new(MeshConnector::new(roster, Arc::clone(&transport), config));
    let event_bus = Arc::new(InProcessEventBus::new(16));
    let light_service = Arc::new(LightService::new(
        connector,
        Arc::clone(&event_bus),
        LightConfig::default(),
    ));
    (AppState::new(light_service, event_bus), transport)
}

pub fn app(state: TestState) -> Router {
    crate::router::build(state)
}
