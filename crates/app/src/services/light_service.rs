//! Light service — platform-facing state and control of every roster light.
//!
//! State is optimistic: a control call updates the light as soon as its
//! command is published. Status readings reconcile it afterwards, except
//! within the echo window that follows our own command, where the reading
//! is most likely the echo of what we just sent.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use meshlight_domain::address::MeshAddress;
use meshlight_domain::color::ColorReading;
use meshlight_domain::command::{
    DEFAULT_KELVIN, OutboundCommand, set_color, set_color_temp, turn_off, turn_on,
};
use meshlight_domain::error::{MeshError, NotFoundError, ValidationError};
use meshlight_domain::event::{EventOrigin, LightEvent};
use meshlight_domain::light::{
    ColorMode, LightState, TurnOn, base_colors, normalize_colors, scale_brightness,
};
use meshlight_domain::time::now;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::connector::MeshConnector;
use crate::ports::{EventPublisher, MeshTransport};

/// Tunables of the reconciliation between commands and readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    /// Readings arriving this soon after our own command are ignored.
    pub echo_window: Duration,
    /// HS readings closer than this (RGB distance) to the current colour
    /// keep the current colour.
    pub echo_distance: f64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            echo_window: Duration::from_secs(2),
            echo_distance: 50.0,
        }
    }
}

struct LightSlot {
    state: LightState,
    last_command: Option<Instant>,
}

pub struct LightService<T, P> {
    connector: Arc<MeshConnector<T>>,
    publisher: P,
    config: LightConfig,
    lights: Mutex<BTreeMap<MeshAddress, LightSlot>>,
}

impl<T, P> LightService<T, P>
where
    T: MeshTransport,
    P: EventPublisher + Send + Sync + 'static,
{
    /// One light per roster device with a non-zero wiring type.
    #[must_use]
    pub fn new(connector: Arc<MeshConnector<T>>, publisher: P, config: LightConfig) -> Self {
        let lights = connector
            .roster()
            .lights()
            .map(|device| {
                let slot = LightSlot {
                    state: LightState::from_device(device),
                    last_command: None,
                };
                (device.mesh_address, slot)
            })
            .collect();
        Self {
            connector,
            publisher,
            config,
            lights: Mutex::new(lights),
        }
    }

    fn lights(&self) -> MutexGuard<'_, BTreeMap<MeshAddress, LightSlot>> {
        self.lights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the connector's status readings and apply them on a
    /// background task.
    pub fn attach(self: &Arc<Self>) -> JoinHandle<()> {
        let (sender, mut readings) = mpsc::unbounded_channel();
        self.connector
            .subscribe(move |address: MeshAddress, reading: &ColorReading| {
                // The receiver only goes away with the service itself.
                let _ = sender.send((address, *reading));
            });

        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some((address, reading)) = readings.recv().await {
                if let Err(err) = service.apply_reading(address, &reading).await {
                    tracing::warn!(%address, error = %err, "failed to publish light event");
                }
            }
        })
    }

    /// All lights, in address order.
    #[must_use]
    pub fn list(&self) -> Vec<LightState> {
        self.lights()
            .values()
            .map(|slot| slot.state.clone())
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`MeshError::NotFound`] for an address that is not a light.
    pub fn get(&self, address: MeshAddress) -> Result<LightState, MeshError> {
        self.lights()
            .get(&address)
            .map(|slot| slot.state.clone())
            .ok_or_else(|| not_found(address))
    }

    /// Turn a light on, optionally changing its colour, brightness or
    /// colour temperature.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NotFound`] for an unknown light,
    /// [`MeshError::Validation`] for an unsupported colour temperature, and
    /// [`MeshError::Transport`] when the command could not be published.
    pub async fn turn_on(
        &self,
        address: MeshAddress,
        request: TurnOn,
    ) -> Result<LightState, MeshError> {
        let current = self.get(address)?;
        let (command, next) = plan_turn_on(&current, request)?;
        tracing::info!(%address, ?request, "turn on");
        self.execute(command, next).await
    }

    /// # Errors
    ///
    /// Returns [`MeshError::NotFound`] for an unknown light and
    /// [`MeshError::Transport`] when the command could not be published.
    pub async fn turn_off(&self, address: MeshAddress) -> Result<LightState, MeshError> {
        let mut next = self.get(address)?;
        next.is_on = false;
        tracing::info!(%address, "turn off");
        self.execute(turn_off(address), next).await
    }

    /// Ask the bridge to push the status of every light.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Transport`] when the request failed.
    pub async fn refresh(&self) -> Result<(), MeshError> {
        self.connector.request_status().await
    }

    /// Reconcile one light with a status reading.
    ///
    /// Returns `true` when the light changed and an event was published.
    ///
    /// # Errors
    ///
    /// Returns the publisher's error.
    pub async fn apply_reading(
        &self,
        address: MeshAddress,
        reading: &ColorReading,
    ) -> Result<bool, MeshError> {
        let event = {
            let mut lights = self.lights();
            let Some(slot) = lights.get_mut(&address) else {
                return Ok(false);
            };
            let within_echo = slot
                .last_command
                .is_some_and(|at| at.elapsed() < self.config.echo_window);
            if within_echo {
                tracing::debug!(%address, "skipping reading, too soon after our command");
                return Ok(false);
            }
            if !slot.state.apply_reading(reading, self.config.echo_distance) {
                return Ok(false);
            }
            LightEvent::new(EventOrigin::Device, slot.state.clone())
        };

        tracing::info!(%address, is_on = event.state.is_on, "light updated from mesh");
        self.publisher.publish(event).await?;
        Ok(true)
    }

    async fn execute(
        &self,
        command: OutboundCommand,
        mut next: LightState,
    ) -> Result<LightState, MeshError> {
        let address = next.address;
        let previous = self
            .lights()
            .get_mut(&address)
            .and_then(|slot| slot.last_command.replace(Instant::now()));
        if let Err(err) = self.connector.send(command).await {
            if let Some(slot) = self.lights().get_mut(&address) {
                slot.last_command = previous;
            }
            return Err(err);
        }

        next.last_changed = now();
        if let Some(slot) = self.lights().get_mut(&address) {
            slot.state = next.clone();
            slot.last_command = Some(Instant::now());
        }
        self.publisher
            .publish(LightEvent::new(EventOrigin::Command, next.clone()))
            .await?;
        Ok(next)
    }
}

fn not_found(address: MeshAddress) -> MeshError {
    NotFoundError {
        entity: "Light",
        id: address.to_string(),
    }
    .into()
}

/// Pick the command for a "turn on" request and the state it leads to.
///
/// Precedence: RGB colour, then brightness, then colour temperature, then
/// a plain power-on.
fn plan_turn_on(
    current: &LightState,
    request: TurnOn,
) -> Result<(OutboundCommand, LightState), ValidationError> {
    let address = current.address;
    let mut next = current.clone();
    next.is_on = true;

    let command = if let Some(rgb) = request.rgb {
        let normalized = normalize_colors(rgb, current.brightness);
        next.color_mode = ColorMode::Rgb;
        next.rgb = normalized;
        set_color(
            address,
            i32::from(normalized.red),
            i32::from(normalized.green),
            i32::from(normalized.blue),
        )?
    } else if let Some(brightness) = request.brightness {
        next.brightness = brightness;
        match current.color_mode {
            ColorMode::Rgb => {
                let scaled = scale_brightness(base_colors(current.rgb), brightness);
                next.rgb = scaled;
                set_color(
                    address,
                    i32::from(scaled.red),
                    i32::from(scaled.green),
                    i32::from(scaled.blue),
                )?
            }
            ColorMode::ColorTemp => set_color_temp(address, current.color_temp_kelvin, brightness)?,
        }
    } else if let Some(kelvin) = request.color_temp_kelvin {
        let kelvin = Some(kelvin).filter(|k| *k != 0).unwrap_or(DEFAULT_KELVIN);
        next.color_mode = ColorMode::ColorTemp;
        next.color_temp_kelvin = Some(kelvin);
        set_color_temp(address, Some(kelvin), current.brightness)?
    } else {
        turn_on(address)
    };

    Ok((command, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use meshlight_domain::color::{Rgb, decode_status};
    use meshlight_domain::device::{Device, Roster};

    use crate::event_bus::InProcessEventBus;
    use crate::outbound_queue::QueueConfig;
    use crate::outbound_queue::tests::StubTransport;

    type Service = LightService<StubTransport, Arc<InProcessEventBus>>;

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

    fn addr(value: u16) -> MeshAddress {
        MeshAddress::new(value).unwrap()
    }

    fn service() -> (Arc<StubTransport>, Arc<InProcessEventBus>, Arc<Service>) {
        let roster = Roster::new(vec![device(10, 1), device(11, 1), device(20, 0)]).unwrap();
        let transport = Arc::new(StubTransport::default());
        let connector = Arc::new(MeshConnector::new(
            roster,
            Arc::clone(&transport),
            QueueConfig::default(),
        ));
        let bus = Arc::new(InProcessEventBus::new(16));
        let service = Arc::new(LightService::new(
            connector,
            Arc::clone(&bus),
            LightConfig::default(),
        ));
        (transport, bus, service)
    }

    #[test]
    fn should_expose_only_wired_devices() {
        let (_, _, service) = service();
        let addresses: Vec<u16> = service.list().iter().map(|s| s.address.get()).collect();
        assert_eq!(addresses, vec![10, 11]);
        assert!(matches!(service.get(addr(20)), Err(MeshError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_send_normalized_rgb() {
        let (transport, bus, service) = service();
        let mut events = bus.subscribe();
        let request = TurnOn {
            rgb: Some(Rgb::new(0, 255, 0)),
            ..TurnOn::default()
        };

        let state = service.turn_on(addr(10), request).await.unwrap();
        assert!(state.is_on);
        assert_eq!(state.rgb, Rgb::new(0, 255, 0));
        assert_eq!(transport.published()[0].data, "056000FF0000000200");

        let event = events.recv().await.unwrap();
        assert_eq!(event.origin, EventOrigin::Command);
        assert_eq!(event.address, addr(10));
    }

    #[tokio::test(start_paused = true)]
    async fn should_rescale_base_color_on_brightness_change() {
        let (transport, _, service) = service();
        let request = TurnOn {
            brightness: Some(128),
            ..TurnOn::default()
        };

        let state = service.turn_on(addr(10), request).await.unwrap();
        assert_eq!(state.brightness, 128);
        assert_eq!(state.rgb, Rgb::new(128, 0, 0));
        assert_eq!(transport.published()[0].data, "056080000000000200");
    }

    #[tokio::test(start_paused = true)]
    async fn should_switch_to_color_temperature() {
        let (transport, _, service) = service();
        let request = TurnOn {
            color_temp_kelvin: Some(4000),
            ..TurnOn::default()
        };

        let state = service.turn_on(addr(11), request).await.unwrap();
        assert_eq!(state.color_mode, ColorMode::ColorTemp);
        assert_eq!(state.color_temp_kelvin, Some(4000));
        assert!(transport.published()[0].data.starts_with("0562"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_send_plain_power_on() {
        let (transport, _, service) = service();
        service.turn_on(addr(10), TurnOn::default()).await.unwrap();
        assert_eq!(transport.published()[0].data, turn_on(addr(10)).payload);
    }

    #[tokio::test(start_paused = true)]
    async fn should_turn_off() {
        let (transport, _, service) = service();
        service.turn_on(addr(10), TurnOn::default()).await.unwrap();
        let state = service.turn_off(addr(10)).await.unwrap();
        assert!(!state.is_on);
        assert_eq!(transport.published()[1].data, turn_off(addr(10)).payload);
    }

    #[tokio::test]
    async fn should_reject_unsupported_temperature() {
        let (transport, _, service) = service();
        let request = TurnOn {
            color_temp_kelvin: Some(9000),
            ..TurnOn::default()
        };
        let err = service.turn_on(addr(10), request).await.unwrap_err();
        assert!(matches!(err, MeshError::Validation(_)));
        assert!(transport.published().is_empty());
        assert!(!service.get(addr(10)).unwrap().is_on);
    }

    #[tokio::test(start_paused = true)]
    async fn should_ignore_reading_inside_echo_window() {
        let (_, _, service) = service();
        service.turn_off(addr(10)).await.unwrap();
        let green = decode_status("01323F55").unwrap();

        assert!(!service.apply_reading(addr(10), &green).await.unwrap());
        assert!(!service.get(addr(10)).unwrap().is_on);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(service.apply_reading(addr(10), &green).await.unwrap());
        assert!(service.get(addr(10)).unwrap().is_on);
    }

    #[tokio::test(start_paused = true)]
    async fn should_accept_reading_after_failed_command() {
        let (transport, _, service) = service();
        transport.fail.store(true, Ordering::SeqCst);
        assert!(service.turn_off(addr(10)).await.is_err());

        let green = decode_status("01323F55").unwrap();
        assert!(service.apply_reading(addr(10), &green).await.unwrap());
        assert!(service.get(addr(10)).unwrap().is_on);
    }

    #[tokio::test]
    async fn should_only_mark_never_reported_light_unavailable() {
        let (_, bus, service) = service();
        let mut events = bus.subscribe();
        let silent = decode_status("00000000").unwrap();

        assert!(!service.apply_reading(addr(10), &silent).await.unwrap());
        assert!(!service.get(addr(10)).unwrap().available);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_apply_readings_from_connector() {
        let (_, bus, service) = service();
        let mut events = bus.subscribe();
        let _worker = service.attach();

        service
            .connector
            .handle_status_payload(br#"[{"a":11,"d":"01644000"}]"#);

        let event = events.recv().await.unwrap();
        assert_eq!(event.origin, EventOrigin::Device);
        assert_eq!(event.address, addr(11));
        assert_eq!(event.state.color_mode, ColorMode::ColorTemp);
    }
}
