//! Mesh connector — the single owner of everything between control calls
//! and the broker.
//!
//! One connector is built per session from the roster. It owns the outbound
//! queue, the listener registry and the acknowledgement tracker, and is
//! shared by reference (usually behind an `Arc`) with its dependents.

use std::sync::Arc;
use std::time::Duration;

use meshlight_domain::address::{Destination, MeshAddress};
use meshlight_domain::color::{ColorReading, decode_status};
use meshlight_domain::command::{self, OutboundCommand};
use meshlight_domain::device::Roster;
use meshlight_domain::error::{MeshError, NotFoundError, ValidationError};
use meshlight_domain::message::parse_status_message;
use tokio::time::Instant;

use crate::ack_tracker::AckTracker;
use crate::fanout::{ListenerId, ListenerRegistry, StatusListener};
use crate::outbound_queue::{OutboundQueue, QueueConfig};
use crate::ports::transport::bounded;
use crate::ports::{MeshTransport, StatusFeed};
use crate::retry::RetryReport;

pub struct MeshConnector<T> {
    roster: Roster,
    transport: Arc<T>,
    queue: OutboundQueue<T>,
    listeners: ListenerRegistry,
    acks: Arc<AckTracker>,
    request_timeout: Duration,
}

impl<T: MeshTransport> MeshConnector<T> {
    #[must_use]
    pub fn new(roster: Roster, transport: Arc<T>, config: QueueConfig) -> Self {
        let acks = Arc::new(AckTracker::new(roster.groups().clone()));
        let queue = OutboundQueue::new(
            Arc::clone(&transport),
            roster.groups().clone(),
            Arc::clone(&acks),
            config,
        );
        Self {
            roster,
            transport,
            queue,
            listeners: ListenerRegistry::new(),
            acks,
            request_timeout: config.publish_timeout,
        }
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Queue an already encoded command.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NotFound`] for a destination outside the roster
    /// and [`MeshError::Transport`] when the batch failed to publish.
    pub async fn send(&self, command: OutboundCommand) -> Result<(), MeshError> {
        self.ensure_known(command.destination)?;
        self.queue.submit(command).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn turn_on(&self, destination: impl Into<Destination>) -> Result<(), MeshError> {
        self.send(command::turn_on(destination)).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn turn_off(&self, destination: impl Into<Destination>) -> Result<(), MeshError> {
        self.send(command::turn_off(destination)).await
    }

    /// Set an RGB colour; channels above the power limit are lowered.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Validation`] for a channel outside `0..=255`,
    /// in which case nothing is queued. Otherwise see [`send`](Self::send).
    pub async fn set_color(
        &self,
        destination: impl Into<Destination>,
        red: i32,
        green: i32,
        blue: i32,
    ) -> Result<(), MeshError> {
        let destination = destination.into();
        let command =
            command::set_color(destination, red, green, blue).map_err(|err| rejected(destination, err))?;
        self.send(command).await
    }

    /// Set a white colour temperature at a `0..=255` brightness.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Validation`] for a temperature outside the
    /// supported range, in which case nothing is queued. Otherwise see
    /// [`send`](Self::send).
    pub async fn set_color_temp(
        &self,
        destination: impl Into<Destination>,
        kelvin: Option<u32>,
        brightness: u8,
    ) -> Result<(), MeshError> {
        let destination = destination.into();
        let command = command::set_color_temp(destination, kelvin, brightness)
            .map_err(|err| rejected(destination, err))?;
        self.send(command).await
    }

    /// Register a listener for every decoded status reading.
    pub fn subscribe(&self, listener: impl StatusListener + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// When `address` last reported its status.
    #[must_use]
    pub fn last_seen(&self, address: MeshAddress) -> Option<Instant> {
        self.acks.last_seen(address)
    }

    /// Decode one status-topic message and fan its entries out.
    ///
    /// Never fails. A message that is not a JSON array is dropped. A
    /// malformed entry or an entry for an unknown address is skipped
    /// without affecting its neighbours. An undecodable payload is
    /// delivered as an unavailable reading.
    pub fn handle_status_payload(&self, payload: &[u8]) {
        let entries = match parse_status_message(payload) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed status message");
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping malformed status entry");
                    continue;
                }
            };
            let Some(address) = MeshAddress::new(entry.address)
                .ok()
                .filter(|address| self.roster.get(*address).is_some())
            else {
                tracing::debug!(address = entry.address, "status for unknown address");
                continue;
            };

            let reading = decode_status(&entry.data).unwrap_or_else(|err| {
                tracing::warn!(%address, data = %entry.data, error = %err, "undecodable status");
                ColorReading::unavailable()
            });
            tracing::debug!(%address, data = %entry.data, "status received");

            self.listeners.dispatch(address, &reading);
            self.acks.observe(address);
        }
    }

    /// Drain a status feed until its sender side closes.
    pub async fn run_status_feed(&self, mut feed: StatusFeed) {
        while let Some(payload) = feed.recv().await {
            self.handle_status_payload(&payload);
        }
        tracing::info!("status feed closed");
    }

    /// Ask the bridge to push the current status of every device.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Transport`] when the request could not be
    /// published in time.
    pub async fn request_status(&self) -> Result<(), MeshError> {
        bounded(self.request_timeout, self.transport.request_status()).await?;
        tracing::info!("requested status of every device");
        Ok(())
    }

    /// Wait for outstanding retry checks.
    pub async fn shutdown(&self) -> RetryReport {
        let report = self.queue.shutdown().await;
        tracing::info!(
            checked = report.checked,
            republished = report.republished,
            "mesh connector stopped"
        );
        report
    }

    fn ensure_known(&self, destination: Destination) -> Result<(), NotFoundError> {
        let known = match destination {
            Destination::Device(address) => self.roster.get(address).is_some(),
            Destination::Group(group) => self.roster.groups().members(group).is_some(),
        };
        if known {
            return Ok(());
        }
        Err(NotFoundError {
            entity: match destination {
                Destination::Device(_) => "Light",
                Destination::Group(_) => "Group",
            },
            id: destination.wire_address().to_string(),
        })
    }
}

fn rejected(destination: Destination, err: ValidationError) -> MeshError {
    tracing::warn!(%destination, error = %err, "rejected control call");
    err.into()
}
