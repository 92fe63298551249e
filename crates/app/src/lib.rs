//! # meshlight-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `MeshTransport` — publish control messages and status requests to the broker
//!   - `CloudSession` — log in and fetch the device roster and broker credentials
//!   - `EventPublisher` — broadcast light state changes
//! - Own the command pipeline between a control call and the wire:
//!   - `OutboundQueue` — debounce, coalesce and flush commands in serialized batches
//!   - `grouping` — rewrite per-device commands into group broadcasts
//!   - `AckTracker` and `RetryMonitor` — confirm delivery by status echo, republish once
//!   - `ListenerRegistry` — fan inbound status readings out to listeners
//! - Define **driving/inbound ports** as use-case structs:
//!   - `MeshConnector` — the single owner of queue, listeners and acknowledgements
//!   - `LightService` — platform-facing light state and control
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `meshlight-domain` only (plus `tokio` for sync and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ack_tracker;
pub mod connector;
pub mod error;
pub mod event_bus;
pub mod fanout;
pub mod grouping;
pub mod outbound_queue;
pub mod ports;
pub mod retry;
pub mod services;
pub mod setup;
