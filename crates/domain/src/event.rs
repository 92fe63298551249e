//! Event — an immutable record of a light state change.
//!
//! Events are produced when a user command updates a light optimistically
//! and when a status notification from the mesh changes what we know.

use serde::{Deserialize, Serialize};

use crate::address::MeshAddress;
use crate::light::LightState;
use crate::time::{Timestamp, now};

/// What caused the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// A control call issued through this process.
    Command,
    /// A status notification received from the mesh.
    Device,
}

/// A light changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightEvent {
    pub address: MeshAddress,
    pub origin: EventOrigin,
    pub state: LightState,
    pub timestamp: Timestamp,
}

impl LightEvent {
    /// Record `state` as the new state of its light.
    #[must_use]
    pub fn new(origin: EventOrigin, state: LightState) -> Self {
        Self {
            address: state.address,
            origin,
            state,
            timestamp: now(),
        }
    }
}
