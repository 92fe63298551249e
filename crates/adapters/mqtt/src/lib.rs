//! # meshlight-adapter-mqtt
//!
//! MQTT adapter — connects to the vendor's mesh broker.
//!
//! ## Responsibilities
//! - Resolve the regional broker from the account's country code
//! - Log in with the software channel's identity
//! - Publish control messages and status requests (`MeshTransport`)
//! - Keep the hardware channel's status topic subscribed across reconnects
//!   and forward every status payload into a `StatusFeed`
//!
//! ## Dependency rule
//! Same as other adapters: depends on `meshlight-app` and `meshlight-domain`.

pub mod config;
pub mod error;
pub mod region;
pub mod topics;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use transport::{MqttConnection, MqttTransport, connect};
