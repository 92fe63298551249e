//! # meshlight-domain
//!
//! Pure domain model for the meshlight bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed mesh addresses and group ids, error conventions, timestamps
//! - Define the **roster** (devices and the derived group index) and broker **credentials**
//! - Decode vendor status payloads into colour readings (`color`)
//! - Encode control calls into fixed-format outbound commands (`command`)
//! - Define the JSON **wire messages** exchanged with the broker
//! - Define the platform-facing **light state** and the events emitted when it changes
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod address;
pub mod time;

pub mod color;
pub mod command;
pub mod credentials;
pub mod device;
pub mod event;
pub mod light;
pub mod message;
