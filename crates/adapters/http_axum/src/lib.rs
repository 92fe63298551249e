//! # meshlight-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **REST-ish JSON API** for the lights of the roster
//!   (`/api/lights`, `/api/lights/{address}/turn_on`, …)
//! - Stream light state changes as **Server-Sent Events**
//!   (`/api/events/stream`)
//! - Map HTTP requests into light service calls (driving adapter) and
//!   service results into JSON responses
//!
//! ## Dependency rule
//! Depends on `meshlight-app` (for port traits and services) and
//! `meshlight-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod test_support;
