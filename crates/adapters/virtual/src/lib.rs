//! # meshlight-adapter-virtual
//!
//! Virtual/demo integration: a simulated mesh bridge for testing and
//! demonstration without a vendor account.
//!
//! ## Provided pieces
//!
//! | Piece | Port | Behaviour |
//! |-------|------|-----------|
//! | [`VirtualSession`] | `CloudSession` | Fixed demo roster of four lights in two groups |
//! | [`VirtualMesh`] | `MeshTransport` | Applies control messages to simulated bulbs and echoes their status |
//!
//! ## Dependency rule
//!
//! Depends on `meshlight-app` (port traits) and `meshlight-domain` only.

mod bulb;
mod mesh;
mod session;

pub use bulb::VirtualBulb;
pub use mesh::VirtualMesh;
pub use session::{DOWNSTAIRS_GROUP, LIVING_ROOM_GROUP, VirtualSession};
