//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after route lookup):
//!     → api_key.rs (shared-secret gate for mutations)
//!     → headers.rs (strip hop-by-hop headers)
//!     → Pass to dispatcher
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any gate failure
//! - Gate rejections never reach a backend

pub mod api_key;
pub mod headers;

pub use api_key::{ApiKeyGate, GateDecision};
