//! Token authentication subsystem.
//!
//! # Data Flow
//! ```text
//! login / register
//!     → token.rs (issue signed token)
//!     → caller keeps the token
//!
//! protected update
//!     → guard.rs (strip "Bearer ", parse, validate, compare subject)
//!     → Authorized | AuthError (401 / 403)
//! ```
//!
//! # Design Decisions
//! - Stateless: no session table, no revocation list
//! - Fail closed: any decode error is an invalid token
//! - Time is injected through `Clock` so expiry is testable

pub mod clock;
pub mod guard;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{authorization_header, AuthError, Authorized, OwnershipMode, ResourceOwnerGuard};
pub use token::{KeySource, TokenClaims, TokenError, TokenService};
