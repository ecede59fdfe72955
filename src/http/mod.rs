//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → routing layer resolves the route
//!     → security layer applies the key gate
//!     → forward.rs (send upstream, relay response)
//!     → response.rs (map failures to status codes)
//!     → Send to client
//! ```

pub mod forward;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use forward::Dispatcher;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ApiError, GatewayError};
pub use server::{AppState, HttpServer, StartupError};
