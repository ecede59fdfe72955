//! Edge gateway library: route table and dispatcher, API key gate,
//! token service and the accounts service that uses it.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use accounts::AccountsServer;
pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
