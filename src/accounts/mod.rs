//! Accounts service: the credential store and the HTTP surface that issues
//! tokens and guards profile updates.
//!
//! # Data Flow
//! ```text
//! POST /api/customers/login
//!     → store.rs (check credentials, record login)
//!     → auth::token (issue)
//!
//! POST /api/customers/{id}
//!     → auth::guard (bearer token owns the payload subject)
//!     → store.rs (apply update)
//! ```

pub mod handlers;
pub mod store;

pub use handlers::{AccountsServer, AccountsState};
pub use store::{Account, AccountPayload, CustomerStore, InMemoryCustomerStore, StoreError};
