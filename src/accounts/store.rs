//! Account storage behind the accounts service.
//!
//! # Responsibilities
//! - Credential check for login
//! - Account registration with unique usernames
//! - Lookup, listing and profile updates
//!
//! # Design Decisions
//! - `CustomerStore` is the seam; persistence engines live behind it
//! - The in-memory store keeps a username index for atomic uniqueness
//! - Passwords are never serialized

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Account fields as sent by clients on registration and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl AccountPayload {
    pub fn credentials(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("account {0} not found")]
    NotFound(u64),

    #[error("{0} must not be blank")]
    MissingField(&'static str),
}

/// Storage used by the accounts service.
pub trait CustomerStore: Send + Sync {
    /// Account matching both username and password.
    fn authenticate(&self, username: &str, password: &str) -> Option<Account>;

    fn record_login(&self, id: u64, at: DateTime<Utc>);

    fn find_by_id(&self, id: u64) -> Option<Account>;

    fn find_by_username(&self, username: &str) -> Option<Account>;

    fn list(&self) -> Vec<Account>;

    fn register(&self, payload: AccountPayload) -> Result<Account, StoreError>;

    /// Replace the profile fields present in `payload`. The username is fixed.
    fn update(&self, id: u64, payload: AccountPayload) -> Result<Account, StoreError>;
}

/// Process-local store.
#[derive(Debug)]
pub struct InMemoryCustomerStore {
    accounts: DashMap<u64, Account>,
    usernames: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl Default for InMemoryCustomerStore {
    fn default() -> Self {
        Self {
            accounts: DashMap::new(),
            usernames: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the demo accounts.
    pub fn with_demo_accounts() -> Self {
        let store = Self::new();
        let demo = [
            ("admin", "admin123", "admin@pharmacy.com", "Admin", "User", "555-0001"),
            ("john.doe", "password123", "john.doe@example.com", "John", "Doe", "555-0002"),
            ("jane.smith", "pass1234", "jane.smith@example.com", "Jane", "Smith", "555-0003"),
        ];
        for (username, password, email, first, last, phone) in demo {
            let payload = AccountPayload {
                email: Some(email.into()),
                first_name: Some(first.into()),
                last_name: Some(last.into()),
                phone: Some(phone.into()),
                ..AccountPayload::credentials(username, password)
            };
            if let Err(e) = store.register(payload) {
                tracing::warn!(username, error = %e, "Skipping demo account");
            }
        }
        store
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, StoreError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(StoreError::MissingField(field))
}

impl CustomerStore for InMemoryCustomerStore {
    fn authenticate(&self, username: &str, password: &str) -> Option<Account> {
        self.find_by_username(username)
            .filter(|account| account.is_active && account.password == password)
    }

    fn record_login(&self, id: u64, at: DateTime<Utc>) {
        if let Some(mut account) = self.accounts.get_mut(&id) {
            account.last_login = Some(at);
        }
    }

    fn find_by_id(&self, id: u64) -> Option<Account> {
        self.accounts.get(&id).map(|a| a.value().clone())
    }

    fn find_by_username(&self, username: &str) -> Option<Account> {
        let id = *self.usernames.get(username)?;
        self.find_by_id(id)
    }

    fn list(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|a| a.value().clone()).collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    fn register(&self, payload: AccountPayload) -> Result<Account, StoreError> {
        let username = required(payload.username, "username")?;
        let password = required(payload.password, "password")?;

        // Reserve the name first so concurrent registrations cannot both win.
        let id = match self.usernames.entry(username.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateUsername(username)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(id);
                id
            }
        };

        let account = Account {
            id,
            username,
            password,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            address: payload.address,
            city: payload.city,
            state: payload.state,
            zip_code: payload.zip_code,
            created_at: Utc::now(),
            last_login: None,
            is_active: true,
        };
        self.accounts.insert(id, account.clone());

        tracing::info!(id, username = %account.username, "Account registered");
        Ok(account)
    }

    fn update(&self, id: u64, payload: AccountPayload) -> Result<Account, StoreError> {
        let mut entry = self.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let account = entry.value_mut();

        if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
            account.password = password;
        }
        let fields = [
            (&mut account.email, payload.email),
            (&mut account.first_name, payload.first_name),
            (&mut account.last_name, payload.last_name),
            (&mut account.phone, payload.phone),
            (&mut account.address, payload.address),
            (&mut account.city, payload.city),
            (&mut account.state, payload.state),
            (&mut account.zip_code, payload.zip_code),
        ];
        for (slot, value) in fields {
            if value.is_some() {
                *slot = value;
            }
        }

        Ok(account.clone())
    }
}
