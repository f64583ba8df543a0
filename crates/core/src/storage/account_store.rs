use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::account::Account;

/// Seam to the external credential store.
///
/// The real store lives behind an opaque secure-storage contract (the
/// app keeps credentials in the platform keychain); the core never
/// inspects storage internals and reads any failure as "no accounts".
pub trait AccountStore: Send + Sync {
    /// All stored accounts; an unreadable store yields an empty list.
    fn get(&self) -> Vec<Account>;

    /// Replace the stored account list.
    fn put(&self, accounts: &[Account]) -> Result<(), CoreError>;
}

/// In-memory account store for tests and embedding.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account (matched by identity).
    pub fn add(&self, account: Account) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.retain(|a| a.id() != account.id());
            accounts.push(account);
        }
    }

    /// Remove an account by identity. Returns whether one was removed.
    pub fn remove(&self, key_id: &str) -> bool {
        match self.accounts.lock() {
            Ok(mut accounts) => {
                let before = accounts.len();
                accounts.retain(|a| a.id() != key_id);
                accounts.len() != before
            }
            Err(_) => false,
        }
    }
}

impl AccountStore for MemoryAccountStore {
    fn get(&self) -> Vec<Account> {
        self.accounts
            .lock()
            .map(|accounts| accounts.clone())
            .unwrap_or_default()
    }

    fn put(&self, accounts: &[Account]) -> Result<(), CoreError> {
        match self.accounts.lock() {
            Ok(mut stored) => {
                *stored = accounts.to_vec();
                Ok(())
            }
            Err(_) => Err(CoreError::Unknown("account store lock poisoned".into())),
        }
    }
}
