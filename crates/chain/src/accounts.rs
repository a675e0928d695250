use std::{collections::HashMap, fmt};

use crate::AccountError;

/// A named key known to the keyring.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    /// Bech32 address with the chain's prefix.
    pub address: String,
    pub pub_key: Vec<u8>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Looks up signing accounts by name.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait AccountRegistry: Send + Sync {
    fn get_by_name(&self, name: &str) -> Result<Account, AccountError>;
}

/// Registry backed by a map, used with the `memory` keyring backend.
#[derive(Debug, Default)]
pub struct InMemoryAccountRegistry {
    accounts: HashMap<String, Account>,
}

impl InMemoryAccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Account) -> Option<Account> {
        self.accounts.insert(account.name.clone(), account)
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.insert(account);
        self
    }
}

impl AccountRegistry for InMemoryAccountRegistry {
    fn get_by_name(&self, name: &str) -> Result<Account, AccountError> {
        self.accounts
            .get(name)
            .cloned()
            .ok_or_else(|| AccountError::NotFound(name.to_owned()))
    }
}
