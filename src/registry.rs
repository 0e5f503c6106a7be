//! Account registry - id → account store
//!
//! Read-mostly after creation. Creation is atomic per id: the
//! create-if-absent check lives here, never in the coordinator.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

use crate::account::Account;
use crate::core_types::AccountId;
use crate::error::{LedgerError, Result};

/// Account storage abstraction
///
/// Implementations must be safe for concurrent creates and gets.
pub trait AccountRegistry: Send + Sync {
    /// Create an account, failing with `DuplicateAccountId` if the id exists
    fn create(&self, id: AccountId, initial_balance: Decimal) -> Result<Arc<Account>>;

    /// Look up an account, failing with `AccountNotFound`
    fn get(&self, id: &str) -> Result<Arc<Account>>;

    /// All accounts currently registered (unordered)
    fn accounts(&self) -> Vec<Arc<Account>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe in-memory registry backed by a sharded `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryAccountRegistry {
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl InMemoryAccountRegistry {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }
}

impl AccountRegistry for InMemoryAccountRegistry {
    fn create(&self, id: AccountId, initial_balance: Decimal) -> Result<Arc<Account>> {
        // Validate before touching the map so a bad request never holds a shard lock
        let account = Arc::new(Account::new(id.clone(), initial_balance)?);

        match self.accounts.entry(id) {
            Entry::Occupied(existing) => {
                Err(LedgerError::DuplicateAccountId(existing.key().clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&account));
                tracing::debug!(account_id = %account.id(), balance = %initial_balance, "Account created");
                Ok(account)
            }
        }
    }

    fn get(&self, id: &str) -> Result<Arc<Account>> {
        self.accounts
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::AccountNotFound(AccountId::from(id)))
    }

    fn accounts(&self) -> Vec<Arc<Account>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }
}
