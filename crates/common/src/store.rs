//! Account store boundary.
//!
//! Persistence lives outside the core; gated operations only ever read
//! accounts through this trait.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {anyhow::Result, async_trait::async_trait};

use crate::types::Account;

/// Read-only access to subscriber accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: &str) -> Result<Option<Account>>;
}

/// In-memory account store, seeded from config. Used by the cli wiring
/// and in tests; real deployments put a database behind [`AccountStore`].
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: RwLock::new(
                accounts
                    .into_iter()
                    .map(|a| (a.id.clone(), a))
                    .collect(),
            ),
        }
    }

    pub fn insert(&self, account: Account) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(account.id.clone(), account);
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| anyhow::anyhow!("account store lock poisoned"))?;
        Ok(accounts.get(id).cloned())
    }
}

/// Convenience alias for the shared trait object the gateway holds.
pub type SharedAccountStore = Arc<dyn AccountStore>;

#[cfg(test)]
mod tests {
    use {super::*, crate::types::Tier};

    #[tokio::test]
    async fn get_returns_seeded_account() {
        let store = MemoryAccountStore::new([Account {
            id: "u1".into(),
            tier: Tier::Subscribed,
            trial_start: None,
            subscription_end: None,
        }]);
        let account = store.get_account("u1").await.unwrap();
        assert!(account.is_some_and(|a| a.tier == Tier::Subscribed));
        assert!(store.get_account("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_replaces_existing() {
        let store = MemoryAccountStore::default();
        store.insert(Account {
            id: "u1".into(),
            tier: Tier::Trial,
            trial_start: None,
            subscription_end: None,
        });
        store.insert(Account {
            id: "u1".into(),
            tier: Tier::Subscribed,
            trial_start: None,
            subscription_end: None,
        });
        let account = store.get_account("u1").await.unwrap();
        assert!(account.is_some_and(|a| a.tier == Tier::Subscribed));
    }
}
