//! The wallet-store seam.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::AdapterError;
use crate::types::Account;

/// Looks up managed accounts.
pub trait WalletStore: Send + Sync {
    fn account(&self, app_id: &str, wallet_id: &str, account_id: &str) -> Result<Account, AdapterError>;
}

/// In-memory [`WalletStore`], keyed by app, wallet and account id.
#[derive(Debug, Default)]
pub struct MemoryWalletStore {
    accounts: RwLock<HashMap<(String, String, String), Account>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, app_id: &str, account: Account) -> Result<(), AdapterError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AdapterError::AccountNotFound("wallet store lock poisoned".into()))?;
        accounts.insert(
            (app_id.to_string(), account.wallet_id.clone(), account.account_id.clone()),
            account,
        );
        Ok(())
    }
}

impl WalletStore for MemoryWalletStore {
    fn account(&self, app_id: &str, wallet_id: &str, account_id: &str) -> Result<Account, AdapterError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AdapterError::AccountNotFound("wallet store lock poisoned".into()))?;
        accounts
            .get(&(app_id.to_string(), wallet_id.to_string(), account_id.to_string()))
            .cloned()
            .ok_or_else(|| AdapterError::AccountNotFound(format!("{app_id}/{wallet_id}/{account_id}")))
    }
}
