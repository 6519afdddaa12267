// Account Service Port (accounts are owned by an external collaborator)

use crate::domain::Account;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AccountService: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Account>>;

    async fn set_active(&self, user_id: &str, active: bool) -> Result<()>;

    /// Contractor verification flag
    async fn set_verified(&self, user_id: &str, verified: bool) -> Result<()>;

    /// Revoke every live session/token of the user
    async fn invalidate_sessions(&self, user_id: &str) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct State {
        accounts: HashMap<String, Account>,
        invalidations: HashMap<String, u32>,
    }

    #[derive(Default)]
    pub struct InMemoryAccountService {
        state: Mutex<State>,
    }

    impl InMemoryAccountService {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
            let service = Self::new();
            for account in accounts {
                service.put(account);
            }
            service
        }

        pub fn put(&self, account: Account) {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .accounts
                .insert(account.user_id.clone(), account);
        }

        pub fn account(&self, user_id: &str) -> Option<Account> {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .accounts
                .get(user_id)
                .cloned()
        }

        /// How many times sessions of `user_id` were invalidated
        pub fn invalidations(&self, user_id: &str) -> u32 {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .invalidations
                .get(user_id)
                .copied()
                .unwrap_or(0)
        }

        fn update(&self, user_id: &str, apply: impl FnOnce(&mut Account)) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let account = state
                .accounts
                .get_mut(user_id)
                .ok_or_else(|| AppError::NotFound(format!("account {}", user_id)))?;
            apply(account);
            Ok(())
        }
    }

    #[async_trait]
    impl AccountService for InMemoryAccountService {
        async fn get(&self, user_id: &str) -> Result<Option<Account>> {
            Ok(self.account(user_id))
        }

        async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
            self.update(user_id, |account| account.active = active)
        }

        async fn set_verified(&self, user_id: &str, verified: bool) -> Result<()> {
            self.update(user_id, |account| account.verified = verified)
        }

        async fn invalidate_sessions(&self, user_id: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            *state.invalidations.entry(user_id.to_string()).or_insert(0) += 1;
            Ok(())
        }
    }
}
