//! Connected-account tracking.
//!
//! A session tracks exactly one active account: the first of the wallet's
//! authorized list, as multi-account wallets collapse to one here.  Account
//! changes arrive through the provider's watch channel; dropping the session
//! drops the receiver, which is the deregistration.

use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::watch;

use crate::provider::{WalletError, WalletProvider};

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    accounts_rx: watch::Receiver<Vec<Address>>,
    current: Option<Address>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        let accounts_rx = provider.watch_accounts();
        Self {
            provider,
            accounts_rx,
            current: None,
        }
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// The active account, if any.
    pub fn account(&self) -> Option<Address> {
        self.current
    }

    /// Query already-authorized accounts without prompting the user.
    pub async fn check_connection(&mut self) -> Result<Option<Address>, WalletError> {
        let accounts = self.provider.accounts().await?;
        self.current = accounts.first().copied();
        Ok(self.current)
    }

    /// Prompt the user to authorize an account.
    pub async fn connect(&mut self) -> Result<Address, WalletError> {
        let accounts = self.provider.request_accounts().await?;
        match accounts.first() {
            Some(account) => {
                tracing::info!(account = %account, "wallet connected");
                self.current = Some(*account);
                Ok(*account)
            }
            None => Err(WalletError::UserRejected),
        }
    }

    /// Apply any pending account-changed notification.  Returns `true` when
    /// the active account changed (including to none).
    pub fn apply_account_changes(&mut self) -> bool {
        if !self.accounts_rx.has_changed().unwrap_or(false) {
            return false;
        }
        let first = self.accounts_rx.borrow_and_update().first().copied();
        if first != self.current {
            tracing::info!(account = ?first, "active account changed");
            self.current = first;
            true
        } else {
            false
        }
    }

    /// Wait for the next account change and return the new active account.
    /// Returns `None` once the provider side is gone.
    pub async fn changed(&mut self) -> Option<Option<Address>> {
        self.accounts_rx.changed().await.ok()?;
        let first = self.accounts_rx.borrow_and_update().first().copied();
        self.current = first;
        Some(first)
    }
}
