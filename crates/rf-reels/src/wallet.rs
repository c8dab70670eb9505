//! Wallet collaborator
//!
//! Balances live outside the engine. The engine only asks for the available
//! amount and requests debit/credit deltas, each carrying an idempotency key
//! equal to the spin sequence number so retries never double-apply.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Currency;

/// Idempotency key supplied with every wallet delta (the spin sequence)
pub type IdempotencyKey = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Balance overflow on account {0}")]
    Overflow(String),

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

/// External wallet interface
pub trait Wallet: Send + Sync {
    /// Funds currently available to `session` in `currency`
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError>;

    /// Take `amount`; a repeated key returns the original outcome without re-applying
    fn debit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError>;

    /// Give `amount` (0 is a valid, recorded credit); idempotent per key
    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError>;
}

impl<W: Wallet + ?Sized> Wallet for Arc<W> {
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError> {
        (**self).available(session, currency)
    }

    fn debit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        (**self).debit(session, amount, currency, key)
    }

    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        (**self).credit(session, amount, currency, key)
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Deposit,
    Debit,
    Credit,
}

/// One applied balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: LedgerKind,
    pub key: Option<IdempotencyKey>,
    pub amount: u64,
    pub balance_after: u64,
}

#[derive(Debug, Default)]
struct Account {
    balance: u64,
    /// Successful keyed deltas; failures are not remembered so a retry re-evaluates
    applied: HashMap<(LedgerKind, IdempotencyKey), u64>,
    ledger: Vec<LedgerEntry>,
}

type AccountKey = (String, String);

/// In-process wallet
///
/// Reference implementation of [`Wallet`] used by the simulator CLI and the
/// tests; accounts are keyed by (session, currency code).
#[derive(Debug, Default)]
pub struct MemoryWallet {
    accounts: Mutex<HashMap<AccountKey, Account>>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    fn account_key(session: &str, currency: &Currency) -> AccountKey {
        (session.to_string(), currency.code.clone())
    }

    /// Add funds, creating the account if needed
    pub fn deposit(
        &self,
        session: &str,
        currency: &Currency,
        amount: u64,
    ) -> Result<u64, WalletError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .entry(Self::account_key(session, currency))
            .or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| WalletError::Overflow(session.to_string()))?;
        let balance_after = account.balance;
        account.ledger.push(LedgerEntry {
            kind: LedgerKind::Deposit,
            key: None,
            amount,
            balance_after,
        });
        Ok(balance_after)
    }

    /// Current balance, `None` for an unknown account
    pub fn balance(&self, session: &str, currency: &Currency) -> Option<u64> {
        self.accounts
            .lock()
            .get(&Self::account_key(session, currency))
            .map(|a| a.balance)
    }

    /// Applied entries of an account, oldest first
    pub fn ledger(&self, session: &str, currency: &Currency) -> Vec<LedgerEntry> {
        self.accounts
            .lock()
            .get(&Self::account_key(session, currency))
            .map(|a| a.ledger.clone())
            .unwrap_or_default()
    }

    fn apply(
        &self,
        kind: LedgerKind,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&Self::account_key(session, currency))
            .ok_or_else(|| WalletError::UnknownAccount(session.to_string()))?;

        if let Some(&original) = account.applied.get(&(kind, key)) {
            if original != amount {
                log::warn!(
                    "Replayed {:?} key {} on '{}' with amount {} (original {})",
                    kind,
                    key,
                    session,
                    amount,
                    original
                );
            }
            return Ok(());
        }

        let new_balance = match kind {
            LedgerKind::Debit => {
                account
                    .balance
                    .checked_sub(amount)
                    .ok_or(WalletError::InsufficientFunds {
                        requested: amount,
                        available: account.balance,
                    })?
            }
            _ => account
                .balance
                .checked_add(amount)
                .ok_or_else(|| WalletError::Overflow(session.to_string()))?,
        };

        account.balance = new_balance;
        account.applied.insert((kind, key), amount);
        account.ledger.push(LedgerEntry {
            kind,
            key: Some(key),
            amount,
            balance_after: new_balance,
        });
        Ok(())
    }
}

impl Wallet for MemoryWallet {
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError> {
        self.balance(session, currency)
            .ok_or_else(|| WalletError::UnknownAccount(session.to_string()))
    }

    fn debit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        self.apply(LedgerKind::Debit, session, amount, currency, key)
    }

    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        self.apply(LedgerKind::Credit, session, amount, currency, key)
    }
}
