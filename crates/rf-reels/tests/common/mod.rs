//! Shared machines and test doubles

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rf_reels::{
    Currency, EngineConfig, IdempotencyKey, Machine, MemoryWallet, Multiplier, Payline,
    PublishedMachine, Rarity, Reel, Symbol, Volatility, Wallet, WalletError, WinCondition,
};

pub const SEVEN: u32 = 1;
pub const CHERRY: u32 = 2;

pub fn coins() -> Currency {
    Currency::new("COIN", 2)
}

pub fn test_config() -> EngineConfig {
    EngineConfig::default().with_volatility_sample(20_000)
}

/// Three reels, one row, seven:cherry 1:9, seven x3 pays 5x
pub fn sevens_machine() -> Machine {
    let mut machine = Machine::new("sevens", "Classic Sevens")
        .with_symbol(Symbol::regular(SEVEN, "seven", 10, Rarity::Rare))
        .with_symbol(Symbol::regular(CHERRY, "cherry", 1, Rarity::Common))
        .with_payline(Payline::from_rows(0, &[0, 0, 0]))
        .with_condition(WinCondition::line(SEVEN, 3, Multiplier::times(5)))
        .with_declared(0.5, Volatility::Low)
        .with_bet_limits(10, 10_000);
    for index in 0..3 {
        machine = machine.with_reel(Reel::new(index).weight(SEVEN, 1).weight(CHERRY, 9));
    }
    machine
}

/// Three reels, two rows, two straight paylines, cherries pay on any line
pub fn two_line_machine() -> Machine {
    let mut machine = Machine::new("two-line", "Two Line")
        .with_symbol(Symbol::regular(SEVEN, "seven", 10, Rarity::Rare))
        .with_symbol(Symbol::regular(CHERRY, "cherry", 1, Rarity::Common))
        .with_rows(2)
        .with_payline(Payline::straight(10, 0, 3))
        .with_payline(Payline::straight(11, 1, 3))
        .with_condition(WinCondition::line(CHERRY, 3, Multiplier::times(1)))
        .with_declared(145.8, Volatility::Low)
        .with_bet_limits(1, 1_000);
    for index in 0..3 {
        machine = machine.with_reel(Reel::new(index).weight(CHERRY, 9).weight(SEVEN, 1));
    }
    machine
}

pub fn publish(machine: Machine) -> Arc<PublishedMachine> {
    Arc::new(PublishedMachine::publish(machine, &test_config()).unwrap())
}

/// Always yields zero, so every reel draws its first weighted symbol
pub struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }
}

/// Seeded RNG that counts how often it is asked for randomness
pub struct CountingRng {
    inner: ChaCha8Rng,
    calls: Arc<AtomicUsize>,
}

impl CountingRng {
    pub fn new(seed: u64) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let rng = Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            calls: Arc::clone(&calls),
        };
        (rng, calls)
    }
}

impl RngCore for CountingRng {
    fn next_u32(&mut self) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fill_bytes(dest);
    }
}

/// Memory wallet whose debits or credits can be made to fail
#[derive(Default)]
pub struct FlakyWallet {
    pub inner: MemoryWallet,
    pub fail_debits: AtomicBool,
    pub fail_credits: AtomicBool,
}

impl Wallet for FlakyWallet {
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError> {
        self.inner.available(session, currency)
    }

    fn debit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        if self.fail_debits.load(Ordering::SeqCst) {
            return Err(WalletError::Unavailable("debit backend down".into()));
        }
        self.inner.debit(session, amount, currency, key)
    }

    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        if self.fail_credits.load(Ordering::SeqCst) {
            return Err(WalletError::Unavailable("credit backend down".into()));
        }
        self.inner.credit(session, amount, currency, key)
    }
}

/// Wallet that parks inside `debit` until released
pub struct BlockingWallet {
    pub inner: MemoryWallet,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl BlockingWallet {
    /// Returns the wallet, a receiver signalled on debit entry and a sender that releases it
    pub fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let wallet = Self {
            inner: MemoryWallet::new(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        };
        (wallet, entered_rx, release_tx)
    }
}

impl Wallet for BlockingWallet {
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError> {
        self.inner.available(session, currency)
    }

    fn debit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        let _ = self.entered.lock().send(());
        let _ = self.release.lock().recv();
        self.inner.debit(session, amount, currency, key)
    }

    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        self.inner.credit(session, amount, currency, key)
    }
}

/// Wallet whose balance check passes but whose debit finds the funds already spent
#[derive(Default)]
pub struct OverdrawnWallet {
    pub inner: MemoryWallet,
}

impl Wallet for OverdrawnWallet {
    fn available(&self, session: &str, currency: &Currency) -> Result<u64, WalletError> {
        self.inner.available(session, currency)
    }

    fn debit(
        &self,
        _session: &str,
        amount: u64,
        _currency: &Currency,
        _key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        Err(WalletError::InsufficientFunds {
            requested: amount,
            available: 0,
        })
    }

    fn credit(
        &self,
        session: &str,
        amount: u64,
        currency: &Currency,
        key: IdempotencyKey,
    ) -> Result<(), WalletError> {
        self.inner.credit(session, amount, currency, key)
    }
}
