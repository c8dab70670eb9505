//! Spin session - one player's round state machine
//!
//! ```text
//! Idle ──> BetValidated ──> Debited ──> Resolved ──> Settled
//!   │            │
//!   └────────────┴──> Rejected
//! ```
//!
//! Exactly one round is in flight per session. The debit completes before
//! the RNG is touched; once debited, the round always resolves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::error::SpinError;
use crate::machine::PublishedMachine;
use crate::money::Currency;
use crate::spin::Spin;
use crate::wallet::{Wallet, WalletError};

/// Round state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for a bet
    #[default]
    Idle,
    /// Bet within limits and covered by the balance
    BetValidated,
    /// Bet taken by the wallet
    Debited,
    /// Grid drawn and evaluated
    Resolved,
    /// Win credited; the spin is final
    Settled,
    /// Round refused before any money moved
    Rejected,
}

/// Clears the in-flight flag when the round ends, however it ends
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A player's session on one machine
pub struct SpinSession<R = ChaCha20Rng> {
    id: String,
    machine: RwLock<Arc<PublishedMachine>>,
    rng: Mutex<R>,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
    next_sequence: Arc<AtomicU64>,
}

impl<R: RngCore + Send> SpinSession<R> {
    /// Session with its own RNG; sequences start at 1
    pub fn new(id: impl Into<String>, machine: Arc<PublishedMachine>, rng: R) -> Self {
        Self::with_sequence(id, machine, rng, Arc::new(AtomicU64::new(1)))
    }

    /// Session drawing sequence numbers from a shared counter
    ///
    /// Every session opened under the same id must share one counter, or
    /// wallet idempotency keys repeat.
    pub fn with_sequence(
        id: impl Into<String>,
        machine: Arc<PublishedMachine>,
        rng: R,
        next_sequence: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id: id.into(),
            machine: RwLock::new(machine),
            rng: Mutex::new(rng),
            state: Mutex::new(SessionState::Idle),
            in_flight: AtomicBool::new(false),
            next_sequence,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Machine the next round will be played on
    pub fn machine(&self) -> Arc<PublishedMachine> {
        self.machine.read().clone()
    }

    /// State reached by the latest round
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Sequence number the next debited round would use
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::Acquire)
    }

    /// Move to another published machine between rounds
    pub fn switch_machine(&self, machine: Arc<PublishedMachine>) -> Result<(), SpinError> {
        let _flight = self.begin_flight()?;
        log::info!(
            "Session '{}' switched from '{}' to '{}'",
            self.id,
            self.machine.read().id(),
            machine.id()
        );
        *self.machine.write() = machine;
        Ok(())
    }

    /// Play one round
    ///
    /// Fails fast with [`SpinError::SessionBusy`] if another round is in
    /// flight. A credit failure after the debit returns
    /// [`SpinError::Settlement`] carrying the resolved spin.
    pub fn spin<W: Wallet + ?Sized>(
        &self,
        wallet: &W,
        bet: u64,
        currency: &Currency,
    ) -> Result<Spin, SpinError> {
        let _flight = self.begin_flight()?;
        self.transition(SessionState::Idle);

        let machine = self.machine();
        let (min, max) = (machine.machine().min_bet, machine.machine().max_bet);
        if bet < min || bet > max {
            self.transition(SessionState::Rejected);
            return Err(SpinError::InvalidBet { bet, min, max });
        }

        let available = wallet.available(&self.id, currency).map_err(|e| {
            self.transition(SessionState::Rejected);
            log::warn!("Session '{}': balance query failed: {}", self.id, e);
            SpinError::Wallet(e)
        })?;
        if bet > available {
            self.transition(SessionState::Rejected);
            return Err(SpinError::InsufficientFunds { bet, available });
        }
        self.transition(SessionState::BetValidated);

        let sequence = self.next_sequence.fetch_add(1, Ordering::AcqRel);
        wallet
            .debit(&self.id, bet, currency, sequence)
            .map_err(|e| {
                self.transition(SessionState::Rejected);
                log::warn!(
                    "Session '{}': debit of {} for spin {} failed: {}",
                    self.id,
                    bet,
                    sequence,
                    e
                );
                match e {
                    WalletError::InsufficientFunds { available, .. } => {
                        SpinError::InsufficientFunds { bet, available }
                    }
                    other => SpinError::Wallet(other),
                }
            })?;
        self.transition(SessionState::Debited);

        let (grid, payout) = {
            let mut rng = self.rng.lock();
            machine.resolve(bet, &mut *rng)
        };
        let spin = Spin::new(&self.id, machine.id(), sequence, bet, currency, grid, payout);
        self.transition(SessionState::Resolved);

        if let Err(source) = wallet.credit(&self.id, spin.total_win, currency, sequence) {
            log::error!(
                "Settlement failed: session '{}', machine '{}', spin {}, bet {}, win {} {}: {}",
                self.id,
                spin.machine_id,
                sequence,
                bet,
                spin.total_win,
                currency,
                source
            );
            return Err(SpinError::Settlement {
                session_id: self.id.clone(),
                sequence,
                spin: Box::new(spin),
                source,
            });
        }
        self.transition(SessionState::Settled);

        Ok(spin)
    }

    fn begin_flight(&self) -> Result<FlightGuard<'_>, SpinError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| FlightGuard(&self.in_flight))
            .map_err(|_| SpinError::SessionBusy(self.id.clone()))
    }

    fn transition(&self, next: SessionState) {
        let mut state = self.state.lock();
        log::debug!("Session '{}': {:?} -> {:?}", self.id, *state, next);
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::machine::{Machine, Volatility};
    use crate::paytable::{Multiplier, Payline, WinCondition};
    use crate::reels::Reel;
    use crate::symbols::{Rarity, Symbol};
    use crate::wallet::MemoryWallet;
    use rand::SeedableRng;

    fn published() -> Arc<PublishedMachine> {
        let mut machine = Machine::new("sevens", "Sevens")
            .with_symbol(Symbol::regular(1, "seven", 10, Rarity::Rare))
            .with_symbol(Symbol::regular(2, "cherry", 1, Rarity::Common))
            .with_payline(Payline::straight(0, 0, 3))
            .with_condition(WinCondition::line(1, 3, Multiplier::times(5)))
            .with_declared(0.5, Volatility::Low)
            .with_bet_limits(10, 1_000);
        for index in 0..3 {
            machine = machine.with_reel(Reel::new(index).weight(1, 1).weight(2, 9));
        }
        let config = EngineConfig::default().with_volatility_sample(10_000);
        Arc::new(PublishedMachine::publish(machine, &config).unwrap())
    }

    fn session() -> SpinSession {
        SpinSession::new("s1", published(), ChaCha20Rng::seed_from_u64(11))
    }

    #[test]
    fn test_settled_round() {
        let coins = Currency::new("COIN", 0);
        let wallet = MemoryWallet::new();
        wallet.deposit("s1", &coins, 1_000).unwrap();
        let session = session();

        let spin = session.spin(&wallet, 100, &coins).unwrap();
        assert_eq!(spin.sequence, 1);
        assert_eq!(session.state(), SessionState::Settled);
        assert_eq!(session.next_sequence(), 2);
        assert!(!session.is_in_flight());
        assert_eq!(
            wallet.balance("s1", &coins),
            Some(1_000 - 100 + spin.total_win)
        );
    }

    #[test]
    fn test_invalid_bet_is_rejected() {
        let coins = Currency::new("COIN", 0);
        let wallet = MemoryWallet::new();
        wallet.deposit("s1", &coins, 1_000).unwrap();
        let session = session();

        assert!(matches!(
            session.spin(&wallet, 5, &coins),
            Err(SpinError::InvalidBet { bet: 5, min: 10, max: 1_000 })
        ));
        assert_eq!(session.state(), SessionState::Rejected);
        assert_eq!(session.next_sequence(), 1);
        assert!(!session.is_in_flight());
    }

    #[test]
    fn test_unknown_account_surfaces_as_wallet_error() {
        let session = session();
        let result = session.spin(&MemoryWallet::new(), 100, &Currency::new("COIN", 0));
        assert!(matches!(
            result,
            Err(SpinError::Wallet(WalletError::UnknownAccount(_)))
        ));
    }

    #[test]
    fn test_shared_sequence_continues() {
        let coins = Currency::new("COIN", 0);
        let wallet = MemoryWallet::new();
        wallet.deposit("s1", &coins, 1_000).unwrap();
        let counter = Arc::new(AtomicU64::new(1));

        let first = SpinSession::with_sequence(
            "s1",
            published(),
            ChaCha20Rng::seed_from_u64(1),
            Arc::clone(&counter),
        );
        assert_eq!(first.spin(&wallet, 100, &coins).unwrap().sequence, 1);

        let second =
            SpinSession::with_sequence("s1", published(), ChaCha20Rng::seed_from_u64(2), counter);
        assert_eq!(second.next_sequence(), 2);
        assert_eq!(second.spin(&wallet, 100, &coins).unwrap().sequence, 2);
    }

    #[test]
    fn test_switch_machine() {
        let session = session();
        let other = published();
        session.switch_machine(Arc::clone(&other)).unwrap();
        assert!(Arc::ptr_eq(&session.machine(), &other));
    }
}
