//! Round engine - session registry in front of the wallet and machine store

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::error::SpinError;
use crate::money::Currency;
use crate::session::SpinSession;
use crate::spin::Spin;
use crate::store::MachineStore;
use crate::wallet::Wallet;

/// What survives a closed session: its sequence counter and how often it was opened
struct SessionLineage {
    next_sequence: Arc<AtomicU64>,
    generation: u64,
}

/// Entry point for spin requests
///
/// Holds no balances and no spins; only the live sessions and, per session
/// id, the sequence counter that keeps wallet keys unique across reopens.
pub struct RoundEngine<W, S> {
    config: EngineConfig,
    wallet: W,
    store: S,
    sessions: RwLock<HashMap<String, Arc<SpinSession>>>,
    lineage: Mutex<HashMap<String, SessionLineage>>,
}

impl<W: Wallet, S: MachineStore> RoundEngine<W, S> {
    pub fn new(config: EngineConfig, wallet: W, store: S) -> Self {
        Self {
            config,
            wallet,
            store,
            sessions: RwLock::new(HashMap::new()),
            lineage: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a session on `machine_id`, or return the live one for `session_id`
    ///
    /// A reopened session continues the sequence of the one it replaces and
    /// gets a fresh RNG stream.
    pub fn open_session(
        &self,
        session_id: &str,
        machine_id: &str,
    ) -> Result<Arc<SpinSession>, SpinError> {
        if let Some(session) = self.session(session_id) {
            return Ok(session);
        }

        let machine = self.store.load_machine(machine_id)?;
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                let (next_sequence, generation) = self.next_lineage(session_id);
                let rng = match self.config.rng_seed {
                    Some(master) => {
                        log::debug!(
                            "Session '{}' seeded from master seed (generation {})",
                            session_id,
                            generation
                        );
                        ChaCha20Rng::from_seed(derive_session_seed(master, session_id, generation))
                    }
                    None => ChaCha20Rng::from_os_rng(),
                };
                log::info!(
                    "Opened session '{}' on machine '{}' (generation {})",
                    session_id,
                    machine_id,
                    generation
                );
                Arc::new(SpinSession::with_sequence(session_id, machine, rng, next_sequence))
            });
        Ok(Arc::clone(session))
    }

    fn next_lineage(&self, session_id: &str) -> (Arc<AtomicU64>, u64) {
        let mut lineage = self.lineage.lock();
        let entry = lineage
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLineage {
                next_sequence: Arc::new(AtomicU64::new(1)),
                generation: 0,
            });
        let generation = entry.generation;
        entry.generation += 1;
        (Arc::clone(&entry.next_sequence), generation)
    }

    /// Live session by id
    pub fn session(&self, session_id: &str) -> Option<Arc<SpinSession>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Drop a session; an in-flight round keeps its own handle and completes
    pub fn close_session(&self, session_id: &str) -> Option<Arc<SpinSession>> {
        let closed = self.sessions.write().remove(session_id);
        if closed.is_some() {
            log::info!("Closed session '{}'", session_id);
        }
        closed
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Play one round for `session_id` on `machine_id`
    ///
    /// Opens the session on first use. A session asked for a different
    /// machine switches to it when no round is in flight.
    pub fn spin(
        &self,
        session_id: &str,
        machine_id: &str,
        bet: u64,
        currency: &Currency,
    ) -> Result<Spin, SpinError> {
        let session = self.open_session(session_id, machine_id)?;
        if session.machine().id() != machine_id {
            let machine = self.store.load_machine(machine_id)?;
            session.switch_machine(machine)?;
        }

        session.spin(&self.wallet, bet, currency).inspect_err(|e| {
            if e.is_rejection() {
                log::debug!("Spin rejected for session '{}': {}", session_id, e);
            }
        })
    }
}

/// Per-session RNG seed: SHA-256(master LE ‖ generation LE ‖ session id)
///
/// `generation` counts how often the session id has been opened, so a
/// reopened session never replays an earlier stream.
pub fn derive_session_seed(master: u64, session_id: &str, generation: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(master.to_le_bytes());
    hasher.update(generation.to_le_bytes());
    hasher.update(session_id.as_bytes());
    hasher.finalize().into()
}
