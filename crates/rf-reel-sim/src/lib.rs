//! # rf-reel-sim - Batch Spin Simulator
//!
//! Runs millions of spins of a published machine across a rayon pool and
//! compares the measured return against the declared and exact RTP.
//!
//! ## Determinism
//!
//! Spins are split into fixed-size chunks. Chunk `i` draws from
//! `ChaCha8Rng::seed_from_u64(seed)` on stream `i`, and chunk results are
//! merged in index order, so a report depends only on (machine, bet, spins,
//! seed, chunk size), never on the thread count.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rf_reels::{PublishedMachine, SimulationStats, Volatility, simulate};

/// Spins per chunk unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: u64 = 50_000;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Bet {bet} outside machine limits [{min}, {max}]")]
    InvalidBet { bet: u64, min: u64, max: u64 },

    #[error("Nothing to simulate: spin count and chunk size must be positive")]
    EmptyRun,

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Batch parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub spins: u64,
    /// Bet per spin in minor units; `None` uses the machine's minimum bet
    pub bet: Option<u64>,
    pub seed: u64,
    /// Worker threads; 0 uses every core
    pub threads: usize,
    pub chunk_size: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            spins: 1_000_000,
            bet: None,
            seed: 1,
            threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Parallel simulator for one machine
pub struct BatchSimulator {
    machine: Arc<PublishedMachine>,
    config: SimConfig,
}

impl BatchSimulator {
    pub fn new(machine: Arc<PublishedMachine>) -> Self {
        Self {
            machine,
            config: SimConfig::default(),
        }
    }

    /// Builder: replace all parameters
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_spins(mut self, spins: u64) -> Self {
        self.config.spins = spins;
        self
    }

    pub fn with_bet(mut self, bet: u64) -> Self {
        self.config.bet = Some(bet);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run the batch
    pub fn run(&self) -> Result<SimulationReport, SimError> {
        let definition = self.machine.machine();
        let bet = self.config.bet.unwrap_or(definition.min_bet);
        if bet < definition.min_bet || bet > definition.max_bet {
            return Err(SimError::InvalidBet {
                bet,
                min: definition.min_bet,
                max: definition.max_bet,
            });
        }
        if self.config.spins == 0 || self.config.chunk_size == 0 {
            return Err(SimError::EmptyRun);
        }

        let threads = match self.config.threads {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

        let spins = self.config.spins;
        let chunk_size = self.config.chunk_size;
        let chunks = spins.div_ceil(chunk_size);
        log::info!(
            "Simulating {} spins of '{}' at bet {} ({} chunks, {} threads, seed {})",
            spins,
            self.machine.id(),
            bet,
            chunks,
            threads,
            self.config.seed
        );

        let started = Instant::now();
        let partials: Vec<SimulationStats> = pool.install(|| {
            (0..chunks)
                .into_par_iter()
                .map(|chunk| {
                    let count = chunk_size.min(spins - chunk * chunk_size);
                    let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
                    rng.set_stream(chunk);
                    simulate(&self.machine, bet, count, &mut rng)
                })
                .collect()
        });

        let mut stats = SimulationStats::default();
        for partial in &partials {
            stats.merge(partial);
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let report = SimulationReport::new(&self.machine, bet, self.config.seed, stats, elapsed_ms);
        log::info!(
            "'{}': measured RTP {:.3}% (exact {:.3}%) in {} ms",
            report.machine_id,
            report.measured_rtp,
            report.exact_rtp,
            elapsed_ms
        );
        Ok(report)
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub machine_id: String,
    pub bet: u64,
    pub seed: u64,
    pub spins: u64,
    /// Percent
    pub measured_rtp: f64,
    pub declared_rtp: f64,
    pub exact_rtp: f64,
    pub hit_rate: f64,
    pub std_dev: f64,
    pub max_win_ratio: f64,
    pub measured_volatility: Volatility,
    pub declared_volatility: Volatility,
    pub stats: SimulationStats,
    pub elapsed_ms: u64,
}

impl SimulationReport {
    fn new(
        machine: &PublishedMachine,
        bet: u64,
        seed: u64,
        stats: SimulationStats,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            machine_id: machine.id().to_string(),
            bet,
            seed,
            spins: stats.spins,
            measured_rtp: stats.rtp(),
            declared_rtp: machine.machine().declared_rtp,
            exact_rtp: machine.report().exact_rtp,
            hit_rate: stats.hit_rate(),
            std_dev: stats.std_dev(),
            max_win_ratio: stats.max_ratio,
            measured_volatility: stats.volatility(),
            declared_volatility: machine.machine().volatility,
            stats,
            elapsed_ms,
        }
    }

    /// Measured minus declared RTP, percentage points
    pub fn deviation_from_declared(&self) -> f64 {
        self.measured_rtp - self.declared_rtp
    }

    /// Measured minus exact RTP, percentage points
    pub fn deviation_from_exact(&self) -> f64 {
        self.measured_rtp - self.exact_rtp
    }

    /// Is the measured RTP within `tolerance` points of the declared one?
    pub fn within_tolerance(&self, tolerance: f64) -> bool {
        self.deviation_from_declared().abs() <= tolerance
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Machine:      {}", self.machine_id)?;
        writeln!(f, "Spins:        {} at bet {} (seed {})", self.spins, self.bet, self.seed)?;
        writeln!(
            f,
            "RTP:          {:.3}% measured, {:.3}% declared, {:.3}% exact ({:+.3}pp)",
            self.measured_rtp,
            self.declared_rtp,
            self.exact_rtp,
            self.deviation_from_declared()
        )?;
        writeln!(f, "Hit rate:     {:.2}%", self.hit_rate * 100.0)?;
        writeln!(
            f,
            "Volatility:   {:?} (std dev {:.3}, declared {:?})",
            self.measured_volatility, self.std_dev, self.declared_volatility
        )?;
        writeln!(f, "Max win:      {:.2}x bet", self.max_win_ratio)?;
        write!(f, "Elapsed:      {} ms", self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_reels::{
        EngineConfig, Machine, Multiplier, Payline, Rarity, Reel, Symbol, WinCondition,
    };

    fn sevens() -> Arc<PublishedMachine> {
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

    #[test]
    fn test_uneven_last_chunk() {
        let report = BatchSimulator::new(sevens())
            .with_spins(12_345)
            .with_chunk_size(1_000)
            .with_threads(2)
            .run()
            .unwrap();
        assert_eq!(report.spins, 12_345);
        assert_eq!(report.stats.wagered, 12_345 * 10);
        assert_eq!(report.bet, 10);
    }

    #[test]
    fn test_rejects_bet_outside_limits() {
        let result = BatchSimulator::new(sevens()).with_bet(5).run();
        assert!(matches!(result, Err(SimError::InvalidBet { bet: 5, .. })));
    }

    #[test]
    fn test_rejects_empty_run() {
        let result = BatchSimulator::new(sevens()).with_spins(0).run();
        assert!(matches!(result, Err(SimError::EmptyRun)));
    }

    #[test]
    fn test_report_json() {
        let report = BatchSimulator::new(sevens())
            .with_spins(1_000)
            .with_threads(1)
            .run()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["machine_id"], "sevens");
        assert_eq!(json["spins"], 1_000);
        assert_eq!(json["measured_volatility"], "low");
        assert!(report.to_string().contains("Machine:      sevens"));
    }
}
