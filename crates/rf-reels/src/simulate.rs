//! Monte Carlo spin statistics

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::machine::{CompiledMachine, Volatility};

/// Accumulated results of a batch of spins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub spins: u64,
    /// Total wagered, minor units
    pub wagered: u64,
    /// Total paid, minor units
    pub paid: u64,
    /// Spins with a non-zero win
    pub hits: u64,
    /// Σ win/bet
    pub sum_ratio: f64,
    /// Σ (win/bet)²
    pub sum_ratio_sq: f64,
    /// Largest single win/bet
    pub max_ratio: f64,
}

impl SimulationStats {
    /// Record one spin
    pub fn record(&mut self, bet: u64, win: u64) {
        self.spins += 1;
        self.wagered = self.wagered.saturating_add(bet);
        self.paid = self.paid.saturating_add(win);
        if win > 0 {
            self.hits += 1;
        }
        let ratio = if bet == 0 { 0.0 } else { win as f64 / bet as f64 };
        self.sum_ratio += ratio;
        self.sum_ratio_sq += ratio * ratio;
        self.max_ratio = self.max_ratio.max(ratio);
    }

    /// Fold another batch in
    pub fn merge(&mut self, other: &SimulationStats) {
        self.spins += other.spins;
        self.wagered = self.wagered.saturating_add(other.wagered);
        self.paid = self.paid.saturating_add(other.paid);
        self.hits += other.hits;
        self.sum_ratio += other.sum_ratio;
        self.sum_ratio_sq += other.sum_ratio_sq;
        self.max_ratio = self.max_ratio.max(other.max_ratio);
    }

    /// Measured return to player, in percent
    pub fn rtp(&self) -> f64 {
        if self.wagered == 0 {
            return 0.0;
        }
        self.paid as f64 / self.wagered as f64 * 100.0
    }

    /// Fraction of spins that won anything
    pub fn hit_rate(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        self.hits as f64 / self.spins as f64
    }

    /// Mean win/bet
    pub fn mean_ratio(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        self.sum_ratio / self.spins as f64
    }

    /// Population standard deviation of win/bet
    pub fn std_dev(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        let mean = self.mean_ratio();
        let variance = self.sum_ratio_sq / self.spins as f64 - mean * mean;
        variance.max(0.0).sqrt()
    }

    /// Volatility tier of the measured std dev
    pub fn volatility(&self) -> Volatility {
        Volatility::from_std_dev(self.std_dev())
    }
}

/// Spin `spins` rounds at a fixed bet without touching any wallet
pub fn simulate<R: Rng + ?Sized>(
    machine: &CompiledMachine,
    bet: u64,
    spins: u64,
    rng: &mut R,
) -> SimulationStats {
    let mut stats = SimulationStats::default();
    for _ in 0..spins {
        let (_, payout) = machine.resolve(bet, rng);
        stats.record(bet, payout.total_win);
    }
    stats
}
