//! Publish-time validation
//!
//! Structural checks first (all collected, not just the first), then the
//! statistical ones on the compiled machine:
//!
//! - **Exact RTP**: cells are independent draws, so a payline condition hits
//!   with probability `Π p_i` over its first `count` cells, and a scatter
//!   condition follows the Poisson-binomial distribution of matching cells.
//! - **Volatility**: std dev of the per-spin win ratio over a seeded sample.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::machine::{CompiledMachine, Machine, Volatility};
use crate::paytable::{PayTable, WinCondition};
use crate::simulate;

/// Bet used for validation sampling; hundredth multipliers divide it exactly
pub const REFERENCE_BET: u64 = 10_000;

/// Minimum cells a win condition may require
pub const MIN_CONDITION_COUNT: u8 = 2;

/// Results of a successful validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub machine_id: String,
    pub declared_rtp: f64,
    /// Analytic RTP, percent
    pub exact_rtp: f64,
    pub declared_volatility: Volatility,
    pub volatility_std_dev: f64,
    pub measured_volatility: Volatility,
    /// Hit rate observed in the volatility sample
    pub hit_rate: f64,
    pub sample_spins: u64,
}

/// Validate a machine without publishing it
pub fn validate_configuration(
    machine: &Machine,
    config: &EngineConfig,
) -> Result<ValidationReport, Vec<ConfigurationError>> {
    validate_and_compile(machine.clone(), config).map(|(_, report)| report)
}

pub(crate) fn validate_and_compile(
    machine: Machine,
    config: &EngineConfig,
) -> Result<(CompiledMachine, ValidationReport), Vec<ConfigurationError>> {
    let errors = check_structure(&machine);
    if !errors.is_empty() {
        return Err(errors);
    }

    let compiled = CompiledMachine::compile(machine).map_err(|e| vec![e])?;
    let declared = compiled.machine().declared_rtp;
    let declared_volatility = compiled.machine().volatility;
    let mut errors = Vec::new();

    let exact = exact_rtp(&compiled);
    if (declared - exact).abs() > config.rtp_tolerance {
        errors.push(ConfigurationError::RtpOutOfTolerance {
            declared,
            exact,
            tolerance: config.rtp_tolerance,
        });
    }

    let (std_dev, measured, hit_rate) = if config.volatility_sample_spins == 0 {
        log::debug!(
            "Volatility sampling disabled, trusting declared {:?} for '{}'",
            declared_volatility,
            compiled.id()
        );
        (0.0, declared_volatility, 0.0)
    } else {
        let mut rng = ChaCha8Rng::seed_from_u64(config.volatility_seed);
        let stats = simulate::simulate(
            &compiled,
            REFERENCE_BET,
            config.volatility_sample_spins,
            &mut rng,
        );
        (stats.std_dev(), stats.volatility(), stats.hit_rate())
    };

    if declared_volatility.distance(measured) > config.volatility_tolerance {
        errors.push(ConfigurationError::VolatilityMismatch {
            declared: declared_volatility,
            measured,
            std_dev,
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let report = ValidationReport {
        machine_id: compiled.id().to_string(),
        declared_rtp: declared,
        exact_rtp: exact,
        declared_volatility,
        volatility_std_dev: std_dev,
        measured_volatility: measured,
        hit_rate,
        sample_spins: config.volatility_sample_spins,
    };
    Ok((compiled, report))
}

/// Structural checks on an authored machine
pub fn check_structure(machine: &Machine) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();
    let reel_count = machine.reel_count();

    if reel_count < 3 {
        errors.push(ConfigurationError::TooFewReels(reel_count));
    }
    if machine.rows == 0 {
        errors.push(ConfigurationError::NoRows);
    }

    let mut symbol_ids = HashSet::new();
    for symbol in &machine.symbols {
        if !symbol_ids.insert(symbol.id) {
            errors.push(ConfigurationError::DuplicateSymbol(symbol.id));
        }
        if symbol.win_multiplier == Some(0) {
            errors.push(ConfigurationError::InvalidWinMultiplier(symbol.id));
        }
    }

    for (position, reel) in machine.reels.iter().enumerate() {
        if reel.index as usize != position {
            errors.push(ConfigurationError::ReelIndexMismatch {
                position,
                index: reel.index,
            });
        }
        if reel.weights.is_empty() {
            errors.push(ConfigurationError::EmptyReel { reel: reel.index });
            continue;
        }
        let mut seen = HashSet::new();
        for entry in &reel.weights {
            if !symbol_ids.contains(&entry.symbol) {
                errors.push(ConfigurationError::UnknownReelSymbol {
                    reel: reel.index,
                    symbol: entry.symbol,
                });
            }
            if !seen.insert(entry.symbol) {
                errors.push(ConfigurationError::DuplicateReelSymbol {
                    reel: reel.index,
                    symbol: entry.symbol,
                });
            }
            if entry.weight == 0 {
                errors.push(ConfigurationError::ZeroWeight {
                    reel: reel.index,
                    symbol: entry.symbol,
                });
            }
        }
        if reel.total_weight().is_none() {
            errors.push(ConfigurationError::WeightOverflow { reel: reel.index });
        }
    }

    let mut payline_ids = HashSet::new();
    for payline in &machine.paylines {
        if !payline_ids.insert(payline.id) {
            errors.push(ConfigurationError::DuplicatePayline(payline.id));
        }
        if payline.cells.len() != reel_count {
            errors.push(ConfigurationError::PaylineLength {
                payline: payline.id,
                cells: payline.cells.len(),
                reels: reel_count,
            });
        }
        if payline
            .cells
            .iter()
            .enumerate()
            .any(|(i, &(reel, _))| reel as usize != i)
        {
            errors.push(ConfigurationError::PaylineReelOrder {
                payline: payline.id,
                reels: reel_count,
            });
        }
        if let Some(&(_, row)) = payline.cells.iter().find(|&&(_, row)| row >= machine.rows) {
            errors.push(ConfigurationError::PaylineRowOutOfRange {
                payline: payline.id,
                row,
                rows: machine.rows,
            });
        }
    }
    if !machine.paylines.iter().any(|p| p.active) {
        errors.push(ConfigurationError::NoActivePayline);
    }

    for condition in &machine.conditions {
        if !symbol_ids.contains(&condition.symbol) {
            errors.push(ConfigurationError::UnknownConditionSymbol(condition.symbol));
        }
        let max = if condition.on_payline {
            reel_count
        } else {
            reel_count * machine.rows as usize
        };
        if condition.count < MIN_CONDITION_COUNT || condition.count as usize > max {
            errors.push(ConfigurationError::ConditionCount {
                symbol: condition.symbol,
                count: condition.count,
                max,
            });
        }
        if condition.payout.is_zero() {
            errors.push(ConfigurationError::ZeroPayout {
                symbol: condition.symbol,
                count: condition.count,
            });
        }
    }

    if machine.min_bet == 0 || machine.min_bet > machine.max_bet {
        errors.push(ConfigurationError::BetLimits {
            min: machine.min_bet,
            max: machine.max_bet,
        });
    } else if max_win(machine, machine.max_bet).is_none() {
        errors.push(ConfigurationError::PayoutOverflow {
            max_bet: machine.max_bet,
        });
    }

    if !(machine.declared_rtp.is_finite() && machine.declared_rtp >= 0.0) {
        errors.push(ConfigurationError::InvalidDeclaredRtp(machine.declared_rtp));
    }

    errors
}

/// Upper bound of a single spin's win at `bet`, `None` if it overflows `u64`
///
/// Assumes every active payline satisfies every payline condition and every
/// scatter condition qualifies at once.
pub fn max_win(machine: &Machine, bet: u64) -> Option<u64> {
    let active = machine.paylines.iter().filter(|p| p.active).count() as u128;
    let hundredths: u128 = machine
        .conditions
        .iter()
        .map(|c| {
            let h = u128::from(c.payout.hundredths());
            if c.on_payline { h * active } else { h }
        })
        .sum();
    u64::try_from(hundredths * u128::from(bet) / 100).ok()
}

/// Analytic return to player of a compiled machine, in percent
pub fn exact_rtp(machine: &CompiledMachine) -> f64 {
    let paytable = machine.paytable();
    let rows = machine.machine().rows as usize;
    let mut expected = 0.0;

    for (index, condition) in paytable.conditions().iter().enumerate() {
        let probability: f64 = if condition.on_payline {
            paytable
                .paylines()
                .iter()
                .filter(|p| p.active)
                .map(|payline| {
                    payline
                        .cells
                        .iter()
                        .take(condition.count as usize)
                        .map(|&(reel, _)| match_probability(machine, paytable, reel, condition))
                        .product::<f64>()
                })
                .sum()
        } else {
            let cells: Vec<f64> = (0..rows)
                .flat_map(|_| {
                    (0..machine.reels().len())
                        .map(|reel| match_probability(machine, paytable, reel as u8, condition))
                })
                .collect();
            at_least(&cells, condition.count as usize)
        };
        log::debug!(
            "Condition {} (symbol {} x{}): P(hit) = {:.6}",
            index,
            condition.symbol,
            condition.count,
            probability
        );
        expected += probability * condition.payout.as_f64();
    }

    expected * 100.0
}

fn match_probability(
    machine: &CompiledMachine,
    paytable: &PayTable,
    reel: u8,
    condition: &WinCondition,
) -> f64 {
    machine
        .reels()
        .get(reel as usize)
        .map(|r| r.probability_where(|symbol| paytable.matches(symbol, condition)))
        .unwrap_or(0.0)
}

/// P(at least `k` successes) for independent trials with the given probabilities
fn at_least(probabilities: &[f64], k: usize) -> f64 {
    // dist[j] = P(exactly j successes so far)
    let mut dist = vec![0.0; probabilities.len() + 1];
    dist[0] = 1.0;
    for (n, &p) in probabilities.iter().enumerate() {
        for j in (0..=n + 1).rev() {
            let stay = dist[j] * (1.0 - p);
            let step = if j > 0 { dist[j - 1] * p } else { 0.0 };
            dist[j] = stay + step;
        }
    }
    dist.iter().skip(k).sum()
}
