//! Machine - the published game definition

use std::ops::Deref;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::grid::Grid;
use crate::paytable::{Payline, PayTable, WinCondition};
use crate::payout::{self, Payout};
use crate::reels::Reel;
use crate::stops::WeightedReel;
use crate::symbols::{self, Symbol};
use crate::validate::{self, ValidationReport};

/// Game volatility level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    /// Low volatility - frequent small wins
    Low,
    /// Medium-low volatility
    MediumLow,
    /// Medium volatility - balanced
    #[default]
    Medium,
    /// Medium-high volatility
    MediumHigh,
    /// High volatility - rare big wins
    High,
    /// Very high volatility - very rare huge wins
    VeryHigh,
}

impl Volatility {
    /// Upper std-dev bound (exclusive) of each tier below `VeryHigh`
    const BANDS: [(f64, Volatility); 5] = [
        (2.0, Volatility::Low),
        (4.0, Volatility::MediumLow),
        (7.0, Volatility::Medium),
        (11.0, Volatility::MediumHigh),
        (16.0, Volatility::High),
    ];

    /// Tier position, 0 (Low) to 5 (VeryHigh)
    pub fn step(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::MediumLow => 1,
            Self::Medium => 2,
            Self::MediumHigh => 3,
            Self::High => 4,
            Self::VeryHigh => 5,
        }
    }

    /// Number of tiers between two levels
    pub fn distance(&self, other: Volatility) -> u8 {
        self.step().abs_diff(other.step())
    }

    /// Classify the standard deviation of the per-spin win ratio
    pub fn from_std_dev(std_dev: f64) -> Self {
        Self::BANDS
            .iter()
            .find(|(bound, _)| std_dev < *bound)
            .map(|&(_, tier)| tier)
            .unwrap_or(Self::VeryHigh)
    }

    /// Create from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium_low" | "medium-low" | "mediumlow" => Some(Self::MediumLow),
            "medium" | "med" => Some(Self::Medium),
            "medium_high" | "medium-high" | "mediumhigh" => Some(Self::MediumHigh),
            "high" => Some(Self::High),
            "very_high" | "very-high" | "veryhigh" | "extreme" => Some(Self::VeryHigh),
            _ => None,
        }
    }
}

/// Complete machine definition as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier
    pub id: String,
    /// Display name
    pub name: String,
    pub symbols: Vec<Symbol>,
    /// One reel per physical reel, left to right
    pub reels: Vec<Reel>,
    /// Visible rows per reel
    pub rows: u8,
    pub paylines: Vec<Payline>,
    pub conditions: Vec<WinCondition>,
    /// Declared return to player, in percent (e.g., 96.5)
    pub declared_rtp: f64,
    #[serde(default)]
    pub volatility: Volatility,
    /// Minimum bet in minor units
    pub min_bet: u64,
    /// Maximum bet in minor units
    pub max_bet: u64,
}

impl Machine {
    /// Create an empty machine with required fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbols: Vec::new(),
            reels: Vec::new(),
            rows: 1,
            paylines: Vec::new(),
            conditions: Vec::new(),
            declared_rtp: 0.0,
            volatility: Volatility::default(),
            min_bet: 1,
            max_bet: 1,
        }
    }

    /// Builder: add symbol
    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Builder: add reel
    pub fn with_reel(mut self, reel: Reel) -> Self {
        self.reels.push(reel);
        self
    }

    /// Builder: set visible rows
    pub fn with_rows(mut self, rows: u8) -> Self {
        self.rows = rows;
        self
    }

    /// Builder: add payline
    pub fn with_payline(mut self, payline: Payline) -> Self {
        self.paylines.push(payline);
        self
    }

    /// Builder: add win condition
    pub fn with_condition(mut self, condition: WinCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder: set declared RTP (percent) and volatility
    pub fn with_declared(mut self, rtp: f64, volatility: Volatility) -> Self {
        self.declared_rtp = rtp;
        self.volatility = volatility;
        self
    }

    /// Builder: set bet limits (minor units)
    pub fn with_bet_limits(mut self, min_bet: u64, max_bet: u64) -> Self {
        self.min_bet = min_bet;
        self.max_bet = max_bet;
        self
    }

    /// Number of reels
    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    /// Find symbol by ID
    pub fn symbol(&self, id: u32) -> Option<&Symbol> {
        symbols::find_symbol(&self.symbols, id)
    }

    /// Find symbol by display name
    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }
}

/// A machine compiled for spinning
///
/// Reels carry their cumulative tables; the paytable knows the wilds.
#[derive(Debug, Clone)]
pub struct CompiledMachine {
    machine: Machine,
    reels: Vec<WeightedReel>,
    paytable: PayTable,
}

impl CompiledMachine {
    /// Compile reels and paytable; fails on the first reel that cannot be drawn from
    pub fn compile(machine: Machine) -> Result<Self, ConfigurationError> {
        let reels = machine
            .reels
            .iter()
            .map(WeightedReel::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let paytable = PayTable::new(
            machine.paylines.clone(),
            machine.conditions.clone(),
            symbols::wild_ids(&machine.symbols),
        );
        Ok(Self {
            machine,
            reels,
            paytable,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn id(&self) -> &str {
        &self.machine.id
    }

    pub fn reels(&self) -> &[WeightedReel] {
        &self.reels
    }

    pub fn paytable(&self) -> &PayTable {
        &self.paytable
    }

    /// Generate, evaluate and pay one round
    ///
    /// Pure apart from RNG consumption.
    pub fn resolve<R: Rng + ?Sized>(&self, bet: u64, rng: &mut R) -> (Grid, Payout) {
        let grid = Grid::assemble(&self.reels, self.machine.rows, rng);
        let evaluation = self.paytable.evaluate(&grid);
        let payout = payout::aggregate(&evaluation, bet);
        (grid, payout)
    }
}

/// A machine that passed publish-time validation
///
/// The only form of machine a session will spin.
#[derive(Debug, Clone)]
pub struct PublishedMachine {
    compiled: CompiledMachine,
    report: ValidationReport,
}

impl PublishedMachine {
    /// Validate and publish
    pub fn publish(
        machine: Machine,
        config: &EngineConfig,
    ) -> Result<Self, Vec<ConfigurationError>> {
        let (compiled, report) = validate::validate_and_compile(machine, config)?;
        log::info!(
            "Published machine '{}' (exact RTP {:.3}%, volatility {:?})",
            compiled.id(),
            report.exact_rtp,
            report.measured_volatility
        );
        Ok(Self { compiled, report })
    }

    /// Validation results recorded at publish time
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}

impl Deref for PublishedMachine {
    type Target = CompiledMachine;

    fn deref(&self) -> &CompiledMachine {
        &self.compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_bands() {
        assert_eq!(Volatility::from_std_dev(0.0), Volatility::Low);
        assert_eq!(Volatility::from_std_dev(3.9), Volatility::MediumLow);
        assert_eq!(Volatility::from_std_dev(7.0), Volatility::MediumHigh);
        assert_eq!(Volatility::from_std_dev(15.9), Volatility::High);
        assert_eq!(Volatility::from_std_dev(40.0), Volatility::VeryHigh);
    }

    #[test]
    fn test_volatility_distance() {
        assert_eq!(Volatility::Low.distance(Volatility::VeryHigh), 5);
        assert_eq!(Volatility::High.distance(Volatility::Medium), 2);
        assert_eq!(Volatility::Medium.distance(Volatility::Medium), 0);
    }

    #[test]
    fn test_volatility_from_name() {
        assert_eq!(Volatility::from_name("high"), Some(Volatility::High));
        assert_eq!(Volatility::from_name("medium-low"), Some(Volatility::MediumLow));
        assert_eq!(Volatility::from_name("invalid"), None);
    }

    #[test]
    fn test_compile_rejects_zero_weight_reel() {
        let machine = Machine::new("m", "M")
            .with_reel(Reel::new(0).weight(1, 1))
            .with_reel(Reel::new(1).weight(1, 0));
        assert_eq!(
            CompiledMachine::compile(machine).err(),
            Some(ConfigurationError::ZeroWeight { reel: 1, symbol: 1 })
        );
    }
}
