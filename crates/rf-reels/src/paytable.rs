//! Paylines, win conditions and win evaluation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Bet multiplier in hundredths (`500` = 5×, `50` = 0.5×)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Whole-number multiplier
    pub const fn times(x: u32) -> Self {
        Self(x.saturating_mul(100))
    }

    /// Multiplier from hundredths
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Multiplier from a decimal factor, rounded to the nearest hundredth
    pub fn from_factor(factor: f64) -> Option<Self> {
        let hundredths = (factor * 100.0).round();
        if factor.is_finite() && hundredths >= 0.0 && hundredths <= f64::from(u32::MAX) {
            Some(Self(hundredths as u32))
        } else {
            None
        }
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Apply to an amount in minor units, rounding down
    pub fn apply(self, amount: u64) -> u64 {
        let scaled = u128::from(amount) * u128::from(self.0) / 100;
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

/// A payline definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payline {
    /// Payline ID
    pub id: u32,
    /// `(reel, row)` cells, one per reel, left to right
    pub cells: Vec<(u8, u8)>,
    /// Only active lines are evaluated
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Payline {
    /// Line from one row index per reel (e.g., `[0, 1, 2, 1, 0]` for a "V")
    pub fn from_rows(id: u32, rows: &[u8]) -> Self {
        Self {
            id,
            cells: rows
                .iter()
                .enumerate()
                .map(|(reel, &row)| (reel as u8, row))
                .collect(),
            active: true,
        }
    }

    /// Straight line (same row across all reels)
    pub fn straight(id: u32, row: u8, reel_count: u8) -> Self {
        Self::from_rows(id, &vec![row; reel_count as usize])
    }

    /// Builder: set active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// A win condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    /// Reference symbol ID
    pub symbol: u32,
    /// Required consecutive count (payline) or total count (scatter)
    pub count: u8,
    /// Bet multiplier paid when the condition qualifies
    pub payout: Multiplier,
    /// Evaluate along active paylines; `false` counts matches anywhere on the grid
    #[serde(default = "default_true")]
    pub on_payline: bool,
    /// Wild symbols may substitute for the reference symbol
    #[serde(default = "default_true")]
    pub allow_wild: bool,
}

impl WinCondition {
    /// Payline condition that accepts wild substitution
    pub fn line(symbol: u32, count: u8, payout: Multiplier) -> Self {
        Self {
            symbol,
            count,
            payout,
            on_payline: true,
            allow_wild: true,
        }
    }

    /// Scatter condition counted anywhere on the grid
    pub fn scatter(symbol: u32, count: u8, payout: Multiplier) -> Self {
        Self {
            on_payline: false,
            allow_wild: false,
            ..Self::line(symbol, count, payout)
        }
    }

    /// Builder: forbid wild substitution
    pub fn without_wild(mut self) -> Self {
        self.allow_wild = false;
        self
    }
}

/// A qualifying (payline, condition) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineHit {
    pub payline_id: u32,
    /// Index into the machine's condition list
    pub condition: usize,
    pub symbol_id: u32,
    /// Length of the matching run from the first cell
    pub run: u8,
    pub payout: Multiplier,
    /// Cells of the run as (reel, row)
    pub positions: Vec<(u8, u8)>,
}

/// A qualifying scatter condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterHit {
    pub condition: usize,
    pub symbol_id: u32,
    pub count: u8,
    pub payout: Multiplier,
    pub positions: Vec<(u8, u8)>,
}

/// Result of evaluating a grid, before the bet is applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub line_hits: Vec<LineHit>,
    pub scatter_hits: Vec<ScatterHit>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.line_hits.is_empty() && self.scatter_hits.is_empty()
    }
}

/// Paylines and conditions of a published machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayTable {
    paylines: Vec<Payline>,
    conditions: Vec<WinCondition>,
    /// Sorted wild symbol IDs
    wild_ids: Vec<u32>,
}

impl PayTable {
    pub fn new(
        paylines: Vec<Payline>,
        conditions: Vec<WinCondition>,
        mut wild_ids: Vec<u32>,
    ) -> Self {
        wild_ids.sort_unstable();
        wild_ids.dedup();
        Self {
            paylines,
            conditions,
            wild_ids,
        }
    }

    pub fn paylines(&self) -> &[Payline] {
        &self.paylines
    }

    pub fn conditions(&self) -> &[WinCondition] {
        &self.conditions
    }

    pub fn is_wild(&self, symbol: u32) -> bool {
        self.wild_ids.binary_search(&symbol).is_ok()
    }

    /// Does `symbol` count towards `condition`?
    ///
    /// Identity, or a wild when the condition accepts substitution.
    /// Wild-for-wild is identity.
    pub fn matches(&self, symbol: u32, condition: &WinCondition) -> bool {
        symbol == condition.symbol || (condition.allow_wild && self.is_wild(symbol))
    }

    /// Evaluate every active payline and every scatter condition
    pub fn evaluate(&self, grid: &Grid) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for payline in self.paylines.iter().filter(|p| p.active) {
            self.evaluate_line(grid, payline, &mut evaluation.line_hits);
        }

        for (index, condition) in self.conditions.iter().enumerate() {
            if condition.on_payline {
                continue;
            }
            if let Some(hit) = self.evaluate_scatter(grid, index, condition) {
                evaluation.scatter_hits.push(hit);
            }
        }

        evaluation
    }

    fn evaluate_line(&self, grid: &Grid, payline: &Payline, hits: &mut Vec<LineHit>) {
        for (index, condition) in self.conditions.iter().enumerate() {
            if !condition.on_payline {
                continue;
            }

            let run = payline
                .cells
                .iter()
                .take_while(|&&(reel, row)| {
                    grid.get(reel, row)
                        .is_some_and(|symbol| self.matches(symbol, condition))
                })
                .count();

            if run >= condition.count as usize {
                hits.push(LineHit {
                    payline_id: payline.id,
                    condition: index,
                    symbol_id: condition.symbol,
                    run: run as u8,
                    payout: condition.payout,
                    positions: payline.cells[..run].to_vec(),
                });
            }
        }
    }

    fn evaluate_scatter(
        &self,
        grid: &Grid,
        index: usize,
        condition: &WinCondition,
    ) -> Option<ScatterHit> {
        let positions: Vec<(u8, u8)> = grid
            .cells()
            .filter(|&(_, _, symbol)| self.matches(symbol, condition))
            .map(|(reel, row, _)| (reel, row))
            .collect();

        if positions.len() < condition.count as usize {
            return None;
        }

        Some(ScatterHit {
            condition: index,
            symbol_id: condition.symbol,
            count: positions.len().min(u8::MAX as usize) as u8,
            payout: condition.payout,
            positions,
        })
    }
}
