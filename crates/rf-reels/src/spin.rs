//! Spin - the immutable outcome of one round

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::money::Currency;
use crate::payout::{Payout, ScatterWin, WinningLine};

/// Outcome of one round
///
/// Created once per round and handed to the caller; the engine keeps no copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub session_id: String,
    pub machine_id: String,
    /// Per-session sequence number, also the wallet idempotency key
    pub sequence: u64,
    /// Bet in minor units
    pub bet: u64,
    pub currency: Currency,
    pub grid: Grid,
    /// Total win in minor units
    pub total_win: u64,
    pub winning_lines: Vec<WinningLine>,
    pub scatter_wins: Vec<ScatterWin>,
    pub timestamp: DateTime<Utc>,
}

impl Spin {
    pub(crate) fn new(
        session_id: &str,
        machine_id: &str,
        sequence: u64,
        bet: u64,
        currency: &Currency,
        grid: Grid,
        payout: Payout,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            machine_id: machine_id.to_string(),
            sequence,
            bet,
            currency: currency.clone(),
            grid,
            total_win: payout.total_win,
            winning_lines: payout.winning_lines,
            scatter_wins: payout.scatter_wins,
            timestamp: Utc::now(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.total_win > 0
    }

    /// Win as a multiple of the bet
    pub fn win_ratio(&self) -> f64 {
        if self.bet == 0 {
            return 0.0;
        }
        self.total_win as f64 / self.bet as f64
    }

    /// Balance change for the player (win minus bet)
    pub fn net(&self) -> i128 {
        i128::from(self.total_win) - i128::from(self.bet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paytable::Multiplier;

    #[test]
    fn test_spin_from_payout() {
        let payout = Payout {
            total_win: 500,
            winning_lines: vec![WinningLine {
                payline_id: 0,
                symbol_id: 1,
                cell_count: 3,
                multiplier: Multiplier::times(5),
                payout: 500,
                positions: vec![(0, 0), (1, 0), (2, 0)],
            }],
            scatter_wins: Vec::new(),
        };
        let spin = Spin::new(
            "s1",
            "classic",
            1,
            100,
            &Currency::new("USD", 2),
            Grid::from_rows(vec![vec![1, 1, 1]]),
            payout,
        );
        assert!(spin.is_win());
        assert!((spin.win_ratio() - 5.0).abs() < f64::EPSILON);
        assert_eq!(spin.net(), 400);
        assert_eq!(spin.winning_lines.len(), 1);
    }

    #[test]
    fn test_serializes_to_json() {
        let spin = Spin::new(
            "s1",
            "m",
            2,
            10,
            &Currency::new("COIN", 0),
            Grid::from_rows(vec![vec![1, 2, 3]]),
            Payout::default(),
        );
        let json = serde_json::to_value(&spin).unwrap();
        assert_eq!(json["sequence"], 2);
        assert_eq!(json["grid"], serde_json::json!([[1, 2, 3]]));
        assert_eq!(json["total_win"], 0);
    }
}
