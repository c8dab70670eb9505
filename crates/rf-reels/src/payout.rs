//! Payout aggregation

use serde::{Deserialize, Serialize};

use crate::paytable::{Evaluation, Multiplier};

/// A winning payline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningLine {
    /// Payline ID
    pub payline_id: u32,
    /// Matched reference symbol
    pub symbol_id: u32,
    /// Cells contributing to the run
    pub cell_count: u8,
    /// Multiplier applied to the bet
    pub multiplier: Multiplier,
    /// Win amount in minor units
    pub payout: u64,
    /// Winning cells as (reel, row)
    pub positions: Vec<(u8, u8)>,
}

/// A scatter win
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterWin {
    pub symbol_id: u32,
    pub cell_count: u8,
    pub multiplier: Multiplier,
    pub payout: u64,
    pub positions: Vec<(u8, u8)>,
}

/// Aggregated payout of one spin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Sum of all payouts in minor units
    pub total_win: u64,
    pub winning_lines: Vec<WinningLine>,
    pub scatter_wins: Vec<ScatterWin>,
}

impl Payout {
    pub fn is_win(&self) -> bool {
        self.total_win > 0
    }
}

/// Convert qualifying hits into money
///
/// Each hit pays `multiplier × bet`; the total is the plain sum, with no
/// deduplication between conditions.
pub fn aggregate(evaluation: &Evaluation, bet: u64) -> Payout {
    let mut payout = Payout::default();

    for hit in &evaluation.line_hits {
        let amount = hit.payout.apply(bet);
        payout.total_win = payout.total_win.saturating_add(amount);
        payout.winning_lines.push(WinningLine {
            payline_id: hit.payline_id,
            symbol_id: hit.symbol_id,
            cell_count: hit.run,
            multiplier: hit.payout,
            payout: amount,
            positions: hit.positions.clone(),
        });
    }

    for hit in &evaluation.scatter_hits {
        let amount = hit.payout.apply(bet);
        payout.total_win = payout.total_win.saturating_add(amount);
        payout.scatter_wins.push(ScatterWin {
            symbol_id: hit.symbol_id,
            cell_count: hit.count,
            multiplier: hit.payout,
            payout: amount,
            positions: hit.positions.clone(),
        });
    }

    payout
}
