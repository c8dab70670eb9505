//! Reel model - per-reel symbol population and weights

use serde::{Deserialize, Serialize};

/// Weight of one symbol on a reel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelWeight {
    pub symbol: u32,
    pub weight: u32,
}

/// A weighted reel
///
/// Entries keep authoring order; the order decides how the cumulative table
/// is laid out but never the probability of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reel {
    /// Reel index (0-based, left to right)
    pub index: u8,
    /// Symbol weights on this reel
    pub weights: Vec<ReelWeight>,
}

impl Reel {
    /// Create an empty reel
    pub fn new(index: u8) -> Self {
        Self {
            index,
            weights: Vec::new(),
        }
    }

    /// Create a reel from (symbol, weight) pairs
    pub fn with_weights(index: u8, pairs: &[(u32, u32)]) -> Self {
        Self {
            index,
            weights: pairs
                .iter()
                .map(|&(symbol, weight)| ReelWeight { symbol, weight })
                .collect(),
        }
    }

    /// Builder: add a weighted symbol
    pub fn weight(mut self, symbol: u32, weight: u32) -> Self {
        self.weights.push(ReelWeight { symbol, weight });
        self
    }

    /// Symbol IDs on this reel
    pub fn symbols(&self) -> impl Iterator<Item = u32> + '_ {
        self.weights.iter().map(|w| w.symbol)
    }

    /// Weight of a symbol (0 if absent)
    pub fn weight_of(&self, symbol: u32) -> u32 {
        self.weights
            .iter()
            .filter(|w| w.symbol == symbol)
            .map(|w| w.weight)
            .sum()
    }

    /// Sum of all weights, `None` on overflow
    pub fn total_weight(&self) -> Option<u64> {
        self.weights
            .iter()
            .try_fold(0u64, |acc, w| acc.checked_add(u64::from(w.weight)))
    }
}
