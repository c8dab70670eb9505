//! Grid assembler - the visible rows × reels window

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stops::WeightedReel;

/// Visible window of symbol IDs, indexed `[row][reel]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid(Vec<Vec<u32>>);

impl Grid {
    /// Build a grid from explicit rows
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Self {
        Self(rows)
    }

    /// Fill a `rows × reels` window with independent draws
    ///
    /// Every cell is its own draw from its reel's weights, consumed
    /// row-major. Rows of one reel are not a contiguous strip window.
    pub fn assemble<R: Rng + ?Sized>(reels: &[WeightedReel], rows: u8, rng: &mut R) -> Self {
        let mut cells = Vec::with_capacity(rows as usize);
        for _ in 0..rows {
            let mut row = Vec::with_capacity(reels.len());
            for reel in reels {
                row.push(reel.draw(rng));
            }
            cells.push(row);
        }
        Self(cells)
    }

    /// Rows of the grid
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.0
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.0.len()
    }

    /// Number of reels
    pub fn reel_count(&self) -> usize {
        self.0.first().map(Vec::len).unwrap_or(0)
    }

    /// Symbol at (reel, row)
    pub fn get(&self, reel: u8, row: u8) -> Option<u32> {
        self.0
            .get(row as usize)
            .and_then(|r| r.get(reel as usize))
            .copied()
    }

    /// All cells as `(reel, row, symbol)`
    pub fn cells(&self) -> impl Iterator<Item = (u8, u8, u32)> + '_ {
        self.0.iter().enumerate().flat_map(|(row, symbols)| {
            symbols
                .iter()
                .enumerate()
                .map(move |(reel, &symbol)| (reel as u8, row as u8, symbol))
        })
    }
}
