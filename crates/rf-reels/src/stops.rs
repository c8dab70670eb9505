//! Weighted stop generator

use rand::Rng;

use crate::error::ConfigurationError;
use crate::reels::Reel;

/// A reel compiled for drawing
///
/// Holds the `(symbol, weight)` pairs and a cumulative-weight table built
/// once at publish time. Draws never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedReel {
    index: u8,
    symbols: Vec<u32>,
    weights: Vec<u32>,
    /// cumulative[i] = weights[0] + ... + weights[i]
    cumulative: Vec<u64>,
}

impl WeightedReel {
    /// Compile a reel, rejecting zero weights and an empty population
    pub fn compile(reel: &Reel) -> Result<Self, ConfigurationError> {
        let mut symbols = Vec::with_capacity(reel.weights.len());
        let mut weights = Vec::with_capacity(reel.weights.len());
        let mut cumulative = Vec::with_capacity(reel.weights.len());
        let mut running = 0u64;

        for entry in &reel.weights {
            if entry.weight == 0 {
                return Err(ConfigurationError::ZeroWeight {
                    reel: reel.index,
                    symbol: entry.symbol,
                });
            }
            running = running
                .checked_add(u64::from(entry.weight))
                .ok_or(ConfigurationError::WeightOverflow { reel: reel.index })?;
            symbols.push(entry.symbol);
            weights.push(entry.weight);
            cumulative.push(running);
        }

        if running == 0 {
            return Err(ConfigurationError::EmptyReel { reel: reel.index });
        }

        Ok(Self {
            index: reel.index,
            symbols,
            weights,
            cumulative,
        })
    }

    /// Reel index
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Total weight (always > 0)
    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// `(symbol, weight)` pairs in table order
    pub fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.symbols.iter().copied().zip(self.weights.iter().copied())
    }

    /// Probability of drawing `symbol`
    pub fn probability(&self, symbol: u32) -> f64 {
        self.probability_where(|s| s == symbol)
    }

    /// Probability that the drawn symbol satisfies `pred`
    pub fn probability_where(&self, pred: impl Fn(u32) -> bool) -> f64 {
        let hit: u64 = self
            .entries()
            .filter(|&(s, _)| pred(s))
            .map(|(_, w)| u64::from(w))
            .sum();
        hit as f64 / self.total_weight() as f64
    }

    /// Draw one symbol
    ///
    /// Uniform point in `[0, total)`; the first symbol whose cumulative
    /// boundary exceeds the point wins.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let point = rng.random_range(0..self.total_weight());
        let slot = self.cumulative.partition_point(|&edge| edge <= point);
        self.symbols[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_compile_rejects_zero_weight() {
        let reel = Reel::new(1).weight(1, 3).weight(2, 0);
        assert_eq!(
            WeightedReel::compile(&reel),
            Err(ConfigurationError::ZeroWeight { reel: 1, symbol: 2 })
        );
    }

    #[test]
    fn test_compile_rejects_empty() {
        assert_eq!(
            WeightedReel::compile(&Reel::new(0)),
            Err(ConfigurationError::EmptyReel { reel: 0 })
        );
    }

    #[test]
    fn test_single_symbol_always_drawn() {
        let reel = WeightedReel::compile(&Reel::new(0).weight(7, 5)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(reel.draw(&mut rng), 7);
        }
    }

    #[test]
    fn test_probability() {
        let reel = WeightedReel::compile(&Reel::new(0).weight(1, 1).weight(2, 9)).unwrap();
        assert!((reel.probability(1) - 0.1).abs() < 1e-12);
        assert!((reel.probability(2) - 0.9).abs() < 1e-12);
        assert_eq!(reel.probability(3), 0.0);
        assert_eq!(reel.total_weight(), 10);
    }

    #[test]
    fn test_weight_fidelity() {
        let reel =
            WeightedReel::compile(&Reel::new(0).weight(1, 1).weight(2, 9).weight(3, 5)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
        let draws = 150_000;
        let mut counts = [0u32; 4];
        for _ in 0..draws {
            counts[reel.draw(&mut rng) as usize] += 1;
        }
        for symbol in 1..=3u32 {
            let observed = f64::from(counts[symbol as usize]) / f64::from(draws);
            let expected = reel.probability(symbol);
            assert!(
                (observed - expected).abs() < 0.01,
                "symbol {symbol}: observed {observed}, expected {expected}"
            );
        }
    }
}
