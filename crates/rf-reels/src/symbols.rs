//! Symbol definitions

use serde::{Deserialize, Serialize};

/// Rarity tier, ordered from most to least common
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Parse an authoring name ("common", "epic", ...)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "common" => Some(Self::Common),
            "uncommon" => Some(Self::Uncommon),
            "rare" => Some(Self::Rare),
            "epic" => Some(Self::Epic),
            "legendary" => Some(Self::Legendary),
            _ => None,
        }
    }
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique symbol ID within a machine
    pub id: u32,
    /// Display name (e.g., "seven", "cherry", "WILD")
    pub name: String,
    /// Base value in multiplier units (informational, not used by payouts)
    #[serde(default)]
    pub base_value: u32,
    /// Rarity tier
    #[serde(default)]
    pub rarity: Rarity,
    /// Optional per-symbol win multiplier
    #[serde(default)]
    pub win_multiplier: Option<u32>,
    /// Wild symbols substitute for the reference symbol of any condition that allows it
    #[serde(default)]
    pub is_wild: bool,
}

impl Symbol {
    /// Create a regular paying symbol
    pub fn regular(id: u32, name: impl Into<String>, base_value: u32, rarity: Rarity) -> Self {
        Self {
            id,
            name: name.into(),
            base_value,
            rarity,
            win_multiplier: None,
            is_wild: false,
        }
    }

    /// Create a wild symbol
    pub fn wild(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            base_value: 0,
            rarity: Rarity::Epic,
            win_multiplier: None,
            is_wild: true,
        }
    }

    /// Builder: set win multiplier
    pub fn with_win_multiplier(mut self, multiplier: u32) -> Self {
        self.win_multiplier = Some(multiplier);
        self
    }
}

/// Find a symbol by ID
pub fn find_symbol(symbols: &[Symbol], id: u32) -> Option<&Symbol> {
    symbols.iter().find(|s| s.id == id)
}

/// IDs of all wild symbols, sorted
pub fn wild_ids(symbols: &[Symbol]) -> Vec<u32> {
    let mut ids: Vec<u32> = symbols.iter().filter(|s| s.is_wild).map(|s| s.id).collect();
    ids.sort_unstable();
    ids
}
