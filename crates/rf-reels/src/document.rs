//! Machine documents - JSON/YAML authoring format
//!
//! Authoring tools hand machines over as documents that reference symbols by
//! name and express pays as decimal bet factors. The parser enforces size
//! limits, resolves names and produces a [`Machine`] ready for validation.
//!
//! ```rust,ignore
//! let parser = DocumentParser::new();
//! let machine = parser.parse_json(json_string)?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DocumentLimits;
use crate::machine::{Machine, Volatility};
use crate::paytable::{Multiplier, Payline, WinCondition};
use crate::reels::{Reel, ReelWeight};
use crate::symbols::{Rarity, Symbol};

/// Document parsing errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Limit exceeded: {0}")]
    Limit(String),

    #[error("Unknown symbol name: {0}")]
    UnknownSymbol(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Machine document parser
pub struct DocumentParser {
    /// Validation limits
    pub limits: DocumentLimits,
}

impl DocumentParser {
    /// Create a parser with default limits
    pub fn new() -> Self {
        Self {
            limits: DocumentLimits::default(),
        }
    }

    /// Create parser with custom limits
    pub fn with_limits(limits: DocumentLimits) -> Self {
        Self { limits }
    }

    /// Parse a JSON document into a machine
    pub fn parse_json(&self, json: &str) -> Result<Machine, DocumentError> {
        let doc: MachineDocument =
            serde_json::from_str(json).map_err(|e| DocumentError::Json(e.to_string()))?;
        self.check_limits(&doc)?;
        doc.into_machine()
    }

    /// Parse a YAML document into a machine
    pub fn parse_yaml(&self, yaml: &str) -> Result<Machine, DocumentError> {
        let doc: MachineDocument =
            serde_yml::from_str(yaml).map_err(|e| DocumentError::Yaml(e.to_string()))?;
        self.check_limits(&doc)?;
        doc.into_machine()
    }

    /// Load a `.json`, `.yaml` or `.yml` document from disk
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Machine, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if is_yaml_path(path) {
            self.parse_yaml(&text)
        } else {
            self.parse_json(&text)
        }
    }

    /// Check document size limits
    pub fn check_limits(&self, doc: &MachineDocument) -> Result<(), DocumentError> {
        let limits = &self.limits;

        if doc.machine.name.len() > limits.max_name_length {
            return Err(DocumentError::Limit(format!(
                "Machine name too long: {} > {}",
                doc.machine.name.len(),
                limits.max_name_length
            )));
        }

        let counts = [
            ("symbols", doc.symbols.len(), limits.max_symbols),
            ("reels", doc.grid.reels as usize, limits.max_reels),
            ("rows", doc.grid.rows as usize, limits.max_rows),
            ("paylines", doc.paylines.len(), limits.max_paylines),
            ("conditions", doc.conditions.len(), limits.max_conditions),
        ];
        for (what, count, max) in counts {
            if count > max {
                return Err(DocumentError::Limit(format!(
                    "Too many {what}: {count} > {max}"
                )));
            }
        }

        if doc.reels.len() != doc.grid.reels as usize {
            return Err(DocumentError::InvalidValue(format!(
                "Grid declares {} reels but {} reel definitions were given",
                doc.grid.reels,
                doc.reels.len()
            )));
        }

        if let Some(c) = doc
            .conditions
            .iter()
            .find(|c| !(c.pays.is_finite() && c.pays <= limits.max_pay_factor))
        {
            return Err(DocumentError::Limit(format!(
                "Pay factor {} for '{}' exceeds {}",
                c.pays, c.symbol, limits.max_pay_factor
            )));
        }

        Ok(())
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Machine document structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDocument {
    pub machine: DocMachine,
    pub grid: DocGrid,
    pub symbols: Vec<DocSymbol>,
    /// One list of weights per reel, left to right
    pub reels: Vec<Vec<DocWeight>>,
    #[serde(default)]
    pub paylines: Vec<DocPayline>,
    #[serde(default)]
    pub conditions: Vec<DocCondition>,
}

/// Machine header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMachine {
    pub id: String,
    pub name: String,
    /// Declared RTP in percent
    pub rtp: f64,
    #[serde(default)]
    pub volatility: Option<String>,
    pub min_bet: u64,
    pub max_bet: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocGrid {
    pub reels: u8,
    pub rows: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSymbol {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub multiplier: Option<u32>,
    #[serde(default)]
    pub wild: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocWeight {
    pub symbol: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocPayline {
    #[serde(default)]
    pub id: Option<u32>,
    /// Row index per reel
    pub rows: Vec<u8>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocCondition {
    pub symbol: String,
    pub count: u8,
    /// Bet factor (e.g., 5.0 = 5× bet, 0.5 = half the bet)
    pub pays: f64,
    #[serde(default)]
    pub scatter: bool,
    #[serde(default = "default_true")]
    pub wild: bool,
}

fn default_true() -> bool {
    true
}

impl MachineDocument {
    /// Resolve names and convert to a machine
    pub fn into_machine(self) -> Result<Machine, DocumentError> {
        let symbols = self
            .symbols
            .iter()
            .map(|s| {
                let rarity = match s.rarity.as_deref() {
                    None => Rarity::default(),
                    Some(name) => Rarity::from_name(name).ok_or_else(|| {
                        DocumentError::InvalidValue(format!("Unknown rarity '{name}'"))
                    })?,
                };
                Ok(Symbol {
                    id: s.id,
                    name: s.name.clone(),
                    base_value: s.value,
                    rarity,
                    win_multiplier: s.multiplier,
                    is_wild: s.wild,
                })
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;

        let resolve = |name: &str| {
            symbols
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.id)
                .ok_or_else(|| DocumentError::UnknownSymbol(name.to_string()))
        };

        let reels = self
            .reels
            .iter()
            .enumerate()
            .map(|(index, weights)| {
                let weights = weights
                    .iter()
                    .map(|w| {
                        Ok(ReelWeight {
                            symbol: resolve(&w.symbol)?,
                            weight: w.weight,
                        })
                    })
                    .collect::<Result<Vec<_>, DocumentError>>()?;
                Ok(Reel {
                    index: index as u8,
                    weights,
                })
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;

        let paylines = self
            .paylines
            .iter()
            .enumerate()
            .map(|(index, p)| {
                Payline::from_rows(p.id.unwrap_or(index as u32), &p.rows).with_active(p.active)
            })
            .collect();

        let conditions = self
            .conditions
            .iter()
            .map(|c| {
                let payout = Multiplier::from_factor(c.pays).ok_or_else(|| {
                    DocumentError::InvalidValue(format!("Invalid pay factor {}", c.pays))
                })?;
                Ok(WinCondition {
                    symbol: resolve(&c.symbol)?,
                    count: c.count,
                    payout,
                    on_payline: !c.scatter,
                    allow_wild: c.wild,
                })
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;

        let volatility = match self.machine.volatility.as_deref() {
            None => Volatility::default(),
            Some(name) => Volatility::from_name(name).ok_or_else(|| {
                DocumentError::InvalidValue(format!("Unknown volatility '{name}'"))
            })?,
        };

        Ok(Machine {
            id: self.machine.id,
            name: self.machine.name,
            symbols,
            reels,
            rows: self.grid.rows,
            paylines,
            conditions,
            declared_rtp: self.machine.rtp,
            volatility,
            min_bet: self.machine.min_bet,
            max_bet: self.machine.max_bet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &str = r#"{
        "machine": { "id": "classic", "name": "Classic Sevens", "rtp": 0.5,
                     "volatility": "low", "min_bet": 10, "max_bet": 1000 },
        "grid": { "reels": 3, "rows": 1 },
        "symbols": [
            { "id": 1, "name": "seven", "value": 10, "rarity": "rare" },
            { "id": 2, "name": "cherry", "value": 2 }
        ],
        "reels": [
            [ { "symbol": "seven", "weight": 1 }, { "symbol": "cherry", "weight": 9 } ],
            [ { "symbol": "seven", "weight": 1 }, { "symbol": "cherry", "weight": 9 } ],
            [ { "symbol": "seven", "weight": 1 }, { "symbol": "cherry", "weight": 9 } ]
        ],
        "paylines": [ { "rows": [0, 0, 0] } ],
        "conditions": [ { "symbol": "seven", "count": 3, "pays": 5.0 } ]
    }"#;

    #[test]
    fn test_parse_json() {
        let machine = DocumentParser::new().parse_json(CLASSIC).unwrap();
        assert_eq!(machine.id, "classic");
        assert_eq!(machine.reel_count(), 3);
        assert_eq!(machine.reels[2].weight_of(2), 9);
        assert_eq!(machine.paylines[0].cells, vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(machine.conditions[0].payout, Multiplier::times(5));
        assert!(machine.conditions[0].allow_wild);
        assert_eq!(machine.symbol(1).map(|s| s.rarity), Some(Rarity::Rare));
        assert_eq!(machine.volatility, Volatility::Low);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
machine: { id: y, name: Yaml, rtp: 50.0, min_bet: 1, max_bet: 5 }
grid: { reels: 3, rows: 1 }
symbols:
  - { id: 1, name: bar }
  - { id: 9, name: wild, wild: true }
reels:
  - [ { symbol: bar, weight: 3 }, { symbol: wild, weight: 1 } ]
  - [ { symbol: bar, weight: 3 } ]
  - [ { symbol: bar, weight: 3 } ]
paylines:
  - { id: 4, rows: [0, 0, 0], active: false }
conditions:
  - { symbol: bar, count: 3, pays: 0.5, scatter: true, wild: false }
"#;
        let machine = DocumentParser::new().parse_yaml(yaml).unwrap();
        assert_eq!(machine.paylines[0].id, 4);
        assert!(!machine.paylines[0].active);
        assert!(machine.symbols[1].is_wild);
        let condition = &machine.conditions[0];
        assert!(!condition.on_payline);
        assert!(!condition.allow_wild);
        assert_eq!(condition.payout, Multiplier::from_hundredths(50));
    }

    #[test]
    fn test_unknown_symbol() {
        let json = CLASSIC.replace(r#""symbol": "seven", "count""#, r#""symbol": "bell", "count""#);
        assert!(matches!(
            DocumentParser::new().parse_json(&json),
            Err(DocumentError::UnknownSymbol(name)) if name == "bell"
        ));
    }

    #[test]
    fn test_reel_count_mismatch() {
        let json = CLASSIC.replace(r#""reels": 3"#, r#""reels": 4"#);
        assert!(matches!(
            DocumentParser::new().parse_json(&json),
            Err(DocumentError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_limits() {
        let parser = DocumentParser::with_limits(DocumentLimits {
            max_symbols: 1,
            ..DocumentLimits::default()
        });
        assert!(matches!(parser.parse_json(CLASSIC), Err(DocumentError::Limit(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classic.json");
        std::fs::write(&path, CLASSIC).unwrap();
        let machine = DocumentParser::new().load(&path).unwrap();
        assert_eq!(machine.name, "Classic Sevens");
    }
}
