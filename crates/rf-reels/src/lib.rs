//! # rf-reels - Slot Round Engine
//!
//! Turns a published machine configuration and a bet into a fair, auditable
//! spin outcome, and drives the bet/settle state machine that ties a player's
//! wallet to exactly one outcome per round.
//!
//! ## Features
//!
//! - **Weighted Stops**: per-reel integer weights, cumulative-table draws
//! - **Payline Evaluation**: left-to-right runs with wild substitution, scatter pays
//! - **Integer Money**: all payouts in minor units, display conversion at the edge
//! - **Publish-time Validation**: exact RTP, measured volatility, structural checks
//! - **Single-flight Sessions**: debit → resolve → credit, never partially applied
//!
//! ## Architecture
//!
//! ```text
//! RoundEngine ── MachineStore (published machines)
//!     │       └─ Wallet (balances, idempotent debit/credit)
//!     v
//! SpinSession (Idle → BetValidated → Debited → Resolved → Settled)
//!     │
//!     ├── WeightedReel::draw × (rows × reels)  →  Grid
//!     ├── PayTable::evaluate                   →  Evaluation
//!     └── payout::aggregate                    →  Spin
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod grid;
pub mod machine;
pub mod money;
pub mod paytable;
pub mod payout;
pub mod reels;
pub mod session;
pub mod simulate;
pub mod spin;
pub mod stops;
pub mod store;
pub mod symbols;
pub mod validate;
pub mod wallet;

pub use config::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use machine::*;
pub use money::*;
pub use paytable::*;
pub use payout::*;
pub use reels::*;
pub use session::*;
pub use simulate::*;
pub use spin::*;
pub use stops::*;
pub use store::*;
pub use symbols::*;
pub use validate::*;
pub use wallet::*;
