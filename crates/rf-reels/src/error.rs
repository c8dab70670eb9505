//! Error types for the round engine

use thiserror::Error;

use crate::machine::Volatility;
use crate::spin::Spin;
use crate::store::StoreError;
use crate::wallet::WalletError;

/// Publish-time configuration error
///
/// Raised only while validating or compiling a machine. A machine that
/// produced any of these never reaches a spin path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Machine needs at least 3 reels, got {0}")]
    TooFewReels(usize),

    #[error("Machine needs at least 1 row")]
    NoRows,

    #[error("Duplicate symbol id {0}")]
    DuplicateSymbol(u32),

    #[error("Symbol {0} has a zero win multiplier")]
    InvalidWinMultiplier(u32),

    #[error("Reel at position {position} declares index {index}")]
    ReelIndexMismatch { position: usize, index: u8 },

    #[error("Reel {reel} has no weighted symbols (total weight 0)")]
    EmptyReel { reel: u8 },

    #[error("Reel {reel} gives symbol {symbol} a zero weight")]
    ZeroWeight { reel: u8, symbol: u32 },

    #[error("Reel {reel} references unknown symbol {symbol}")]
    UnknownReelSymbol { reel: u8, symbol: u32 },

    #[error("Reel {reel} lists symbol {symbol} more than once")]
    DuplicateReelSymbol { reel: u8, symbol: u32 },

    #[error("Reel {reel} total weight overflows")]
    WeightOverflow { reel: u8 },

    #[error("Duplicate payline id {0}")]
    DuplicatePayline(u32),

    #[error("Payline {payline} has {cells} cells, machine has {reels} reels")]
    PaylineLength { payline: u32, cells: usize, reels: usize },

    #[error("Payline {payline} must visit reels 0..{reels} in order, once each")]
    PaylineReelOrder { payline: u32, reels: usize },

    #[error("Payline {payline} uses row {row}, machine has {rows} rows")]
    PaylineRowOutOfRange { payline: u32, row: u8, rows: u8 },

    #[error("Machine has no active payline")]
    NoActivePayline,

    #[error("Win condition references unknown symbol {0}")]
    UnknownConditionSymbol(u32),

    #[error("Win condition for symbol {symbol} requires {count} cells (allowed 2..={max})")]
    ConditionCount { symbol: u32, count: u8, max: usize },

    #[error("Win condition for symbol {symbol} x{count} pays nothing")]
    ZeroPayout { symbol: u32, count: u8 },

    #[error("Invalid bet limits: min {min}, max {max}")]
    BetLimits { min: u64, max: u64 },

    #[error("Maximum bet {max_bet} can produce a win that overflows")]
    PayoutOverflow { max_bet: u64 },

    #[error("Declared RTP {0} is not a valid percentage")]
    InvalidDeclaredRtp(f64),

    #[error("Declared RTP {declared:.3}% is over {tolerance}pp from exact RTP {exact:.3}%")]
    RtpOutOfTolerance {
        declared: f64,
        exact: f64,
        tolerance: f64,
    },

    #[error("Declared volatility {declared:?} but measured {measured:?} (std dev {std_dev:.3})")]
    VolatilityMismatch {
        declared: Volatility,
        measured: Volatility,
        std_dev: f64,
    },
}

/// Spin-time error
///
/// Every failure of a round surfaces as one of these; none is ever
/// converted into a silent zero-win outcome.
#[derive(Error, Debug)]
pub enum SpinError {
    #[error("Bet {bet} outside machine limits [{min}, {max}]")]
    InvalidBet { bet: u64, min: u64, max: u64 },

    #[error("Insufficient funds: bet {bet}, available {available}")]
    InsufficientFunds { bet: u64, available: u64 },

    #[error("Session {0} already has a spin in flight")]
    SessionBusy(String),

    /// Debit succeeded and the outcome is known, but the win was not credited.
    /// Carries the resolved spin so the player can still be shown the result.
    #[error("Spin {sequence} on session {session_id} resolved but settlement failed: {source}")]
    Settlement {
        session_id: String,
        sequence: u64,
        spin: Box<Spin>,
        #[source]
        source: WalletError,
    },

    #[error("Wallet error: {0}")]
    Wallet(#[source] WalletError),

    #[error(transparent)]
    Machine(#[from] StoreError),
}

impl SpinError {
    /// Expected, user-facing rejections that need no operational follow-up
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidBet { .. } | Self::InsufficientFunds { .. } | Self::SessionBusy(_)
        )
    }

    /// The resolved spin, when the failure happened after resolution
    pub fn spin(&self) -> Option<&Spin> {
        match self {
            Self::Settlement { spin, .. } => Some(spin),
            _ => None,
        }
    }
}
