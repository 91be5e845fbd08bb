//! Crate-level error taxonomy
//!
//! Fatal conditions (`InvalidSeed`, `ScriptInconsistency`) abort round
//! creation; ledger conditions are recoverable by the caller.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    /// Malformed seed triple (empty seed string). Aborts round creation.
    InvalidSeed,
    /// Wager exceeds the wallet balance. Rejected before any state mutation.
    InsufficientBalance { balance: f64, wanted: f64 },
    /// A generated script violated its own invariants (non-monotonic
    /// progression or endpoint mismatch). Must never occur in production.
    ScriptInconsistency(String),
    /// Ledger call failed; the round stays in its last good state.
    NetworkFailure(String),
    /// A bet was placed while another round was still active or in flight.
    RoundInProgress,
    /// Resolve/cancel referenced a session the ledger does not know.
    UnknownSession,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidSeed => write!(f, "malformed seed triple"),
            GameError::InsufficientBalance { balance, wanted } => {
                write!(f, "insufficient balance: have {balance:.2}, wanted {wanted:.2}")
            }
            GameError::ScriptInconsistency(why) => write!(f, "script inconsistency: {why}"),
            GameError::NetworkFailure(why) => write!(f, "ledger call failed: {why}"),
            GameError::RoundInProgress => write!(f, "a round is already in progress"),
            GameError::UnknownSession => write!(f, "unknown session"),
        }
    }
}

impl std::error::Error for GameError {}
