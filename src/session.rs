//! Bet -> fall -> resolution state machine
//!
//! One session serves one player. A round is exclusive: the wager is debited
//! before anything else, the round is constructed from the committed seed
//! material, and the ledger is credited exactly once when the settled body
//! is resolved. Cancel mid-fall forfeits the wager.

use log::{debug, info};

use crate::error::GameError;
use crate::ledger::Ledger;
use crate::rng::SeedTriple;
use crate::sim::state::{GameEvent, Round, RoundStatus};
use crate::sim::tick;
use crate::tuning::Tuning;

struct ActiveRound {
    session_id: u64,
    round: Round,
}

pub struct Session<L: Ledger> {
    ledger: L,
    player: String,
    client_seed: String,
    tuning: Tuning,
    active: Option<ActiveRound>,
    accumulator: f32,
}

impl<L: Ledger> Session<L> {
    pub fn new(ledger: L, player: impl Into<String>, client_seed: impl Into<String>) -> Self {
        Self {
            ledger,
            player: player.into(),
            client_seed: client_seed.into(),
            tuning: Tuning::default(),
            active: None,
            accumulator: 0.0,
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance(&self.player)
    }

    pub fn round(&self) -> Option<&Round> {
        self.active.as_ref().map(|a| &a.round)
    }

    /// Debit the wager and construct the round. Rejected while a prior
    /// round is still unresolved. A construction failure refunds the wager
    /// before surfacing the error.
    pub fn place_bet(&mut self, amount: f64) -> Result<&Round, GameError> {
        if let Some(active) = &self.active {
            if active.round.status != RoundStatus::Resolved {
                return Err(GameError::RoundInProgress);
            }
        }
        let receipt = self.ledger.debit_bet(&self.player, amount)?;
        let seed = SeedTriple::new(
            receipt.server_seed.clone(),
            self.client_seed.clone(),
            receipt.nonce,
        );
        let round = match Round::new(seed, amount) {
            Ok(round) => round,
            Err(err) => {
                // Refund: the player never saw a round
                self.ledger.credit_payout(receipt.session_id, amount)?;
                return Err(err);
            }
        };
        debug!(
            "bet {amount:.2} placed by {}: bucket {}, committed {:.2}",
            self.player,
            round.outcome.bucket.as_str(),
            round.committed_payout()
        );
        self.accumulator = 0.0;
        let active = self.active.insert(ActiveRound {
            session_id: receipt.session_id,
            round,
        });
        Ok(&active.round)
    }

    /// Begin the fall of the active round
    pub fn start_fall(&mut self) -> Result<(), GameError> {
        let active = self.active.as_mut().ok_or(GameError::UnknownSession)?;
        active.round.start_fall(self.tuning.death_ticks);
        Ok(())
    }

    /// Advance the active round by one fixed step
    pub fn tick(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let active = self.active.as_mut().ok_or(GameError::UnknownSession)?;
        Ok(tick::tick(&mut active.round, &self.tuning))
    }

    /// Advance by wall time with the substep accumulator
    pub fn advance(&mut self, elapsed: f32) -> Result<Vec<GameEvent>, GameError> {
        let active = self.active.as_mut().ok_or(GameError::UnknownSession)?;
        Ok(tick::advance(
            &mut active.round,
            &self.tuning,
            elapsed,
            &mut self.accumulator,
        ))
    }

    /// Credit the committed payout for a settled round. Idempotent: calling
    /// again returns the same payout without touching the ledger balance.
    pub fn resolve(&mut self) -> Result<f64, GameError> {
        let active = self.active.as_mut().ok_or(GameError::UnknownSession)?;
        match active.round.status {
            RoundStatus::Landed => {
                let payout = active.round.committed_payout();
                let credited = self.ledger.credit_payout(active.session_id, payout)?;
                active.round.status = RoundStatus::Resolved;
                info!("round resolved: payout {credited:.2}");
                Ok(credited)
            }
            RoundStatus::Resolved => self.ledger.credit_payout(active.session_id, 0.0),
            _ => Err(GameError::RoundInProgress),
        }
    }

    /// Abandon the active round. The wager is forfeit.
    pub fn cancel(&mut self) -> Result<(), GameError> {
        let active = self.active.as_mut().ok_or(GameError::UnknownSession)?;
        self.ledger.cancel(active.session_id)?;
        active.round.status = RoundStatus::Resolved;
        info!("round cancelled by {}", self.player);
        Ok(())
    }
}
