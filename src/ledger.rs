//! Balance ledger collaborator
//!
//! The session talks to an abstract ledger: debit the wager up front, credit
//! the payout exactly once at resolution, forfeit on cancel. The in-memory
//! implementation backs tests and the demo binary; a service-backed ledger
//! implements the same trait.

use std::collections::HashMap;

use log::{debug, info};
use rand::RngCore;

use crate::error::GameError;

/// Starting balance for a wallet the ledger has never seen
pub const DEFAULT_BALANCE: f64 = 1_000.0;

/// Outcome of a successful debit
#[derive(Debug, Clone, PartialEq)]
pub struct BetReceipt {
    pub session_id: u64,
    /// Per-player nonce consumed by this round
    pub nonce: u64,
    /// Server seed committed for this round
    pub server_seed: String,
    /// Balance after the debit
    pub balance: f64,
}

pub trait Ledger {
    /// Current wallet balance
    fn balance(&self, player: &str) -> f64;

    /// Debit the wager and open a session. Fails without mutating state if
    /// the wallet cannot cover the amount.
    fn debit_bet(&mut self, player: &str, amount: f64) -> Result<BetReceipt, GameError>;

    /// Credit the payout for a session. Idempotent: a second call returns
    /// the recorded payout without crediting again.
    fn credit_payout(&mut self, session_id: u64, amount: f64) -> Result<f64, GameError>;

    /// Abandon a session mid-round. The wager is forfeit, nothing is
    /// credited back.
    fn cancel(&mut self, session_id: u64) -> Result<(), GameError>;
}

#[derive(Debug, Clone)]
struct Wallet {
    balance: f64,
    nonce: u64,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    player: String,
    /// Payout once resolved (cancel records 0.0)
    resolved: Option<f64>,
}

/// Process-local ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    wallets: HashMap<String, Wallet>,
    sessions: HashMap<u64, SessionRecord>,
    next_session: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn wallet_mut(&mut self, player: &str) -> &mut Wallet {
        self.wallets
            .entry(player.to_string())
            .or_insert_with(|| Wallet {
                balance: DEFAULT_BALANCE,
                nonce: 0,
            })
    }

    /// Fresh server-seed entropy for one round
    fn generate_server_seed() -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, player: &str) -> f64 {
        self.wallets
            .get(player)
            .map(|w| w.balance)
            .unwrap_or(DEFAULT_BALANCE)
    }

    fn debit_bet(&mut self, player: &str, amount: f64) -> Result<BetReceipt, GameError> {
        let wallet = self.wallet_mut(player);
        if wallet.balance < amount {
            return Err(GameError::InsufficientBalance {
                balance: wallet.balance,
                wanted: amount,
            });
        }
        wallet.balance -= amount;
        wallet.nonce += 1;
        let nonce = wallet.nonce;
        let balance = wallet.balance;

        self.next_session += 1;
        let session_id = self.next_session;
        self.sessions.insert(
            session_id,
            SessionRecord {
                player: player.to_string(),
                resolved: None,
            },
        );
        debug!("debit {amount:.2} from {player}, session {session_id}, nonce {nonce}");
        Ok(BetReceipt {
            session_id,
            nonce,
            server_seed: Self::generate_server_seed(),
            balance,
        })
    }

    fn credit_payout(&mut self, session_id: u64, amount: f64) -> Result<f64, GameError> {
        let record = self
            .sessions
            .get_mut(&session_id)
            .ok_or(GameError::UnknownSession)?;
        if let Some(already) = record.resolved {
            return Ok(already);
        }
        record.resolved = Some(amount);
        let player = record.player.clone();
        self.wallet_mut(&player).balance += amount;
        info!("session {session_id} resolved: credit {amount:.2} to {player}");
        Ok(amount)
    }

    fn cancel(&mut self, session_id: u64) -> Result<(), GameError> {
        let record = self
            .sessions
            .get_mut(&session_id)
            .ok_or(GameError::UnknownSession)?;
        if record.resolved.is_none() {
            record.resolved = Some(0.0);
            info!("session {session_id} cancelled, wager forfeit");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_wallet_has_default_balance() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.balance("alice"), DEFAULT_BALANCE);
    }

    #[test]
    fn test_debit_then_credit() {
        let mut ledger = InMemoryLedger::new();
        let receipt = ledger.debit_bet("alice", 100.0).unwrap();
        assert_eq!(receipt.balance, 900.0);
        assert_eq!(receipt.nonce, 1);
        assert_eq!(receipt.server_seed.len(), 32);

        ledger.credit_payout(receipt.session_id, 250.0).unwrap();
        assert_eq!(ledger.balance("alice"), 1150.0);
    }

    #[test]
    fn test_insufficient_balance_rejected_without_mutation() {
        let mut ledger = InMemoryLedger::new();
        let err = ledger.debit_bet("bob", 5_000.0).unwrap_err();
        assert!(matches!(err, GameError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance("bob"), DEFAULT_BALANCE);
        // Nonce untouched by the failed debit
        let receipt = ledger.debit_bet("bob", 10.0).unwrap();
        assert_eq!(receipt.nonce, 1);
    }

    #[test]
    fn test_credit_is_idempotent() {
        let mut ledger = InMemoryLedger::new();
        let receipt = ledger.debit_bet("alice", 50.0).unwrap();
        assert_eq!(ledger.credit_payout(receipt.session_id, 75.0).unwrap(), 75.0);
        // Second resolve returns the recorded payout, no double credit
        assert_eq!(ledger.credit_payout(receipt.session_id, 75.0).unwrap(), 75.0);
        assert_eq!(ledger.balance("alice"), 1_025.0);
    }

    #[test]
    fn test_cancel_forfeits_wager() {
        let mut ledger = InMemoryLedger::new();
        let receipt = ledger.debit_bet("alice", 200.0).unwrap();
        ledger.cancel(receipt.session_id).unwrap();
        assert_eq!(ledger.balance("alice"), 800.0);
        // Resolving a cancelled session pays the recorded zero
        assert_eq!(ledger.credit_payout(receipt.session_id, 999.0).unwrap(), 0.0);
        assert_eq!(ledger.balance("alice"), 800.0);
    }

    #[test]
    fn test_unknown_session() {
        let mut ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.credit_payout(42, 1.0).unwrap_err(),
            GameError::UnknownSession
        );
        assert_eq!(ledger.cancel(42).unwrap_err(), GameError::UnknownSession);
    }

    #[test]
    fn test_nonce_increments_per_player() {
        let mut ledger = InMemoryLedger::new();
        assert_eq!(ledger.debit_bet("a", 1.0).unwrap().nonce, 1);
        assert_eq!(ledger.debit_bet("a", 1.0).unwrap().nonce, 2);
        assert_eq!(ledger.debit_bet("b", 1.0).unwrap().nonce, 1);
    }
}
