//! Bookkeeping for an operation awaiting settlement

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::catalog::{RewardRule, RuleId};
use crate::error::{utils, LedgerError};
use super::account::PlayerAccount;

/// Identifier of a single ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(uuid::Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Validating,
    AwaitingSettlement,
    Committed,
    RolledBack,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Committed | OperationStatus::RolledBack)
    }
}

/// An accepted command whose external effect has not resolved yet
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub id: OperationId,
    pub rule: RewardRule,
    /// Account as it was before the hold was placed
    pub snapshot: PlayerAccount,
    pub status: OperationStatus,
    /// Cash deducted locally while settlement is outstanding
    pub held_cash: u64,
    pub idempotency_key: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl PendingOperation {
    pub fn new(rule: RewardRule, snapshot: PlayerAccount) -> Self {
        let id = OperationId::new();
        let idempotency_key = idempotency_key(&snapshot, id, rule.id);
        Self {
            id,
            rule,
            snapshot,
            status: OperationStatus::Validating,
            held_cash: 0,
            idempotency_key,
            started_at: chrono::Utc::now(),
        }
    }

    /// Record the hold and move to `AwaitingSettlement`
    pub fn hold(&mut self, amount: u64) {
        self.held_cash = amount;
        self.status = OperationStatus::AwaitingSettlement;
    }

    pub fn elapsed_ms(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_milliseconds()
    }
}

fn idempotency_key(snapshot: &PlayerAccount, id: OperationId, rule: RuleId) -> String {
    let material = format!("{}:{}:{}", snapshot.wallet, id, rule);
    utils::sha256_hex(material.as_bytes())
}

/// Result of a command that went through settlement
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub operation_id: OperationId,
    pub rule: RuleId,
    pub status: OperationStatus,
    /// Account after the commit or rollback was applied
    pub account: PlayerAccount,
    pub signature: Option<String>,
    pub error: Option<LedgerError>,
}

impl OperationOutcome {
    pub fn is_committed(&self) -> bool {
        self.status == OperationStatus::Committed
    }

    /// Collapse into the account on commit or the surfaced error on rollback
    pub fn into_result(self) -> Result<PlayerAccount, LedgerError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.account),
        }
    }
}

/// Receipt for a command accepted into settlement
#[derive(Debug, Clone)]
pub struct OperationTicket {
    pub operation_id: OperationId,
    pub rule: RuleId,
    pub status: OperationStatus,
    /// Account with the hold applied
    pub account: PlayerAccount,
}
