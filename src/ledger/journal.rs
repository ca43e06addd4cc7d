//! Session journal of committed economy movements, used for reconciliation

use serde::{Deserialize, Serialize};
use crate::catalog::{RewardCatalog, RuleId};
use crate::error::{LedgerError, LedgerResult};
use super::account::PlayerAccount;
use super::pending::{OperationId, PendingOperation};

/// Proof that an external call settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub operation_id: OperationId,
    pub rule: RuleId,
    pub signature: String,
    pub cash_spent: u64,
    pub tokens_credited: u64,
    pub external_amount: Option<u64>,
    pub settled_at: chrono::DateTime<chrono::Utc>,
}

/// Running totals for the current session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerJournal {
    pub opening_cash: u64,
    pub opening_tokens: u64,
    pub cash_earned: u64,
    pub cash_redeemed: u64,
    pub cash_spent_minting: u64,
    pub tokens_minted: u64,
    pub base_units_received: u64,
    pub heists: u64,
    pub redemptions: u64,
    pub mints: u64,
    pub rollbacks: u64,
    pub receipts: Vec<SettlementReceipt>,
}

impl LedgerJournal {
    pub fn opening(account: &PlayerAccount) -> Self {
        Self {
            opening_cash: account.cash_balance,
            opening_tokens: account.token_balance,
            ..Default::default()
        }
    }

    pub fn record_heist(&mut self, payout: u64) {
        self.heists += 1;
        self.cash_earned = self.cash_earned.saturating_add(payout);
    }

    pub fn record_commit(&mut self, operation: &PendingOperation, signature: String) {
        let tokens = operation.rule.token_credit();
        match operation.rule.id {
            RuleId::Redeem => {
                self.redemptions += 1;
                self.cash_redeemed = self.cash_redeemed.saturating_add(operation.held_cash);
                if let Some(amount) = operation.rule.external_amount() {
                    self.base_units_received = self.base_units_received.saturating_add(amount);
                }
            }
            RuleId::Mint => {
                self.mints += 1;
                self.cash_spent_minting = self.cash_spent_minting.saturating_add(operation.held_cash);
                self.tokens_minted = self.tokens_minted.saturating_add(tokens);
            }
            RuleId::Heist => {}
        }

        self.receipts.push(SettlementReceipt {
            operation_id: operation.id,
            rule: operation.rule.id,
            signature,
            cash_spent: operation.held_cash,
            tokens_credited: tokens,
            external_amount: operation.rule.external_amount(),
            settled_at: chrono::Utc::now(),
        });
    }

    pub fn record_rollback(&mut self) {
        self.rollbacks += 1;
    }

    /// Check the account against the journal's totals
    ///
    /// `held_cash` is the hold of the operation still awaiting settlement, if any.
    pub fn reconcile(&self, account: &PlayerAccount, held_cash: u64, catalog: &RewardCatalog) -> LedgerResult<()> {
        let expected_cash = i128::from(self.opening_cash) + i128::from(self.cash_earned)
            - i128::from(self.cash_redeemed)
            - i128::from(self.cash_spent_minting)
            - i128::from(held_cash);
        if expected_cash != i128::from(account.cash_balance) {
            return Err(LedgerError::Reconciliation {
                message: format!(
                    "Cash balance {} does not match journal total {}",
                    account.cash_balance, expected_cash
                ),
            });
        }

        let expected_tokens = i128::from(self.opening_tokens) + i128::from(self.tokens_minted);
        if expected_tokens != i128::from(account.token_balance) {
            return Err(LedgerError::Reconciliation {
                message: format!(
                    "Token balance {} does not match journal total {}",
                    account.token_balance, expected_tokens
                ),
            });
        }

        let mint = catalog.rule_for(RuleId::Mint)?;
        if Some(self.tokens_minted) != expected_total(self.mints, mint.token_credit())
            || Some(self.cash_spent_minting) != expected_total(self.mints, mint.cash_cost())
        {
            return Err(LedgerError::Reconciliation {
                message: format!(
                    "{} mints produced {} tokens for {} cash",
                    self.mints, self.tokens_minted, self.cash_spent_minting
                ),
            });
        }

        let redeem = catalog.rule_for(RuleId::Redeem)?;
        if Some(self.cash_redeemed) != expected_total(self.redemptions, redeem.cash_cost()) {
            return Err(LedgerError::Reconciliation {
                message: format!(
                    "{} redemptions spent {} cash",
                    self.redemptions, self.cash_redeemed
                ),
            });
        }

        Ok(())
    }
}

/// `count * per_operation`, or `None` when the product does not fit
fn expected_total(count: u64, per_operation: u64) -> Option<u64> {
    count.checked_mul(per_operation)
}
