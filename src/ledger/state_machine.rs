//! Ledger state machine: the single mutation path for a player's economy
//!
//! Every command validates against the [`RewardCatalog`] and the current
//! balances inside one `&mut self` call, so no other command can observe a
//! half-applied change. Commands with an external effect place a hold on the
//! player's cash, dispatch the settlement call onto a tokio task bounded by a
//! timeout, and return immediately. The task reports back over a channel;
//! [`LedgerStateMachine::drain_completions`] applies the commit or rollback on
//! the owning thread. Worker tasks never touch the account.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use crate::catalog::{RewardCatalog, RewardRule, RuleId};
use crate::error::{ErrorContext, LedgerError, LedgerResult, SettlementError};
use crate::persistence::AccountStore;
use crate::settlement::{SettlementBackend, SettlementCall};
use crate::wallet::WalletIdentity;
use super::account::{BalanceReading, PlayerAccount};
use super::journal::LedgerJournal;
use super::pending::{OperationId, OperationOutcome, OperationStatus, OperationTicket, PendingOperation};

/// Default bound on a single settlement call
pub const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Message from a worker task back to the owning thread
#[derive(Debug)]
enum Completion {
    Settlement {
        operation_id: OperationId,
        result: Result<String, SettlementError>,
    },
    Balance {
        result: Result<u64, SettlementError>,
    },
}

/// Builder for [`LedgerStateMachine`]
#[derive(Debug)]
pub struct LedgerBuilder {
    wallet: WalletIdentity,
    treasury: Option<WalletIdentity>,
    catalog: Arc<RewardCatalog>,
    backend: Option<Arc<dyn SettlementBackend>>,
    store: Option<Arc<dyn AccountStore>>,
    settlement_timeout: Duration,
    initial_cash: u64,
    initial_tokens: u64,
}

impl LedgerBuilder {
    pub fn treasury(mut self, treasury: WalletIdentity) -> Self {
        self.treasury = Some(treasury);
        self
    }

    pub fn catalog(mut self, catalog: Arc<RewardCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn SettlementBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn store(mut self, store: Arc<dyn AccountStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn settlement_timeout(mut self, timeout: Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }

    /// Balances for a wallet the store has never seen
    pub fn initial_balances(mut self, cash: u64, tokens: u64) -> Self {
        self.initial_cash = cash;
        self.initial_tokens = tokens;
        self
    }

    /// Load the account from the store, or create and persist it
    pub fn build(self) -> LedgerResult<LedgerStateMachine> {
        let backend = self.backend.ok_or_else(|| LedgerError::Configuration {
            message: "A settlement backend is required".to_string(),
            field: "settlement.backend".to_string(),
        })?;
        let store = self.store.ok_or_else(|| LedgerError::Configuration {
            message: "An account store is required".to_string(),
            field: "session.data_dir".to_string(),
        })?;
        if self.settlement_timeout.is_zero() {
            return Err(LedgerError::Configuration {
                message: "Settlement timeout must be greater than 0".to_string(),
                field: "settlement.timeout_ms".to_string(),
            });
        }
        let treasury = self.treasury.unwrap_or_else(|| WalletIdentity::generate("treasury"));

        let account = match store.load(&self.wallet)? {
            Some(account) => {
                info!(
                    wallet = %account.wallet,
                    cash = account.cash_balance,
                    tokens = account.token_balance,
                    "Loaded player account"
                );
                account
            }
            None => {
                let account = PlayerAccount::with_balances(self.wallet, self.initial_cash, self.initial_tokens);
                store.save(&account)?;
                info!(wallet = %account.wallet, "Created player account");
                account
            }
        };

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(LedgerStateMachine {
            journal: LedgerJournal::opening(&account),
            account,
            treasury,
            catalog: self.catalog,
            backend,
            store,
            settlement_timeout: self.settlement_timeout,
            pending: None,
            balance: None,
            balance_refresh_in_flight: false,
            completions_tx,
            completions_rx,
        })
    }
}

/// Owner of one player's account and its at-most-one pending operation
#[derive(Debug)]
pub struct LedgerStateMachine {
    account: PlayerAccount,
    treasury: WalletIdentity,
    catalog: Arc<RewardCatalog>,
    backend: Arc<dyn SettlementBackend>,
    store: Arc<dyn AccountStore>,
    settlement_timeout: Duration,
    pending: Option<PendingOperation>,
    journal: LedgerJournal,
    balance: Option<BalanceReading>,
    balance_refresh_in_flight: bool,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl LedgerStateMachine {
    pub fn builder(wallet: WalletIdentity) -> LedgerBuilder {
        LedgerBuilder {
            wallet,
            treasury: None,
            catalog: Arc::new(RewardCatalog::default()),
            backend: None,
            store: None,
            settlement_timeout: DEFAULT_SETTLEMENT_TIMEOUT,
            initial_cash: 0,
            initial_tokens: 0,
        }
    }

    /// Snapshot of the account, including any hold in place
    pub fn account(&self) -> PlayerAccount {
        self.account.clone()
    }

    pub fn treasury(&self) -> &WalletIdentity {
        &self.treasury
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub fn journal(&self) -> &LedgerJournal {
        &self.journal
    }

    /// Latest balance reading, possibly stale
    pub fn balance(&self) -> Option<&BalanceReading> {
        self.balance.as_ref()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Credit the heist payout; needs no settlement and may run while another operation is pending
    pub fn try_heist(&mut self) -> LedgerResult<PlayerAccount> {
        let payout = self.catalog.rule_for(RuleId::Heist)?.cash_credit();

        let mut next = self.account.clone();
        next.cash_balance = next
            .cash_balance
            .checked_add(payout)
            .ok_or_else(|| LedgerError::Overflow { operation: RuleId::Heist.to_string() })?;

        self.store.save(&next)?;
        self.account = next;
        self.journal.record_heist(payout);

        info!(
            wallet = %self.account.wallet,
            payout,
            cash = self.account.cash_balance,
            "Heist succeeded"
        );
        Ok(self.account.clone())
    }

    /// Redeem cash for a treasury transfer
    pub fn try_redeem(&mut self) -> LedgerResult<OperationTicket> {
        self.begin(RuleId::Redeem)
    }

    /// Spend cash to mint reward tokens
    pub fn try_mint(&mut self) -> LedgerResult<OperationTicket> {
        self.begin(RuleId::Mint)
    }

    fn begin(&mut self, id: RuleId) -> LedgerResult<OperationTicket> {
        if let Some(pending) = &self.pending {
            debug!(
                requested = %id,
                pending = %pending.rule.id,
                operation_id = %pending.id,
                "Rejecting command while settlement is outstanding"
            );
            return Err(LedgerError::OperationInProgress {
                operation: pending.rule.id.to_string(),
            });
        }

        let rule = self.catalog.rule_for(id)?.clone();
        let cost = rule.cash_cost();
        if self.account.cash_balance < cost {
            return Err(LedgerError::InsufficientFunds {
                required: cost,
                available: self.account.cash_balance,
            });
        }

        let mut operation = PendingOperation::new(rule, self.account.clone());

        let external = operation.rule.external.ok_or_else(|| LedgerError::Configuration {
            message: format!("Rule {} has no external call to settle", id),
            field: format!("rewards.{}", id),
        })?;

        // The hold is durable before anything leaves the process
        self.apply_hold(cost)?;
        operation.hold(cost);

        let call = SettlementCall::for_rule(
            external,
            &self.treasury,
            &self.account.wallet,
            operation.idempotency_key.clone(),
        );
        self.dispatch(operation.id, call);

        info!(
            operation_id = %operation.id,
            rule = %operation.rule.id,
            held = cost,
            cash = self.account.cash_balance,
            "Funds held, awaiting settlement"
        );

        let ticket = OperationTicket {
            operation_id: operation.id,
            rule: operation.rule.id,
            status: operation.status,
            account: self.account.clone(),
        };
        self.pending = Some(operation);
        Ok(ticket)
    }

    fn apply_hold(&mut self, cost: u64) -> LedgerResult<()> {
        let mut held = self.account.clone();
        // Checked by the caller against the current balance
        held.cash_balance -= cost;
        self.store.save(&held)?;
        self.account = held;
        Ok(())
    }

    fn dispatch(&self, operation_id: OperationId, call: SettlementCall) {
        let backend = Arc::clone(&self.backend);
        let completions = self.completions_tx.clone();
        let timeout = self.settlement_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, call.execute(backend.as_ref())).await {
                Ok(result) => result,
                Err(_) => Err(SettlementError::Timeout {
                    duration_ms: timeout.as_millis() as u64,
                }),
            };
            // The receiver lives as long as the ledger; a dropped ledger has nothing left to update
            let _ = completions.send(Completion::Settlement { operation_id, result });
        });
    }

    /// Apply every completion that has arrived, without blocking
    pub fn drain_completions(&mut self) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            if let Some(outcome) = self.apply_completion(completion) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Wait until the pending operation resolves and return its outcome
    ///
    /// Returns `None` when nothing is pending. Balance completions that arrive
    /// in the meantime are applied as usual.
    pub async fn settle_pending(&mut self) -> Option<OperationOutcome> {
        while self.pending.is_some() {
            let completion = self.completions_rx.recv().await?;
            if let Some(outcome) = self.apply_completion(completion) {
                return Some(outcome);
            }
        }
        None
    }

    fn apply_completion(&mut self, completion: Completion) -> Option<OperationOutcome> {
        match completion {
            Completion::Balance { result } => {
                self.balance_refresh_in_flight = false;
                if let Err(err) = self.apply_balance_result(result) {
                    warn!(error = %err, "Balance refresh failed with no cached value");
                }
                None
            }
            Completion::Settlement { operation_id, result } => {
                let operation = match self.pending.take() {
                    Some(operation) if operation.id == operation_id => operation,
                    other => {
                        self.pending = other;
                        warn!(operation_id = %operation_id, "Ignoring completion for an unknown operation");
                        return None;
                    }
                };

                Some(match result {
                    Ok(signature) => self.commit(operation, signature),
                    Err(cause) => self.rollback(operation, cause),
                })
            }
        }
    }

    fn commit(&mut self, mut operation: PendingOperation, signature: String) -> OperationOutcome {
        let credit = operation.rule.token_credit();
        let mut next = self.account.clone();
        next.token_balance = match next.token_balance.checked_add(credit) {
            Some(tokens) => tokens,
            None => {
                // The backend already minted; keep the maximum and leave the gap to reconciliation
                error!(
                    operation_id = %operation.id,
                    tokens = next.token_balance,
                    credit,
                    "Token credit overflows the account balance"
                );
                u64::MAX
            }
        };

        // The external effect is final; a failed write is retried by the next save
        if let Err(err) = self.store.save(&next) {
            error!(
                operation_id = %operation.id,
                error = %err,
                "Failed to persist committed account"
            );
        }
        self.account = next;
        operation.status = OperationStatus::Committed;
        self.journal.record_commit(&operation, signature.clone());

        info!(
            operation_id = %operation.id,
            rule = %operation.rule.id,
            signature = %signature,
            cash = self.account.cash_balance,
            tokens = self.account.token_balance,
            elapsed_ms = operation.elapsed_ms(),
            "Operation committed"
        );

        OperationOutcome {
            operation_id: operation.id,
            rule: operation.rule.id,
            status: operation.status,
            account: self.account.clone(),
            signature: Some(signature),
            error: None,
        }
    }

    fn rollback(&mut self, mut operation: PendingOperation, cause: SettlementError) -> OperationOutcome {
        // Releasing the hold restores the snapshot unless a heist landed meanwhile
        let mut restored = self.account.clone();
        restored.cash_balance = restored.cash_balance.saturating_add(operation.held_cash);

        if let Err(err) = self.store.save(&restored) {
            error!(
                operation_id = %operation.id,
                error = %err,
                "Failed to persist rolled back account"
            );
        }
        self.account = restored;
        operation.status = OperationStatus::RolledBack;
        self.journal.record_rollback();

        let context = ErrorContext::new("ledger", operation.rule.id.as_str())
            .with_metadata("operation_id", &operation.id.to_string())
            .with_metadata("idempotency_key", &operation.idempotency_key);

        warn!(
            operation_id = %operation.id,
            rule = %operation.rule.id,
            correlation_id = %context.correlation_id,
            cause = %cause,
            cash = self.account.cash_balance,
            "Settlement failed, hold released"
        );

        OperationOutcome {
            operation_id: operation.id,
            rule: operation.rule.id,
            status: operation.status,
            account: self.account.clone(),
            signature: None,
            error: Some(LedgerError::SettlementFailed {
                cause,
                context: Some(context),
            }),
        }
    }

    /// Query the external wallet balance, falling back to the cached reading
    pub async fn query_balance(&mut self) -> LedgerResult<BalanceReading> {
        let timeout = self.settlement_timeout;
        let result = match tokio::time::timeout(timeout, self.backend.get_balance(&self.account.wallet)).await {
            Ok(result) => result,
            Err(_) => Err(SettlementError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            }),
        };
        self.apply_balance_result(result)
    }

    /// Start a background balance query unless one is already running
    ///
    /// The result is applied by the next [`Self::drain_completions`].
    pub fn request_balance_refresh(&mut self) -> bool {
        if self.balance_refresh_in_flight {
            return false;
        }
        self.balance_refresh_in_flight = true;

        let backend = Arc::clone(&self.backend);
        let completions = self.completions_tx.clone();
        let wallet = self.account.wallet.clone();
        let timeout = self.settlement_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, backend.get_balance(&wallet)).await {
                Ok(result) => result,
                Err(_) => Err(SettlementError::Timeout {
                    duration_ms: timeout.as_millis() as u64,
                }),
            };
            let _ = completions.send(Completion::Balance { result });
        });
        true
    }

    fn apply_balance_result(&mut self, result: Result<u64, SettlementError>) -> LedgerResult<BalanceReading> {
        match result {
            Ok(base_units) => {
                let reading = BalanceReading::fresh(base_units);
                debug!(base_units, display = reading.display, "Balance refreshed");
                self.balance = Some(reading.clone());
                Ok(reading)
            }
            Err(cause) => match self.balance.as_mut() {
                Some(cached) => {
                    cached.stale = true;
                    warn!(cause = %cause, base_units = cached.base_units, "Balance query failed, serving cached value");
                    Ok(cached.clone())
                }
                None => Err(LedgerError::Network {
                    source: cause,
                    context: format!("balance query for {}", self.account.wallet),
                }),
            },
        }
    }

    /// Verify the account against the session journal
    pub fn reconcile(&self) -> LedgerResult<()> {
        let held = self.pending.as_ref().map(|op| op.held_cash).unwrap_or(0);
        self.journal.reconcile(&self.account, held, &self.catalog)
    }

    /// Write the current account through to the store
    pub fn flush(&self) -> LedgerResult<()> {
        self.store.save(&self.account)
    }

    /// Rule that a pending operation is settling, if any
    pub fn pending_rule(&self) -> Option<&RewardRule> {
        self.pending.as_ref().map(|op| &op.rule)
    }
}
