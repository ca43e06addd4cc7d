//! In-memory settlement backend
//!
//! Stands in for the remote ledger in development and tests. Balances start
//! at a configurable default per wallet, transfers move base units between
//! wallets, and every request is deduplicated on its idempotency key. Failures
//! and latency can be injected to exercise the ledger's rollback path.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use crate::catalog::BASE_UNITS_PER_DISPLAY_UNIT;
use crate::error::SettlementError;
use crate::wallet::WalletIdentity;
use super::{MintRequest, SettlementBackend, SettlementFuture, TransferRequest};

/// A transfer the backend accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub request: TransferRequest,
    pub signature: String,
}

/// A mint the backend accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMint {
    pub request: MintRequest,
    pub signature: String,
}

#[derive(Debug, Default)]
struct FailurePlan {
    transfers: VecDeque<SettlementError>,
    mints: VecDeque<SettlementError>,
    balance_queries: Option<SettlementError>,
}

#[derive(Debug)]
struct MemoryState {
    default_balance: u64,
    balances: HashMap<WalletIdentity, u64>,
    token_balances: HashMap<WalletIdentity, u64>,
    transfers: Vec<RecordedTransfer>,
    mints: Vec<RecordedMint>,
    settled_keys: HashMap<String, String>,
    failures: FailurePlan,
}

impl MemoryState {
    fn balance_of(&self, identity: &WalletIdentity) -> u64 {
        self.balances.get(identity).copied().unwrap_or(self.default_balance)
    }
}

/// Settlement backend that keeps the whole external ledger in memory
#[derive(Debug, Clone)]
pub struct InMemorySettlement {
    state: Arc<Mutex<MemoryState>>,
    latency: Duration,
}

impl Default for InMemorySettlement {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySettlement {
    /// Every wallet starts with one display unit
    pub fn new() -> Self {
        Self::with_default_balance(BASE_UNITS_PER_DISPLAY_UNIT)
    }

    pub fn with_default_balance(default_balance: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                default_balance,
                balances: HashMap::new(),
                token_balances: HashMap::new(),
                transfers: Vec::new(),
                mints: Vec::new(),
                settled_keys: HashMap::new(),
                failures: FailurePlan::default(),
            })),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call by `latency`, simulating a network round trip
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the base-unit balance of a wallet
    pub fn set_balance(&self, identity: &WalletIdentity, base_units: u64) {
        self.lock().balances.insert(identity.clone(), base_units);
    }

    /// Current base-unit balance of a wallet
    pub fn balance_of(&self, identity: &WalletIdentity) -> u64 {
        self.lock().balance_of(identity)
    }

    /// Tokens minted to a wallet so far
    pub fn tokens_of(&self, identity: &WalletIdentity) -> u64 {
        self.lock().token_balances.get(identity).copied().unwrap_or(0)
    }

    /// Fail the next transfer with `error`
    pub fn fail_next_transfer(&self, error: SettlementError) {
        self.lock().failures.transfers.push_back(error);
    }

    /// Fail the next mint with `error`
    pub fn fail_next_mint(&self, error: SettlementError) {
        self.lock().failures.mints.push_back(error);
    }

    /// Fail every balance query with `error` until cleared with `None`
    pub fn fail_balance_queries(&self, error: Option<SettlementError>) {
        self.lock().failures.balance_queries = error;
    }

    pub fn transfers(&self) -> Vec<RecordedTransfer> {
        self.lock().transfers.clone()
    }

    pub fn mints(&self) -> Vec<RecordedMint> {
        self.lock().mints.clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn apply_transfer(&self, request: &TransferRequest) -> Result<String, SettlementError> {
        let mut state = self.lock();

        if let Some(signature) = state.settled_keys.get(&request.idempotency_key) {
            debug!(key = %request.idempotency_key, "Duplicate transfer request, returning prior signature");
            return Ok(signature.clone());
        }

        if let Some(error) = state.failures.transfers.pop_front() {
            return Err(error);
        }

        let from_balance = state.balance_of(&request.from);
        let remaining = from_balance.checked_sub(request.base_units).ok_or_else(|| {
            SettlementError::Transaction {
                message: format!(
                    "Wallet {} holds {} base units, {} requested",
                    request.from, from_balance, request.base_units
                ),
            }
        })?;
        let to_balance = state.balance_of(&request.to);
        let credited = to_balance.checked_add(request.base_units).ok_or_else(|| {
            SettlementError::Transaction {
                message: format!("Wallet {} balance would overflow", request.to),
            }
        })?;

        state.balances.insert(request.from.clone(), remaining);
        state.balances.insert(request.to.clone(), credited);

        let signature = format!("SIM-TX-{}", uuid::Uuid::new_v4().simple());
        state.settled_keys.insert(request.idempotency_key.clone(), signature.clone());
        state.transfers.push(RecordedTransfer {
            request: request.clone(),
            signature: signature.clone(),
        });

        Ok(signature)
    }

    fn apply_mint(&self, request: &MintRequest) -> Result<String, SettlementError> {
        let mut state = self.lock();

        if let Some(signature) = state.settled_keys.get(&request.idempotency_key) {
            debug!(key = %request.idempotency_key, "Duplicate mint request, returning prior reference");
            return Ok(signature.clone());
        }

        if let Some(error) = state.failures.mints.pop_front() {
            return Err(error);
        }

        let entry = state.token_balances.entry(request.to.clone()).or_insert(0);
        *entry = entry.checked_add(request.amount).ok_or_else(|| SettlementError::Mint {
            message: format!("Token supply for {} would overflow", request.to),
        })?;

        let signature = format!("SIM-MINT-{}", uuid::Uuid::new_v4().simple());
        state.settled_keys.insert(request.idempotency_key.clone(), signature.clone());
        state.mints.push(RecordedMint {
            request: request.clone(),
            signature: signature.clone(),
        });

        Ok(signature)
    }
}

impl SettlementBackend for InMemorySettlement {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_balance<'a>(&'a self, identity: &'a WalletIdentity) -> SettlementFuture<'a, u64> {
        Box::pin(async move {
            self.simulate_latency().await;
            let state = self.lock();
            match &state.failures.balance_queries {
                Some(error) => Err(error.clone()),
                None => Ok(state.balance_of(identity)),
            }
        })
    }

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.apply_transfer(request)
        })
    }

    fn mint_asset<'a>(&'a self, request: &'a MintRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.apply_mint(request)
        })
    }
}
