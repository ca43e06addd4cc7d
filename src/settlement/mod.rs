//! Settlement backends: the external ledger that balances and transfers are settled against
//!
//! The ledger talks to a backend only through [`SettlementBackend`]. Which
//! implementation is used is decided by configuration when the session is
//! assembled, never by probing what happens to be available.

pub mod memory;
pub mod rpc;

pub use memory::InMemorySettlement;
pub use rpc::RpcSettlement;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use serde::{Deserialize, Serialize};
use crate::catalog::ExternalCall;
use crate::error::SettlementError;
use crate::wallet::WalletIdentity;

/// Boxed future returned by settlement backends
pub type SettlementFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SettlementError>> + Send + 'a>>;

/// Treasury to player transfer of base units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: WalletIdentity,
    pub to: WalletIdentity,
    pub base_units: u64,
    pub idempotency_key: String,
}

/// Mint of fungible reward tokens to a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub to: WalletIdentity,
    pub amount: u64,
    pub idempotency_key: String,
}

/// A single request the ledger issues on behalf of a pending operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementCall {
    Transfer(TransferRequest),
    Mint(MintRequest),
}

impl SettlementCall {
    /// Build the request for a rule's external effect
    pub fn for_rule(
        external: ExternalCall,
        treasury: &WalletIdentity,
        player: &WalletIdentity,
        idempotency_key: String,
    ) -> Self {
        match external {
            ExternalCall::Transfer { base_units } => SettlementCall::Transfer(TransferRequest {
                from: treasury.clone(),
                to: player.clone(),
                base_units,
                idempotency_key,
            }),
            ExternalCall::MintAsset { amount } => SettlementCall::Mint(MintRequest {
                to: player.clone(),
                amount,
                idempotency_key,
            }),
        }
    }

    /// Issue the request, returning the backend's signature or reference
    pub async fn execute(&self, backend: &dyn SettlementBackend) -> Result<String, SettlementError> {
        match self {
            SettlementCall::Transfer(request) => backend.transfer(request).await,
            SettlementCall::Mint(request) => backend.mint_asset(request).await,
        }
    }
}

/// Remote ledger the player economy settles against
pub trait SettlementBackend: Send + Sync + Debug {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Balance of a wallet in base units
    fn get_balance<'a>(&'a self, identity: &'a WalletIdentity) -> SettlementFuture<'a, u64>;

    /// Move base units between wallets, returning the transaction signature
    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> SettlementFuture<'a, String>;

    /// Mint reward tokens, returning the mint reference
    fn mint_asset<'a>(&'a self, request: &'a MintRequest) -> SettlementFuture<'a, String>;
}
