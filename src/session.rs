//! Assembles a ledger from configuration

use std::sync::Arc;
use tracing::info;
use crate::catalog::RewardCatalog;
use crate::config::{BackendKind, EmpireConfig};
use crate::driver::DriverSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::LedgerStateMachine;
use crate::persistence::{AccountStore, FileAccountStore, MemoryAccountStore};
use crate::settlement::{InMemorySettlement, RpcSettlement, SettlementBackend};
use crate::wallet::WalletIdentity;

/// Backend chosen by `settlement.backend`
pub fn build_backend(config: &EmpireConfig) -> LedgerResult<Arc<dyn SettlementBackend>> {
    let settlement = &config.settlement;
    match settlement.backend {
        BackendKind::Memory => Ok(Arc::new(
            InMemorySettlement::with_default_balance(settlement.initial_balance_base_units)
                .with_latency(settlement.simulated_latency()),
        )),
        BackendKind::Rpc => {
            let endpoint = settlement.rpc_endpoint.as_deref().ok_or_else(|| LedgerError::Configuration {
                message: "The rpc backend needs an endpoint".to_string(),
                field: "settlement.rpc_endpoint".to_string(),
            })?;
            let backend = RpcSettlement::new(endpoint, settlement.timeout())?;
            info!(endpoint = backend.endpoint(), "Using settlement gateway");
            Ok(Arc::new(backend))
        }
    }
}

/// File store under `session.data_dir`, or an in-memory store when unset
pub fn build_store(config: &EmpireConfig) -> LedgerResult<Arc<dyn AccountStore>> {
    match &config.session.data_dir {
        Some(dir) => Ok(Arc::new(FileAccountStore::open(dir)?)),
        None => Ok(Arc::new(MemoryAccountStore::new())),
    }
}

fn identity(configured: Option<&str>, prefix: &str) -> LedgerResult<WalletIdentity> {
    match configured {
        Some(value) => WalletIdentity::parse(value),
        None => Ok(WalletIdentity::generate(prefix)),
    }
}

/// Build the ledger for the configured player
pub fn build_ledger(config: &EmpireConfig) -> LedgerResult<LedgerStateMachine> {
    config.validate()?;

    let player = identity(config.session.player_wallet.as_deref(), "player")?;
    let treasury = identity(config.session.treasury_wallet.as_deref(), "treasury")?;
    let catalog = Arc::new(RewardCatalog::from_settings(&config.rewards)?);
    let backend = build_backend(config)?;
    let store = build_store(config)?;

    info!(
        player = %player,
        treasury = %treasury,
        backend = backend.name(),
        data_dir = ?config.session.data_dir,
        "Session wallets ready"
    );

    LedgerStateMachine::builder(player)
        .treasury(treasury)
        .catalog(catalog)
        .backend(backend)
        .store(store)
        .settlement_timeout(config.settlement.timeout())
        .initial_balances(config.session.starting_cash, config.session.starting_tokens)
        .build()
}

pub fn driver_settings(config: &EmpireConfig) -> DriverSettings {
    DriverSettings {
        frame_interval: config.game.frame_interval(),
        balance_refresh_interval: config.settlement.balance_refresh_interval(),
        bindings: config.game.bindings.clone(),
    }
}
