use anyhow::{Context, Result};
use tracing::{error, info};

use street_empire::config::EmpireConfig;
use street_empire::driver::{GameLoopDriver, TerminalDisplay};
use street_empire::error::logging;
use street_empire::session;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr by default; the HUD owns stdout
    logging::init_from_env().map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = EmpireConfig::load_from_env().context("Failed to load configuration")?;
    let ledger = session::build_ledger(&config).context("Failed to start session")?;

    let account = ledger.account();
    info!(
        wallet = %account.wallet,
        treasury = %ledger.treasury(),
        cash = account.cash_balance,
        tokens = account.token_balance,
        "Street Empire starting"
    );

    let display = TerminalDisplay::new().context("Failed to open terminal")?;
    let driver = GameLoopDriver::new(ledger, display, session::driver_settings(&config));

    let shutdown = driver.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    // The exit carries a settled ledger even when the loop failed
    let exit = driver.run().await;
    let ledger = exit.ledger;

    if let Err(err) = ledger.flush() {
        error!(error = %err, "Failed to flush account on exit");
        return Err(err.into());
    }
    if let Some(err) = exit.error {
        return Err(err.into());
    }
    if let Err(err) = ledger.reconcile() {
        error!(error = %err, "Session totals do not reconcile");
    }

    let account = ledger.account();
    info!(
        wallet = %account.wallet,
        cash = account.cash_balance,
        tokens = account.token_balance,
        "Session ended"
    );

    Ok(())
}
