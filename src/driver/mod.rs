//! Frame-driven game loop that turns key presses into ledger commands
//!
//! The driver owns the [`LedgerStateMachine`] and a [`DisplayAdapter`]. Each
//! tick drains settlement completions, polls input in arrival order, and
//! renders a [`HudFrame`]. Ledger errors never leave a tick; they become the
//! status line.

pub mod hud;
pub mod input;
pub mod terminal;

use std::io;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::catalog::RuleId;
use crate::error::LedgerError;
use crate::ledger::{LedgerStateMachine, OperationOutcome};

pub use hud::{HudFrame, LastOperationStatus};
pub use input::{InputEvent, InputKind, Key, KeyBindings};
pub use terminal::TerminalDisplay;

/// Driver-level errors
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Display error: {0}")]
    Display(#[from] io::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Source of input events and sink for rendered frames
pub trait DisplayAdapter {
    /// Events received since the last poll, oldest first
    fn poll_events(&mut self) -> io::Result<Vec<InputEvent>>;

    fn render(&mut self, frame: &HudFrame) -> io::Result<()>;

    fn quit_requested(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub frame_interval: Duration,
    pub balance_refresh_interval: Duration,
    pub bindings: KeyBindings,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_micros(16_667),
            balance_refresh_interval: Duration::from_secs(5),
            bindings: KeyBindings::default(),
        }
    }
}

pub struct GameLoopDriver<D: DisplayAdapter> {
    ledger: LedgerStateMachine,
    display: D,
    settings: DriverSettings,
    legend: Vec<String>,
    shutdown: CancellationToken,
    status: LastOperationStatus,
    last_refresh: Option<Instant>,
    quit: bool,
}

impl<D: DisplayAdapter> GameLoopDriver<D> {
    pub fn new(ledger: LedgerStateMachine, display: D, settings: DriverSettings) -> Self {
        let legend = settings.bindings.legend(ledger.catalog());
        Self {
            ledger,
            display,
            settings,
            legend,
            shutdown: CancellationToken::new(),
            status: LastOperationStatus::Idle,
            last_refresh: None,
            quit: false,
        }
    }

    /// Stop the loop when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn status(&self) -> &LastOperationStatus {
        &self.status
    }

    pub fn ledger(&self) -> &LedgerStateMachine {
        &self.ledger
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run one frame; returns `false` once the player asked to quit
    pub fn tick(&mut self) -> Result<bool, DriverError> {
        for outcome in self.ledger.drain_completions() {
            self.status = status_for_outcome(&outcome);
        }

        let refresh_due = self
            .last_refresh
            .map_or(true, |at| at.elapsed() >= self.settings.balance_refresh_interval);
        if refresh_due && self.ledger.request_balance_refresh() {
            self.last_refresh = Some(Instant::now());
        }

        for event in self.display.poll_events()? {
            if event.kind == InputKind::CloseRequested {
                self.quit = true;
                break;
            }
            if let Some(rule) = self.settings.bindings.action_for(&event) {
                self.handle_command(rule);
            }
        }

        let frame = self.frame();
        self.display.render(&frame)?;

        Ok(!(self.quit || self.display.quit_requested()))
    }

    fn handle_command(&mut self, rule: RuleId) {
        let result = match rule {
            RuleId::Heist => self.ledger.try_heist().map(|account| LastOperationStatus::Succeeded {
                rule,
                detail: format!("cash ${}", account.cash_balance),
            }),
            RuleId::Redeem => self.ledger.try_redeem().map(|ticket| LastOperationStatus::Pending { rule: ticket.rule }),
            RuleId::Mint => self.ledger.try_mint().map(|ticket| LastOperationStatus::Pending { rule: ticket.rule }),
        };

        self.status = match result {
            Ok(status) => status,
            Err(err) => {
                debug!(rule = %rule, kind = err.kind(), error = %err, "Command rejected");
                LastOperationStatus::Failed { rule, message: err.to_string() }
            }
        };
    }

    /// Frame for the current ledger state
    pub fn frame(&self) -> HudFrame {
        HudFrame {
            account: self.ledger.account(),
            balance: self.ledger.balance().cloned(),
            pending: self.ledger.pending_rule().map(|rule| rule.id),
            status: self.status.clone(),
            legend: self.legend.clone(),
        }
    }

    /// Tick at the configured frame rate until quit, shutdown or a display error
    ///
    /// An operation still settling at exit is awaited so the account is
    /// committed or rolled back before the ledger is handed back, on the
    /// error path as well.
    pub async fn run(mut self) -> DriverExit {
        let mut interval = tokio::time::interval(self.settings.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            wallet = %self.ledger.account().wallet,
            backend = self.ledger.backend_name(),
            "Game loop started"
        );

        let shutdown = self.shutdown.clone();
        let mut failure = None;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick() {
                        Ok(true) => {}
                        Ok(false) => {
                            info!("Player quit");
                            break;
                        }
                        Err(err) => {
                            error!(error = %err, "Game loop stopped on error");
                            failure = Some(err);
                            break;
                        }
                    }
                }
            }
        }

        if let Some(outcome) = self.ledger.settle_pending().await {
            if let Some(err) = &outcome.error {
                warn!(rule = %outcome.rule, error = %err, "Pending operation rolled back during shutdown");
            } else {
                info!(rule = %outcome.rule, "Pending operation committed during shutdown");
            }
        }

        DriverExit {
            ledger: self.ledger,
            error: failure,
        }
    }
}

/// Ledger handed back by [`GameLoopDriver::run`], settled, with the error that stopped the loop
#[derive(Debug)]
pub struct DriverExit {
    pub ledger: LedgerStateMachine,
    pub error: Option<DriverError>,
}

impl DriverExit {
    pub fn into_result(self) -> Result<LedgerStateMachine, DriverError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.ledger),
        }
    }
}

fn status_for_outcome(outcome: &OperationOutcome) -> LastOperationStatus {
    match (&outcome.error, &outcome.signature) {
        (Some(err), _) => LastOperationStatus::Failed {
            rule: outcome.rule,
            message: err.to_string(),
        },
        (None, signature) => LastOperationStatus::Succeeded {
            rule: outcome.rule,
            detail: signature.clone().unwrap_or_else(|| "settled".to_string()),
        },
    }
}
