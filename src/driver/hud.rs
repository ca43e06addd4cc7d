//! Heads-up display model handed to the display adapter each frame

use std::fmt;
use crate::catalog::RuleId;
use crate::ledger::{BalanceReading, PlayerAccount};

pub const TITLE: &str = "Street Empire";
pub const DISPLAY_UNIT: &str = "SOL";
pub const TOKEN_SYMBOL: &str = "GANG";

/// What happened to the most recent command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastOperationStatus {
    Idle,
    Pending { rule: RuleId },
    Succeeded { rule: RuleId, detail: String },
    Failed { rule: RuleId, message: String },
}

impl fmt::Display for LastOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastOperationStatus::Idle => write!(f, "Ready"),
            LastOperationStatus::Pending { rule } => write!(f, "{}: awaiting settlement...", rule),
            LastOperationStatus::Succeeded { rule, detail } => write!(f, "{}: ok ({})", rule, detail),
            LastOperationStatus::Failed { rule, message } => write!(f, "{}: failed - {}", rule, message),
        }
    }
}

/// Everything the display needs to draw one frame
#[derive(Debug, Clone)]
pub struct HudFrame {
    pub account: PlayerAccount,
    pub balance: Option<BalanceReading>,
    pub pending: Option<RuleId>,
    pub status: LastOperationStatus,
    pub legend: Vec<String>,
}

impl HudFrame {
    pub fn lines(&self) -> Vec<String> {
        let balance = match &self.balance {
            Some(reading) if reading.stale => format!("{:.4} {} (stale)", reading.display, DISPLAY_UNIT),
            Some(reading) => format!("{:.4} {}", reading.display, DISPLAY_UNIT),
            None => "unavailable".to_string(),
        };

        let mut lines = vec![
            TITLE.to_string(),
            String::new(),
            format!("Wallet: {}", self.account.wallet),
            format!("{} Balance: {}", DISPLAY_UNIT, balance),
            format!("Gang Token: {} {}", self.account.token_balance, TOKEN_SYMBOL),
            format!("Cash: ${}", self.account.cash_balance),
            String::new(),
        ];
        lines.extend(self.legend.iter().cloned());
        lines.push(String::new());
        lines.push(format!("Status: {}", self.status));
        if let Some(rule) = self.pending {
            lines.push(format!("Settling {}...", rule));
        }
        lines.push("[Esc] Quit".to_string());
        lines
    }
}
