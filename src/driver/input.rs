//! Input events and key bindings

use serde::{Deserialize, Serialize};
use crate::catalog::{base_units_to_display, RewardCatalog, RuleId};
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    KeyDown,
    KeyUp,
    /// Window close, or its terminal equivalent
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub key: Key,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn key_down(c: char) -> Self {
        Self { key: Key::Char(c), kind: InputKind::KeyDown }
    }

    pub fn key_up(c: char) -> Self {
        Self { key: Key::Char(c), kind: InputKind::KeyUp }
    }

    pub fn close() -> Self {
        Self { key: Key::Other, kind: InputKind::CloseRequested }
    }
}

/// Keys bound to ledger commands, matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub heist: char,
    pub redeem: char,
    pub mint: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            heist: 'H',
            redeem: 'R',
            mint: 'M',
        }
    }
}

impl KeyBindings {
    /// Command bound to a key-down event, if any
    pub fn action_for(&self, event: &InputEvent) -> Option<RuleId> {
        if event.kind != InputKind::KeyDown {
            return None;
        }
        let Key::Char(c) = event.key else {
            return None;
        };

        RuleId::ALL
            .into_iter()
            .find(|id| self.key_for(*id).eq_ignore_ascii_case(&c))
    }

    pub fn key_for(&self, id: RuleId) -> char {
        match id {
            RuleId::Heist => self.heist,
            RuleId::Redeem => self.redeem,
            RuleId::Mint => self.mint,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        let keys = [self.heist, self.redeem, self.mint];
        for (i, key) in keys.iter().enumerate() {
            if !key.is_ascii_alphanumeric() {
                return Err(LedgerError::Configuration {
                    message: format!("Key binding {:?} must be an ASCII letter or digit", key),
                    field: "game.bindings".to_string(),
                });
            }
            if keys[i + 1..].iter().any(|other| other.eq_ignore_ascii_case(key)) {
                return Err(LedgerError::Configuration {
                    message: format!("Key {:?} is bound to more than one action", key),
                    field: "game.bindings".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Legend lines describing each binding and its effect
    pub fn legend(&self, catalog: &RewardCatalog) -> Vec<String> {
        RuleId::ALL
            .into_iter()
            .filter_map(|id| catalog.rule_for(id).ok())
            .map(|rule| {
                let key = self.key_for(rule.id).to_ascii_uppercase();
                match rule.id {
                    RuleId::Heist => format!("[{}] Heist (+${})", key, rule.cash_credit()),
                    RuleId::Redeem => format!(
                        "[{}] Redeem ${} -> {} {}",
                        key,
                        rule.cash_cost(),
                        base_units_to_display(rule.external_amount().unwrap_or(0)),
                        super::hud::DISPLAY_UNIT
                    ),
                    RuleId::Mint => format!(
                        "[{}] Mint {} {} tokens (${})",
                        key,
                        rule.token_credit(),
                        super::hud::TOKEN_SYMBOL,
                        rule.cash_cost()
                    ),
                }
            })
            .collect()
    }
}
