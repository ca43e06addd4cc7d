//! Reward catalog: the fixed action to effect mappings

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::{LedgerError, LedgerResult};

/// Base units per whole display unit of the external currency
pub const BASE_UNITS_PER_DISPLAY_UNIT: u64 = 1_000_000_000;

/// Identifier of a reward rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    Heist,
    Redeem,
    Mint,
}

impl RuleId {
    pub const ALL: [RuleId; 3] = [RuleId::Heist, RuleId::Redeem, RuleId::Mint];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Heist => "heist",
            RuleId::Redeem => "redeem",
            RuleId::Mint => "mint",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heist" => Ok(RuleId::Heist),
            "redeem" => Ok(RuleId::Redeem),
            "mint" => Ok(RuleId::Mint),
            _ => Err(LedgerError::UnknownRule(s.to_string())),
        }
    }
}

/// External call a rule requires before it may commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExternalCall {
    /// Treasury pays the player this many base units
    Transfer { base_units: u64 },
    /// Mint this many fungible tokens to the player
    MintAsset { amount: u64 },
}

/// Immutable effect of one player action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRule {
    pub id: RuleId,
    pub cash_delta: i64,
    pub token_delta: i64,
    pub external: Option<ExternalCall>,
}

impl RewardRule {
    pub fn external_transfer_required(&self) -> bool {
        self.external.is_some()
    }

    pub fn external_amount(&self) -> Option<u64> {
        match self.external {
            Some(ExternalCall::Transfer { base_units }) => Some(base_units),
            Some(ExternalCall::MintAsset { amount }) => Some(amount),
            None => None,
        }
    }

    /// Cash that must be available before the rule may run
    pub fn cash_cost(&self) -> u64 {
        if self.cash_delta < 0 {
            self.cash_delta.unsigned_abs()
        } else {
            0
        }
    }

    /// Cash credited by the rule
    pub fn cash_credit(&self) -> u64 {
        if self.cash_delta > 0 {
            self.cash_delta as u64
        } else {
            0
        }
    }

    /// Tokens credited by the rule on commit
    pub fn token_credit(&self) -> u64 {
        if self.token_delta > 0 {
            self.token_delta as u64
        } else {
            0
        }
    }
}

/// Tunable values the catalog is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSettings {
    /// Cash earned per heist
    pub heist_payout: u64,
    /// Cash spent per redemption
    pub redeem_cost: u64,
    /// Base units the treasury transfers per redemption
    pub redeem_transfer_base_units: u64,
    /// Cash spent per mint
    pub mint_cost: u64,
    /// Tokens minted per mint
    pub mint_tokens: u64,
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            heist_payout: 100,
            redeem_cost: 500,
            redeem_transfer_base_units: 1_000_000, // 0.001 display units
            mint_cost: 200,
            mint_tokens: 50,
        }
    }
}

/// Read-only lookup table of reward rules
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    rules: HashMap<RuleId, RewardRule>,
}

impl RewardCatalog {
    /// Build the catalog from explicit rules, rejecting gaps, duplicates and incoherent signs
    pub fn from_rules(rules: Vec<RewardRule>) -> LedgerResult<Self> {
        let mut table = HashMap::new();
        for rule in rules {
            validate_rule(&rule)?;
            let id = rule.id;
            if table.insert(id, rule).is_some() {
                return Err(LedgerError::Configuration {
                    message: format!("Reward rule {} defined more than once", id),
                    field: "rewards".to_string(),
                });
            }
        }

        for id in RuleId::ALL {
            if !table.contains_key(&id) {
                return Err(LedgerError::UnknownRule(id.to_string()));
            }
        }

        Ok(Self { rules: table })
    }

    /// Build the catalog from configured reward settings
    pub fn from_settings(settings: &RewardSettings) -> LedgerResult<Self> {
        let heist_payout = to_delta(settings.heist_payout, "rewards.heist_payout")?;
        let redeem_cost = to_delta(settings.redeem_cost, "rewards.redeem_cost")?;
        let mint_cost = to_delta(settings.mint_cost, "rewards.mint_cost")?;
        let mint_tokens = to_delta(settings.mint_tokens, "rewards.mint_tokens")?;

        Self::from_rules(vec![
            RewardRule {
                id: RuleId::Heist,
                cash_delta: heist_payout,
                token_delta: 0,
                external: None,
            },
            RewardRule {
                id: RuleId::Redeem,
                cash_delta: -redeem_cost,
                token_delta: 0,
                external: Some(ExternalCall::Transfer {
                    base_units: settings.redeem_transfer_base_units,
                }),
            },
            RewardRule {
                id: RuleId::Mint,
                cash_delta: -mint_cost,
                token_delta: mint_tokens,
                external: Some(ExternalCall::MintAsset {
                    amount: settings.mint_tokens,
                }),
            },
        ])
    }

    /// Look up the rule for an action
    pub fn rule_for(&self, id: RuleId) -> LedgerResult<&RewardRule> {
        self.rules
            .get(&id)
            .ok_or_else(|| LedgerError::UnknownRule(id.to_string()))
    }

    /// Look up a rule by its textual name
    pub fn rule_named(&self, name: &str) -> LedgerResult<&RewardRule> {
        self.rule_for(name.parse()?)
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        let settings = RewardSettings::default();
        let heist = settings.heist_payout as i64;
        let redeem = settings.redeem_cost as i64;
        let mint = settings.mint_cost as i64;
        let tokens = settings.mint_tokens as i64;

        let rules = [
            RewardRule { id: RuleId::Heist, cash_delta: heist, token_delta: 0, external: None },
            RewardRule {
                id: RuleId::Redeem,
                cash_delta: -redeem,
                token_delta: 0,
                external: Some(ExternalCall::Transfer { base_units: settings.redeem_transfer_base_units }),
            },
            RewardRule {
                id: RuleId::Mint,
                cash_delta: -mint,
                token_delta: tokens,
                external: Some(ExternalCall::MintAsset { amount: settings.mint_tokens }),
            },
        ];

        Self {
            rules: rules.into_iter().map(|rule| (rule.id, rule)).collect(),
        }
    }
}

fn to_delta(value: u64, field: &str) -> LedgerResult<i64> {
    i64::try_from(value).map_err(|_| LedgerError::Configuration {
        message: format!("Value {} does not fit a signed delta", value),
        field: field.to_string(),
    })
}

fn validate_rule(rule: &RewardRule) -> LedgerResult<()> {
    let field = format!("rewards.{}", rule.id);
    let incoherent = |message: &str| LedgerError::Configuration {
        message: message.to_string(),
        field: field.clone(),
    };

    match rule.id {
        RuleId::Heist => {
            if rule.cash_delta <= 0 {
                return Err(incoherent("Heist must pay out a positive amount of cash"));
            }
            if rule.external.is_some() {
                return Err(incoherent("Heist must not require an external call"));
            }
        }
        RuleId::Redeem => {
            if rule.cash_delta >= 0 {
                return Err(incoherent("Redeem must cost a positive amount of cash"));
            }
            match rule.external {
                Some(ExternalCall::Transfer { base_units }) if base_units > 0 => {}
                _ => return Err(incoherent("Redeem must transfer a positive number of base units")),
            }
        }
        RuleId::Mint => {
            if rule.cash_delta >= 0 {
                return Err(incoherent("Mint must cost a positive amount of cash"));
            }
            if rule.token_delta <= 0 {
                return Err(incoherent("Mint must credit a positive number of tokens"));
            }
            match rule.external {
                Some(ExternalCall::MintAsset { amount }) if amount > 0 => {}
                _ => return Err(incoherent("Mint must mint a positive amount on the backend")),
            }
        }
    }

    if rule.token_delta < 0 {
        return Err(incoherent("Rules may not debit tokens"));
    }

    Ok(())
}

/// Convert base units to display units
pub fn base_units_to_display(base_units: u64) -> f64 {
    base_units as f64 / BASE_UNITS_PER_DISPLAY_UNIT as f64
}
