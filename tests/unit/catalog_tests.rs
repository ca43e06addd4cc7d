//! Reward catalog lookups and validation

use street_empire::catalog::{ExternalCall, RewardRule};
use street_empire::{LedgerError, RewardCatalog, RewardSettings, RuleId};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_default_catalog_values() {
    let catalog = RewardCatalog::default();

    let heist = assert_ok!(catalog.rule_for(RuleId::Heist));
    assert_eq!(heist.cash_credit(), 100);
    assert!(!heist.external_transfer_required());

    let redeem = assert_ok!(catalog.rule_for(RuleId::Redeem));
    assert_eq!(redeem.cash_cost(), 500);
    assert_eq!(redeem.external_amount(), Some(1_000_000));

    let mint = assert_ok!(catalog.rule_for(RuleId::Mint));
    assert_eq!(mint.cash_cost(), 200);
    assert_eq!(mint.token_credit(), 50);
}

#[test]
fn test_unknown_rule_name() {
    let catalog = RewardCatalog::default();
    let err = catalog.rule_named("launder").unwrap_err();
    assert!(matches!(err, LedgerError::UnknownRule(name) if name == "launder"));
    assert_ok!(catalog.rule_named("mint"));
}

#[test]
fn test_catalog_with_missing_rule_is_rejected() {
    let rules = vec![RewardRule {
        id: RuleId::Heist,
        cash_delta: 100,
        token_delta: 0,
        external: None,
    }];
    let err = RewardCatalog::from_rules(rules).unwrap_err();
    assert!(matches!(err, LedgerError::UnknownRule(_)));
}

#[test]
fn test_incoherent_rule_is_rejected() {
    let mut settings = RewardSettings::default();
    settings.redeem_transfer_base_units = 0;
    assert_err!(RewardCatalog::from_settings(&settings));

    let heist_with_transfer = RewardRule {
        id: RuleId::Heist,
        cash_delta: 100,
        token_delta: 0,
        external: Some(ExternalCall::Transfer { base_units: 1 }),
    };
    assert_err!(RewardCatalog::from_rules(vec![heist_with_transfer]));
}

#[test]
fn test_settings_drive_catalog() {
    let settings = RewardSettings {
        heist_payout: 25,
        redeem_cost: 1_000,
        redeem_transfer_base_units: 5_000_000,
        mint_cost: 300,
        mint_tokens: 10,
    };
    let catalog = assert_ok!(RewardCatalog::from_settings(&settings));
    assert_eq!(catalog.rule_for(RuleId::Heist).unwrap().cash_credit(), 25);
    assert_eq!(catalog.rule_for(RuleId::Redeem).unwrap().external_amount(), Some(5_000_000));
    assert_eq!(catalog.rule_for(RuleId::Mint).unwrap().token_credit(), 10);
}
