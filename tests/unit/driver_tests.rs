//! Game loop driver against a scripted display

use std::sync::Arc;
use std::time::Duration;
use street_empire::driver::{DriverError, DriverSettings, GameLoopDriver, InputEvent, LastOperationStatus};
use street_empire::{InMemorySettlement, RuleId};
use crate::mocks::{ledger_over, GatedSettlement, ScriptedDisplay};

fn settings() -> DriverSettings {
    DriverSettings {
        frame_interval: Duration::from_millis(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_events_apply_in_order() {
    let ledger = ledger_over(Arc::new(InMemorySettlement::new()), 400);
    let display = ScriptedDisplay::new(vec![vec![InputEvent::key_down('h'), InputEvent::key_down('r')]]);
    let mut driver = GameLoopDriver::new(ledger, display, settings());

    // Heist first brings cash to 500, so the redeem is accepted
    assert!(driver.tick().unwrap());
    assert_eq!(driver.status(), &LastOperationStatus::Pending { rule: RuleId::Redeem });
    assert_eq!(driver.ledger().account().cash_balance, 0);
}

#[tokio::test]
async fn test_pending_operation_shown_until_resolved() {
    let backend = GatedSettlement::new();
    let ledger = ledger_over(Arc::new(backend.clone()), 200);
    let display = ScriptedDisplay::new(vec![vec![InputEvent::key_down('m')], vec![InputEvent::key_down('m')]]);
    let mut driver = GameLoopDriver::new(ledger, display, settings());

    driver.tick().unwrap();
    let frame = driver.display().last_frame().unwrap();
    assert_eq!(frame.pending, Some(RuleId::Mint));
    assert_eq!(frame.account.cash_balance, 0);

    // Second press while settling is rejected as in progress
    driver.tick().unwrap();
    assert!(matches!(
        driver.status(),
        LastOperationStatus::Failed { rule: RuleId::Mint, message } if message.contains("in progress")
    ));

    backend.release();
    while driver.ledger().pending().is_some() {
        tokio::task::yield_now().await;
        driver.tick().unwrap();
    }
    assert!(matches!(driver.status(), LastOperationStatus::Succeeded { rule: RuleId::Mint, .. }));
    assert_eq!(driver.ledger().account().token_balance, 50);
}

#[tokio::test]
async fn test_render_failure_surfaces_as_display_error() {
    let ledger = ledger_over(Arc::new(InMemorySettlement::new()), 0);
    let mut driver = GameLoopDriver::new(ledger, ScriptedDisplay::failing_render(), settings());
    assert!(matches!(driver.tick(), Err(DriverError::Display(_))));
}

#[tokio::test]
async fn test_hud_lists_bindings() {
    let ledger = ledger_over(Arc::new(InMemorySettlement::new()), 0);
    let mut driver = GameLoopDriver::new(ledger, ScriptedDisplay::default(), settings());
    driver.tick().unwrap();

    let lines = driver.display().last_frame().unwrap().lines();
    assert!(lines.iter().any(|line| line == "[H] Heist (+$100)"));
    assert!(lines.iter().any(|line| line == "Status: Ready"));
}
