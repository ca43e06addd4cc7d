//! End-to-end command sequences against the in-memory backend

use street_empire::{LedgerError, OperationStatus, WalletIdentity};
use tokio_test::assert_ok;
use crate::mocks::memory_ledger;

#[tokio::test]
async fn test_five_heists_fund_a_redemption() {
    let (mut ledger, backend) = memory_ledger(0);

    for _ in 0..5 {
        assert_ok!(ledger.try_heist());
    }
    assert_eq!(ledger.account().cash_balance, 500);

    assert_ok!(ledger.try_redeem());
    let outcome = ledger.settle_pending().await.unwrap();
    assert!(outcome.is_committed());
    assert!(outcome.signature.as_deref().unwrap().starts_with("SIM-TX-"));
    assert_eq!(ledger.account().cash_balance, 0);

    let transfers = backend.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].request.base_units, 1_000_000);
    assert_eq!(transfers[0].request.from, WalletIdentity::parse("treasury").unwrap());
    assert_eq!(transfers[0].request.to, WalletIdentity::parse("player").unwrap());
    assert_ok!(ledger.reconcile());
}

#[tokio::test]
async fn test_mint_without_enough_cash() {
    let (mut ledger, backend) = memory_ledger(150);

    let err = ledger.try_mint().unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { required: 200, available: 150 }));
    assert_eq!(ledger.account().cash_balance, 150);
    assert!(ledger.pending().is_none());
    assert!(backend.mints().is_empty());
}

#[tokio::test]
async fn test_mint_credits_tokens() {
    let (mut ledger, backend) = memory_ledger(200);

    let ticket = assert_ok!(ledger.try_mint());
    assert_eq!(ticket.status, OperationStatus::AwaitingSettlement);
    // Tokens are credited only on commit
    assert_eq!(ticket.account.token_balance, 0);

    let outcome = ledger.settle_pending().await.unwrap();
    assert_eq!(outcome.status, OperationStatus::Committed);
    assert_eq!(ledger.account().cash_balance, 0);
    assert_eq!(ledger.account().token_balance, 50);
    assert_eq!(backend.tokens_of(&WalletIdentity::parse("player").unwrap()), 50);

    let journal = ledger.journal();
    assert_eq!(journal.mints, 1);
    assert_eq!(journal.receipts.len(), 1);
    assert_ok!(ledger.reconcile());
}

#[tokio::test]
async fn test_balance_query_converts_to_display_units() {
    let (mut ledger, backend) = memory_ledger(0);
    backend.set_balance(&WalletIdentity::parse("player").unwrap(), 1_000_000_000);

    let reading = assert_ok!(ledger.query_balance().await);
    assert_eq!(reading.display, 1.0);
    assert!(!reading.stale);
}

#[tokio::test]
async fn test_redeem_credits_external_wallet() {
    let (mut ledger, backend) = memory_ledger(500);
    let player = WalletIdentity::parse("player").unwrap();

    ledger.try_redeem().unwrap();
    ledger.settle_pending().await.unwrap();

    assert_eq!(backend.balance_of(&player), 1_001_000_000);
    let reading = ledger.query_balance().await.unwrap();
    assert_eq!(reading.base_units, 1_001_000_000);
}
