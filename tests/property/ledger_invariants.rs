//! Property-based tests for balance invariants over arbitrary command sequences

use proptest::prelude::*;
use street_empire::{LedgerError, OperationStatus, RuleId, SettlementError};
use crate::mocks::memory_ledger;

/// One step a player (or the network) can take
#[derive(Debug, Clone)]
enum Step {
    Command(RuleId),
    /// The next settlement call fails
    FailNext,
    /// Wait for the pending operation to resolve
    Settle,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Command(RuleId::Heist)),
        2 => Just(Step::Command(RuleId::Redeem)),
        2 => Just(Step::Command(RuleId::Mint)),
        1 => Just(Step::FailNext),
        2 => Just(Step::Settle),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_balances_reconcile_after_any_sequence(
        starting_cash in 0u64..2_000,
        steps in prop::collection::vec(arb_step(), 0..40)
    ) {
        runtime().block_on(async {
            let (mut ledger, backend) = memory_ledger(starting_cash);

            for step in steps {
                match step {
                    Step::Command(RuleId::Heist) => {
                        ledger.try_heist().unwrap();
                    }
                    Step::Command(id) => {
                        let before = ledger.account().cash_balance;
                        let pending = ledger.pending().is_some();
                        let result = if id == RuleId::Redeem { ledger.try_redeem() } else { ledger.try_mint() };
                        match result {
                            Ok(_) => prop_assert!(!pending),
                            Err(LedgerError::OperationInProgress { .. }) => prop_assert!(pending),
                            Err(LedgerError::InsufficientFunds { available, .. }) => {
                                prop_assert_eq!(available, before);
                                prop_assert_eq!(ledger.account().cash_balance, before);
                            }
                            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                        }
                    }
                    Step::FailNext => {
                        let error = SettlementError::Network { message: "injected".to_string() };
                        backend.fail_next_transfer(error.clone());
                        backend.fail_next_mint(error);
                    }
                    Step::Settle => {
                        if let Some(outcome) = ledger.settle_pending().await {
                            prop_assert!(outcome.status.is_terminal());
                            if outcome.status == OperationStatus::RolledBack {
                                prop_assert!(outcome.error.is_some());
                            }
                        }
                    }
                }
                prop_assert!(ledger.reconcile().is_ok());
            }

            ledger.settle_pending().await;
            prop_assert!(ledger.pending().is_none());
            prop_assert!(ledger.reconcile().is_ok());
            Ok(())
        })?;
    }

    #[test]
    fn prop_failed_redeem_restores_exact_cash(starting_cash in 500u64..10_000) {
        runtime().block_on(async {
            let (mut ledger, backend) = memory_ledger(starting_cash);
            backend.fail_next_transfer(SettlementError::Transaction { message: "rejected".to_string() });

            ledger.try_redeem().unwrap();
            let outcome = ledger.settle_pending().await.unwrap();
            prop_assert_eq!(outcome.status, OperationStatus::RolledBack);
            prop_assert_eq!(ledger.account().cash_balance, starting_cash);
            Ok(())
        })?;
    }
}
