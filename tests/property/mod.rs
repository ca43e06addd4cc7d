pub mod ledger_invariants;
