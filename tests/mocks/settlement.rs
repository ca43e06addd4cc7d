//! Settlement backend whose calls wait until the test releases them

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use street_empire::settlement::{MintRequest, SettlementFuture, TransferRequest};
use street_empire::{InMemorySettlement, SettlementBackend, WalletIdentity};

/// Wraps [`InMemorySettlement`]; transfers and mints block on a gate
#[derive(Debug, Clone)]
pub struct GatedSettlement {
    pub inner: InMemorySettlement,
    gate: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedSettlement {
    pub fn new() -> Self {
        Self {
            inner: InMemorySettlement::new(),
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Let one waiting (or the next) settlement call proceed
    pub fn release(&self) {
        self.gate.notify_one();
    }

    /// Settlement calls that have started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SettlementBackend for GatedSettlement {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn get_balance<'a>(&'a self, identity: &'a WalletIdentity) -> SettlementFuture<'a, u64> {
        self.inner.get_balance(identity)
    }

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.inner.transfer(request).await
        })
    }

    fn mint_asset<'a>(&'a self, request: &'a MintRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.inner.mint_asset(request).await
        })
    }
}
