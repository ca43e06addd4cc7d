//! Account store that can be told to fail writes

use std::sync::atomic::{AtomicBool, Ordering};
use street_empire::{AccountStore, LedgerError, LedgerResult, MemoryAccountStore, PlayerAccount, WalletIdentity};

#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryAccountStore,
    fail_saves: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl AccountStore for FailingStore {
    fn load(&self, wallet: &WalletIdentity) -> LedgerResult<Option<PlayerAccount>> {
        self.inner.load(wallet)
    }

    fn save(&self, account: &PlayerAccount) -> LedgerResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence {
                message: "disk full".to_string(),
            });
        }
        self.inner.save(account)
    }
}
