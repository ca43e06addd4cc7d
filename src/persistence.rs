//! Durable storage of player accounts keyed by wallet identity

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::PlayerAccount;
use crate::wallet::WalletIdentity;

/// Storage the ledger writes through before acknowledging a mutation
pub trait AccountStore: Send + Sync + Debug {
    fn load(&self, wallet: &WalletIdentity) -> LedgerResult<Option<PlayerAccount>>;

    /// Must be durable when it returns `Ok`
    fn save(&self, account: &PlayerAccount) -> LedgerResult<()>;
}

/// One JSON document per wallet under a data directory
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    dir: PathBuf,
}

impl FileAccountStore {
    /// Open the store, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> LedgerResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| LedgerError::Persistence {
            message: format!("Failed to create data directory {}: {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, wallet: &WalletIdentity) -> PathBuf {
        self.dir.join(format!("{}.json", wallet))
    }
}

impl AccountStore for FileAccountStore {
    fn load(&self, wallet: &WalletIdentity) -> LedgerResult<Option<PlayerAccount>> {
        let path = self.path_for(wallet);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LedgerError::Persistence {
                    message: format!("Failed to read {}: {}", path.display(), e),
                })
            }
        };

        let account: PlayerAccount = serde_json::from_str(&content)?;
        if &account.wallet != wallet {
            return Err(LedgerError::Persistence {
                message: format!("{} holds the account of {}", path.display(), account.wallet),
            });
        }
        Ok(Some(account))
    }

    fn save(&self, account: &PlayerAccount) -> LedgerResult<()> {
        let path = self.path_for(&account.wallet);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(account)?;

        // Write, fsync, then rename so a crash never leaves a torn file
        let mut file = File::create(&tmp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path)?;

        debug!(
            wallet = %account.wallet,
            cash = account.cash_balance,
            tokens = account.token_balance,
            "Account persisted"
        );
        Ok(())
    }
}

/// Volatile store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<WalletIdentity, PlayerAccount>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccountStore {
    fn load(&self, wallet: &WalletIdentity) -> LedgerResult<Option<PlayerAccount>> {
        let accounts = self.accounts.lock().map_err(|_| LedgerError::Persistence {
            message: "Account map poisoned".to_string(),
        })?;
        Ok(accounts.get(wallet).cloned())
    }

    fn save(&self, account: &PlayerAccount) -> LedgerResult<()> {
        let mut accounts = self.accounts.lock().map_err(|_| LedgerError::Persistence {
            message: "Account map poisoned".to_string(),
        })?;
        accounts.insert(account.wallet.clone(), account.clone());
        Ok(())
    }
}
