//! Configuration management for a Street Empire session

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::catalog::RewardSettings;
use crate::driver::KeyBindings;
use crate::error::{LedgerError, LedgerResult};
use crate::wallet::WalletIdentity;

/// Environment variable naming the config file to load
pub const CONFIG_PATH_ENV: &str = "EMPIRE_CONFIG";

/// Main configuration for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmpireConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub rewards: RewardSettings,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub game: GameConfig,
}

/// Player identity and account storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Player wallet; generated at startup when unset
    pub player_wallet: Option<String>,
    /// Treasury wallet redemptions are paid from; generated when unset
    pub treasury_wallet: Option<String>,
    /// Directory for account files; accounts live in memory when unset
    pub data_dir: Option<PathBuf>,
    /// Balances for a wallet seen for the first time
    pub starting_cash: u64,
    pub starting_tokens: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            player_wallet: None,
            treasury_wallet: None,
            data_dir: None,
            starting_cash: 0,
            starting_tokens: 0,
        }
    }
}

/// Which settlement backend the session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Rpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub backend: BackendKind,
    /// JSON-RPC endpoint, required for the rpc backend
    pub rpc_endpoint: Option<String>,
    /// Bound on each settlement call (milliseconds)
    pub timeout_ms: u64,
    /// How often the HUD balance is refreshed (milliseconds)
    pub balance_refresh_ms: u64,
    /// Artificial delay for the memory backend (milliseconds)
    pub simulated_latency_ms: u64,
    /// Starting balance of every wallet in the memory backend
    pub initial_balance_base_units: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            rpc_endpoint: None,
            timeout_ms: 2_000,
            balance_refresh_ms: 5_000,
            simulated_latency_ms: 0,
            initial_balance_base_units: 1_000_000_000, // 1 display unit
        }
    }
}

impl SettlementConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn balance_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.balance_refresh_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Frames per second
    pub frame_rate: u32,
    pub bindings: KeyBindings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            bindings: KeyBindings::default(),
        }
    }
}

impl GameConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

impl EmpireConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| LedgerError::Configuration {
            message: format!("Failed to read config file: {}", e),
            field: "config_file".to_string(),
        })?;

        let config: EmpireConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `EMPIRE_CONFIG`, or fall back to development defaults
    pub fn load_from_env() -> LedgerResult<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::development()),
        }
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> LedgerResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| LedgerError::Configuration {
            message: format!("Failed to serialize config: {}", e),
            field: "config_serialization".to_string(),
        })?;

        fs::write(path, content).map_err(|e| LedgerError::Configuration {
            message: format!("Failed to write config file: {}", e),
            field: "config_write".to_string(),
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> LedgerResult<()> {
        // Wallet identities must parse when given
        for (field, value) in [
            ("session.player_wallet", &self.session.player_wallet),
            ("session.treasury_wallet", &self.session.treasury_wallet),
        ] {
            if let Some(value) = value {
                WalletIdentity::parse(value).map_err(|_| LedgerError::Configuration {
                    message: format!("Invalid wallet identity {:?}", value),
                    field: field.to_string(),
                })?;
            }
        }

        if self.session.player_wallet.is_some() && self.session.player_wallet == self.session.treasury_wallet {
            return Err(LedgerError::Configuration {
                message: "Player and treasury wallets must differ".to_string(),
                field: "session.treasury_wallet".to_string(),
            });
        }

        if self.settlement.timeout_ms == 0 {
            return Err(LedgerError::Configuration {
                message: "Settlement timeout must be greater than 0".to_string(),
                field: "settlement.timeout_ms".to_string(),
            });
        }

        if self.settlement.balance_refresh_ms == 0 {
            return Err(LedgerError::Configuration {
                message: "Balance refresh interval must be greater than 0".to_string(),
                field: "settlement.balance_refresh_ms".to_string(),
            });
        }

        if self.settlement.backend == BackendKind::Rpc && self.settlement.rpc_endpoint.is_none() {
            return Err(LedgerError::Configuration {
                message: "The rpc backend needs an endpoint".to_string(),
                field: "settlement.rpc_endpoint".to_string(),
            });
        }

        if self.game.frame_rate == 0 || self.game.frame_rate > 240 {
            return Err(LedgerError::Configuration {
                message: "Frame rate must be between 1 and 240".to_string(),
                field: "game.frame_rate".to_string(),
            });
        }

        self.game.bindings.validate()?;

        // Catalog construction checks the reward values themselves
        crate::catalog::RewardCatalog::from_settings(&self.rewards)?;

        Ok(())
    }

    /// Configuration for a deployment against a real settlement endpoint
    pub fn production() -> Self {
        Self {
            session: SessionConfig {
                data_dir: Some(PathBuf::from("data")),
                ..Default::default()
            },
            rewards: RewardSettings::default(),
            settlement: SettlementConfig {
                backend: BackendKind::Rpc,
                rpc_endpoint: Some("http://127.0.0.1:8899".to_string()),
                timeout_ms: 2_000,
                balance_refresh_ms: 10_000, // Spare the endpoint
                ..Default::default()
            },
            game: GameConfig::default(),
        }
    }

    /// Local play against the in-memory backend
    pub fn development() -> Self {
        Self {
            session: SessionConfig::default(),
            rewards: RewardSettings::default(),
            settlement: SettlementConfig {
                backend: BackendKind::Memory,
                simulated_latency_ms: 300, // Makes the pending state visible
                ..Default::default()
            },
            game: GameConfig::default(),
        }
    }
}
