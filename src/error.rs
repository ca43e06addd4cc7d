//! Error types for the Street Empire ledger

use thiserror::Error;
use std::collections::HashMap;

/// Main error type for ledger commands and startup
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Insufficient funds: {required} cash required, {available} available")]
    InsufficientFunds {
        required: u64,
        available: u64,
    },

    #[error("Operation in progress: {operation} is awaiting settlement")]
    OperationInProgress {
        operation: String,
    },

    #[error("Settlement failed: {cause}")]
    SettlementFailed {
        cause: SettlementError,
        context: Option<ErrorContext>,
    },

    #[error("Network error: {source}")]
    Network {
        source: SettlementError,
        context: String,
    },

    #[error("Unknown reward rule: {0}")]
    UnknownRule(String),

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: String,
    },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Reconciliation mismatch: {message}")]
    Reconciliation { message: String },

    #[error("Balance overflow while applying {operation}")]
    Overflow { operation: String },
}

impl LedgerError {
    /// Whether the caller may retry the same command later
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::OperationInProgress { .. })
    }

    /// Short label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::OperationInProgress { .. } => "operation_in_progress",
            LedgerError::SettlementFailed { .. } => "settlement_failed",
            LedgerError::Network { .. } => "network",
            LedgerError::UnknownRule(_) => "unknown_rule",
            LedgerError::Configuration { .. } => "configuration",
            LedgerError::Persistence { .. } => "persistence",
            LedgerError::Serialization { .. } => "serialization",
            LedgerError::Reconciliation { .. } => "reconciliation",
            LedgerError::Overflow { .. } => "overflow",
        }
    }
}

/// Failures reported by a settlement backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Network failure: {message}")]
    Network { message: String },

    #[error("Transaction rejected: {message}")]
    Transaction { message: String },

    #[error("Mint rejected: {message}")]
    Mint { message: String },

    #[error("Settlement timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl From<SettlementError> for LedgerError {
    fn from(err: SettlementError) -> Self {
        LedgerError::SettlementFailed {
            cause: err,
            context: None,
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Configuration {
            message: format!("Failed to parse config file: {}", err),
            field: "config_format".to_string(),
        }
    }
}

/// Error context for correlating a failure with the log stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Hashing helpers
pub mod utils {
    use sha2::{Sha256, Digest};

    /// Compute SHA256 hash of input data
    pub fn sha256(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    /// Compute SHA256 hash and return as hex string
    pub fn sha256_hex(data: &[u8]) -> String {
        hex::encode(sha256(data))
    }
}

/// Type alias for the main result type used throughout the library
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Logging configuration and initialization
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    use std::env;

    /// Logging output format
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LogFormat {
        Human,
        Json,
    }

    /// Logging output destination
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LogOutput {
        Stdout,
        Stderr,
    }

    /// Logging configuration
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        pub level: Level,
        pub format: LogFormat,
        pub output: LogOutput,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            // The terminal HUD owns stdout
            Self {
                level: Level::INFO,
                format: LogFormat::Human,
                output: LogOutput::Stderr,
            }
        }
    }

    /// Initialize structured logging with the given configuration
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(config.level.into())
            .from_env_lossy()
            .add_directive("tokio=info".parse()?)
            .add_directive("hyper=info".parse()?)
            .add_directive("reqwest=info".parse()?);

        let registry = tracing_subscriber::registry()
            .with(env_filter);

        match config.format {
            LogFormat::Human => {
                let fmt_layer = fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true);

                match config.output {
                    LogOutput::Stdout => registry.with(fmt_layer.with_writer(std::io::stdout)).try_init()?,
                    LogOutput::Stderr => registry.with(fmt_layer.with_writer(std::io::stderr)).try_init()?,
                }
            }
            LogFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE);

                match config.output {
                    LogOutput::Stdout => registry.with(fmt_layer.with_writer(std::io::stdout)).try_init()?,
                    LogOutput::Stderr => registry.with(fmt_layer.with_writer(std::io::stderr)).try_init()?,
                }
            }
        }

        Ok(())
    }

    /// Read logging configuration from `EMPIRE_LOG_*` environment variables
    pub fn config_from_env() -> LoggingConfig {
        let level = env::var("EMPIRE_LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .parse::<Level>()
            .unwrap_or(Level::INFO);

        let format = match env::var("EMPIRE_LOG_FORMAT").as_ref().map(|s| s.as_str()) {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        let output = match env::var("EMPIRE_LOG_OUTPUT").as_ref().map(|s| s.as_str()) {
            Ok("stdout") => LogOutput::Stdout,
            _ => LogOutput::Stderr,
        };

        LoggingConfig { level, format, output }
    }

    /// Initialize logging with environment-based configuration
    pub fn init_from_env() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        init_logging(config_from_env())
    }
}
