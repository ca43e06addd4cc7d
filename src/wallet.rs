//! Opaque wallet identity handles

use std::fmt;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::error::{LedgerError, LedgerResult};

const IDENTITY_PATTERN: &str = r"^[A-Za-z0-9_-]{3,64}$";

static IDENTITY_REGEX: OnceLock<Regex> = OnceLock::new();

fn identity_pattern() -> LedgerResult<&'static Regex> {
    if let Some(pattern) = IDENTITY_REGEX.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(IDENTITY_PATTERN).map_err(|e| LedgerError::Configuration {
        message: format!("Invalid wallet identity pattern: {}", e),
        field: "wallet_identity".to_string(),
    })?;
    Ok(IDENTITY_REGEX.get_or_init(|| pattern))
}

/// External address of a wallet, as understood by the settlement backend
///
/// Identities double as account file names, so only a filename-safe
/// alphabet is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletIdentity(String);

impl WalletIdentity {
    /// Validate and wrap an identity string
    pub fn parse(value: &str) -> LedgerResult<Self> {
        if !identity_pattern()?.is_match(value) {
            return Err(LedgerError::Configuration {
                message: format!("Wallet identity {:?} must be 3-64 characters of [A-Za-z0-9_-]", value),
                field: "wallet_identity".to_string(),
            });
        }

        Ok(Self(value.to_string()))
    }

    /// Generate a fresh session identity with the given prefix
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}_{}", prefix, uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WalletIdentity {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletIdentity> for String {
    fn from(identity: WalletIdentity) -> Self {
        identity.0
    }
}
