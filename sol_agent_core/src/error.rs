use solana_sdk::signature::Signature;
use solana_sdk::transaction::TransactionError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Simulation or priority fee lookup failed. Never retried.
    #[error("Fee estimation error: {0}")]
    Estimation(String),

    /// Caller handed over instructions that cannot form a transaction.
    #[error("Transaction assembly error: {0}")]
    Assembly(String),

    /// The transaction landed and the cluster rejected it.
    #[error("Transaction failed on-chain: {0}")]
    Execution(TransactionError),

    /// No terminal status before the confirmation deadline.
    #[error("Transaction {signature} not confirmed after {elapsed:?}")]
    Timeout { signature: Signature, elapsed: Duration },

    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Action error: {0}")]
    Action(String),

    #[error("Action already registered: {0}")]
    DuplicateAction(String),
}

impl CoreError {
    /// True only for failures that happened after the loop had been retrying.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }
}

#[cfg(feature = "native")]
impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}
