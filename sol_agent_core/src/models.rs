use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use solana_program::instruction::Instruction;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use std::fmt;
use std::str::FromStr;

/// Priority fee tier requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTier {
    Min,
    #[default]
    Mid,
    Max,
}

impl FeeTier {
    /// Position in the sorted local fee samples, in percent (1%, 50%, 95%).
    /// Kept as an integer so the index is an exact floor.
    pub fn sample_percent(self) -> u64 {
        match self {
            FeeTier::Min => 1,
            FeeTier::Mid => 50,
            FeeTier::Max => 95,
        }
    }

    /// Priority level name understood by the external fee estimation API.
    pub fn priority_level(self) -> &'static str {
        match self {
            FeeTier::Min => "Min",
            FeeTier::Mid => "Medium",
            FeeTier::Max => "High",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeeTier::Min => "min",
            FeeTier::Mid => "mid",
            FeeTier::Max => "max",
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(FeeTier::Min),
            "mid" => Ok(FeeTier::Mid),
            "max" => Ok(FeeTier::Max),
            other => Err(CoreError::InvalidInput(format!(
                "Unknown fee tier '{}', expected one of min, mid, max",
                other
            ))),
        }
    }
}

/// Compute budget derived for one exact instruction list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub unit_price_micro_lamports: u64,
    pub limit_instruction: Instruction,
    pub price_instruction: Instruction,
}

/// Blockhash plus the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Relevant part of a simulation response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationOutcome {
    pub units_consumed: Option<u64>,
    pub err: Option<TransactionError>,
    pub logs: Vec<String>,
}

/// A populated entry of a signature status query.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStatusEntry {
    pub slot: u64,
    pub err: Option<TransactionError>,
    pub confirmation_status: Option<String>,
}

/// Broadcast options forwarded to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendConfig {
    pub skip_preflight: bool,
    pub max_retries: Option<usize>,
}

impl SendConfig {
    /// Preflight on, node-side retries off. The confirm loop owns retrying.
    pub const fn loop_owned() -> Self {
        Self {
            skip_preflight: false,
            max_retries: Some(0),
        }
    }
}

impl Default for SendConfig {
    fn default() -> Self {
        Self::loop_owned()
    }
}

/// Successful result of one pipeline call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The transaction landed without error.
    Signature(Signature),
    /// Sign-only mode: the signed transaction, never broadcast.
    SignedTransaction(VersionedTransaction),
}

impl SubmissionOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            SubmissionOutcome::Signature(sig) => Some(sig),
            SubmissionOutcome::SignedTransaction(_) => None,
        }
    }

    pub fn signed_transaction(&self) -> Option<&VersionedTransaction> {
        match self {
            SubmissionOutcome::Signature(_) => None,
            SubmissionOutcome::SignedTransaction(tx) => Some(tx),
        }
    }
}

/// Exactly one of signature, signed transaction, or error per call.
pub type SubmissionResult = Result<SubmissionOutcome, CoreError>;
