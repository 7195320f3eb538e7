// Scripted doubles for the network seams, shared by unit tests

use crate::error::CoreError;
use crate::models::{FeeTier, LatestBlockhash, SendConfig, SignatureStatusEntry, SimulationOutcome};
use crate::priority_fee::{FeeResult, PriorityFeeService};
use crate::rpc_client::{RpcClient, RpcResult};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockRpcClient {
    pub units_consumed: Option<u64>,
    pub simulate_error: Option<String>,
    pub fees: Vec<u64>,
    pub send_error: Option<String>,
    /// Virtual time each status query takes before answering
    pub status_delay: Option<Duration>,
    statuses: Mutex<VecDeque<Option<SignatureStatusEntry>>>,
    pub blockhash_calls: Mutex<usize>,
    pub simulated: Mutex<Vec<VersionedTransaction>>,
    pub sent: Mutex<Vec<(VersionedTransaction, SendConfig)>>,
    pub status_queries: Mutex<Vec<Signature>>,
    pub fee_queries: Mutex<usize>,
}

impl MockRpcClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(mut self, units: Option<u64>) -> Self {
        self.units_consumed = units;
        self
    }

    pub fn with_fees(mut self, fees: Vec<u64>) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    /// Statuses returned in order; once exhausted every query reports "not landed"
    pub fn with_statuses(self, statuses: Vec<Option<SignatureStatusEntry>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn landed() -> Option<SignatureStatusEntry> {
        Some(SignatureStatusEntry {
            slot: 42,
            err: None,
            confirmation_status: Some("processed".to_string()),
        })
    }

    pub fn failed(err: TransactionError) -> Option<SignatureStatusEntry> {
        Some(SignatureStatusEntry {
            slot: 42,
            err: Some(err),
            confirmation_status: Some("processed".to_string()),
        })
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_queries.lock().unwrap().len()
    }

    pub fn simulate_count(&self) -> usize {
        self.simulated.lock().unwrap().len()
    }
}

#[async_trait]
impl RpcClient for MockRpcClient {
    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash> {
        *self.blockhash_calls.lock().unwrap() += 1;
        Ok(LatestBlockhash {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
        })
    }

    async fn simulate_transaction(&self, transaction: &VersionedTransaction) -> RpcResult<SimulationOutcome> {
        self.simulated.lock().unwrap().push(transaction.clone());
        if let Some(e) = &self.simulate_error {
            return Err(CoreError::Rpc(e.clone()));
        }
        Ok(SimulationOutcome {
            units_consumed: self.units_consumed,
            err: None,
            logs: Vec::new(),
        })
    }

    async fn get_recent_prioritization_fees(&self) -> RpcResult<Vec<u64>> {
        *self.fee_queries.lock().unwrap() += 1;
        Ok(self.fees.clone())
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction, config: SendConfig) -> RpcResult<Signature> {
        if let Some(e) = &self.send_error {
            return Err(CoreError::Rpc(e.clone()));
        }
        self.sent.lock().unwrap().push((transaction.clone(), config));
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn get_signature_statuses(&self, signatures: &[Signature]) -> RpcResult<Vec<Option<SignatureStatusEntry>>> {
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.status_queries.lock().unwrap().extend_from_slice(signatures);
        let next = self.statuses.lock().unwrap().pop_front().flatten();
        Ok(vec![next])
    }
}

pub struct MockFeeService {
    pub estimate: Result<u64, String>,
    pub calls: Mutex<Vec<(String, FeeTier)>>,
}

impl MockFeeService {
    pub fn returning(estimate: u64) -> Self {
        Self { estimate: Ok(estimate), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { estimate: Err(message.to_string()), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl PriorityFeeService for MockFeeService {
    async fn estimate(&self, transaction_base58: &str, tier: FeeTier) -> FeeResult<u64> {
        self.calls.lock().unwrap().push((transaction_base58.to_string(), tier));
        self.estimate.clone().map_err(CoreError::Estimation)
    }
}
