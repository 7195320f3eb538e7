// Native RPC client implementation wrapping solana_client::RpcClient

use crate::error::CoreError;
use crate::models::{LatestBlockhash, SendConfig, SignatureStatusEntry, SimulationOutcome};
use crate::rpc_client::{RpcClient as RpcClientTrait, RpcResult};
use async_trait::async_trait;
use log::debug;
use solana_client::rpc_client::RpcClient as SolanaRpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::{TransactionStatus, UiTransactionEncoding};
use std::sync::Arc;
use std::time::Duration;

/// Native RPC client wrapping solana_client::RpcClient
pub struct NativeRpcClient {
    client: Arc<SolanaRpcClient>,
}

impl NativeRpcClient {
    /// Create a new native RPC client at `confirmed` commitment
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            client: Arc::new(SolanaRpcClient::new_with_timeout_and_commitment(
                endpoint,
                timeout,
                CommitmentConfig::confirmed(),
            )),
        }
    }

    /// Create from existing Arc<RpcClient>
    pub fn from_arc(client: Arc<SolanaRpcClient>) -> Self {
        Self { client }
    }

    /// Get reference to underlying Solana RPC client
    pub fn inner(&self) -> &Arc<SolanaRpcClient> {
        &self.client
    }
}

fn status_entry(status: TransactionStatus) -> SignatureStatusEntry {
    SignatureStatusEntry {
        slot: status.slot,
        err: status.err,
        confirmation_status: status
            .confirmation_status
            .map(|s| format!("{:?}", s).to_lowercase()),
    }
}

#[async_trait]
impl RpcClientTrait for NativeRpcClient {
    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash> {
        debug!("Native RPC: get_latest_blockhash");

        let client = self.client.clone();
        let (blockhash, last_valid_block_height) = tokio::task::spawn_blocking(move || {
            client.get_latest_blockhash_with_commitment(client.commitment())
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
        .map_err(|e| CoreError::Rpc(format!("get_latest_blockhash failed: {}", e)))?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn simulate_transaction(&self, transaction: &VersionedTransaction) -> RpcResult<SimulationOutcome> {
        debug!("Native RPC: simulate_transaction");

        let tx = transaction.clone();
        let client = self.client.clone();
        let result = tokio::task::spawn_blocking(move || {
            let config = RpcSimulateTransactionConfig {
                sig_verify: false,
                replace_recent_blockhash: true,
                commitment: Some(client.commitment()),
                encoding: Some(UiTransactionEncoding::Base64),
                ..Default::default()
            };
            client.simulate_transaction_with_config(&tx, config)
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
        .map_err(|e| CoreError::Rpc(format!("simulate_transaction failed: {}", e)))?;

        Ok(SimulationOutcome {
            units_consumed: result.value.units_consumed,
            err: result.value.err,
            logs: result.value.logs.unwrap_or_default(),
        })
    }

    async fn get_recent_prioritization_fees(&self) -> RpcResult<Vec<u64>> {
        debug!("Native RPC: get_recent_prioritization_fees");

        let client = self.client.clone();
        let fees = tokio::task::spawn_blocking(move || client.get_recent_prioritization_fees(&[]))
            .await
            .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
            .map_err(|e| CoreError::Rpc(format!("get_recent_prioritization_fees failed: {}", e)))?;

        Ok(fees.into_iter().map(|f| f.prioritization_fee).collect())
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction, config: SendConfig) -> RpcResult<Signature> {
        debug!(
            "Native RPC: send_transaction (skip_preflight={}, max_retries={:?})",
            config.skip_preflight, config.max_retries
        );

        let tx = transaction.clone();
        let client = self.client.clone();
        let signature = tokio::task::spawn_blocking(move || {
            let send_config = RpcSendTransactionConfig {
                skip_preflight: config.skip_preflight,
                preflight_commitment: Some(client.commitment().commitment),
                encoding: Some(UiTransactionEncoding::Base64),
                max_retries: config.max_retries,
                ..Default::default()
            };
            client.send_transaction_with_config(&tx, send_config)
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
        .map_err(|e| CoreError::Rpc(format!("send_transaction failed: {}", e)))?;

        Ok(signature)
    }

    async fn get_signature_statuses(&self, signatures: &[Signature]) -> RpcResult<Vec<Option<SignatureStatusEntry>>> {
        debug!("Native RPC: get_signature_statuses for {} signature(s)", signatures.len());

        let sigs = signatures.to_vec();
        let client = self.client.clone();
        let response = tokio::task::spawn_blocking(move || client.get_signature_statuses(&sigs))
            .await
            .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
            .map_err(|e| CoreError::Rpc(format!("get_signature_statuses failed: {}", e)))?;

        Ok(response
            .value
            .into_iter()
            .map(|status| status.map(status_entry))
            .collect())
    }
}
