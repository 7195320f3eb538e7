// RPC Client abstraction - the network operations the pipeline consumes

use crate::error::CoreError;
use crate::models::{LatestBlockhash, SendConfig, SignatureStatusEntry, SimulationOutcome};
use async_trait::async_trait;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, CoreError>;

/// Abstract RPC client trait.
///
/// Implementations are shared between concurrent pipeline calls, so they
/// must be `Send + Sync` and keep no per-call state.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Get latest blockhash and its last valid block height
    async fn get_latest_blockhash(&self) -> RpcResult<LatestBlockhash>;

    /// Simulate transaction without broadcasting it.
    /// Signatures are not verified and the blockhash may be replaced by the node.
    async fn simulate_transaction(&self, transaction: &VersionedTransaction) -> RpcResult<SimulationOutcome>;

    /// Recent per-slot prioritization fees, in micro-lamports per compute unit
    async fn get_recent_prioritization_fees(&self) -> RpcResult<Vec<u64>>;

    /// Send transaction
    async fn send_transaction(&self, transaction: &VersionedTransaction, config: SendConfig) -> RpcResult<Signature>;

    /// Status of each signature; `None` when the node has not seen it land
    async fn get_signature_statuses(&self, signatures: &[Signature]) -> RpcResult<Vec<Option<SignatureStatusEntry>>>;
}

/// Status of one signature, flattening the batch response
pub async fn get_signature_status<C: RpcClient + ?Sized>(
    client: &C,
    signature: &Signature,
) -> RpcResult<Option<SignatureStatusEntry>> {
    let statuses = client.get_signature_statuses(std::slice::from_ref(signature)).await?;
    Ok(statuses.into_iter().next().flatten())
}
