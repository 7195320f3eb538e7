// Fee estimation: compute unit limit from simulation, unit price from either
// an external estimation service or recent network fee samples.

use crate::error::CoreError;
use crate::models::{ComputeBudget, FeeTier};
use crate::rpc_client::RpcClient;
use crate::transaction_signer::{WalletCapability, WalletTransaction};
use async_trait::async_trait;
use log::{debug, info, warn};
use solana_program::instruction::Instruction;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::message::{v0, Message, VersionedMessage};
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, VersionedTransaction};

pub type FeeResult<T> = Result<T, CoreError>;

/// Limit used when simulation reports no consumed units
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;
/// Additive floor on top of the simulated consumption
pub const COMPUTE_UNIT_BUFFER: u64 = 100_000;
/// Limit attached to the draft so simulation is not cut short by the default budget
pub const SIMULATION_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// External priority fee estimation service.
#[async_trait]
pub trait PriorityFeeService: Send + Sync {
    /// Estimated unit price in micro-lamports for a signed, base58-encoded
    /// legacy transaction at the requested tier
    async fn estimate(&self, transaction_base58: &str, tier: FeeTier) -> FeeResult<u64>;
}

/// `ceil(max(consumed + 100_000, consumed * 1.2))`, or 200_000 without a simulation figure.
pub fn compute_unit_limit(units_consumed: Option<u64>) -> u32 {
    let Some(consumed) = units_consumed else {
        return DEFAULT_COMPUTE_UNIT_LIMIT;
    };
    let consumed = u128::from(consumed);
    let with_buffer = consumed + u128::from(COMPUTE_UNIT_BUFFER);
    // ceil(c * 6 / 5) in integers
    let with_margin = (consumed * 6 + 4) / 5;
    u32::try_from(with_buffer.max(with_margin)).unwrap_or(u32::MAX)
}

/// Sort samples ascending and take the one at `floor(len * percent / 100)`.
pub fn select_fee_sample(samples: &[u64], tier: FeeTier) -> FeeResult<u64> {
    if samples.is_empty() {
        return Err(CoreError::Estimation(
            "No recent prioritization fees to select from".to_string(),
        ));
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let index = (sorted.len() as u128 * u128::from(tier.sample_percent()) / 100) as usize;
    Ok(sorted[index])
}

/// Build the compute unit limit and unit price instructions for `instructions`.
///
/// Nothing is broadcast. The blockhash fetched here only anchors the draft
/// used for simulation and fee estimation.
pub async fn estimate_compute_budget(
    rpc_client: &(dyn RpcClient + '_),
    wallet: &(dyn WalletCapability + '_),
    fee_service: Option<&(dyn PriorityFeeService + '_)>,
    instructions: &[Instruction],
    tier: FeeTier,
) -> FeeResult<ComputeBudget> {
    let payer = wallet.public_key();

    let latest = rpc_client
        .get_latest_blockhash()
        .await
        .map_err(|e| CoreError::Estimation(format!("Failed to fetch blockhash for simulation: {}", e)))?;

    let mut draft_instructions = Vec::with_capacity(instructions.len() + 1);
    draft_instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(SIMULATION_COMPUTE_UNIT_LIMIT));
    draft_instructions.extend_from_slice(instructions);

    let draft_message = v0::Message::try_compile(&payer, &draft_instructions, &[], latest.blockhash)
        .map_err(|e| CoreError::Assembly(format!("Failed to compile draft message: {}", e)))?;
    let draft_message = VersionedMessage::V0(draft_message);
    let required = usize::from(draft_message.header().num_required_signatures);
    let draft = VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: draft_message,
    };

    let simulation = rpc_client
        .simulate_transaction(&draft)
        .await
        .map_err(|e| CoreError::Estimation(format!("Simulation failed: {}", e)))?;
    if let Some(err) = &simulation.err {
        // Instructions that only make sense inside a larger flow can fail standalone
        warn!("Draft simulation reported error {:?}; sizing budget from reported units", err);
    }

    let unit_limit = compute_unit_limit(simulation.units_consumed);
    debug!(
        "Simulated {:?} compute units, limit set to {}",
        simulation.units_consumed, unit_limit
    );
    let limit_instruction = ComputeBudgetInstruction::set_compute_unit_limit(unit_limit);

    let unit_price = match fee_service {
        Some(service) => {
            external_unit_price(service, wallet, &limit_instruction, instructions, &latest.blockhash, tier).await?
        }
        None => local_unit_price(rpc_client, tier).await?,
    };
    info!(
        "Compute budget for {} instruction(s): limit={} price={} micro-lamports (tier {})",
        instructions.len(),
        unit_limit,
        unit_price,
        tier
    );

    Ok(ComputeBudget {
        unit_limit,
        unit_price_micro_lamports: unit_price,
        limit_instruction,
        price_instruction: ComputeBudgetInstruction::set_compute_unit_price(unit_price),
    })
}

async fn external_unit_price(
    service: &(dyn PriorityFeeService + '_),
    wallet: &(dyn WalletCapability + '_),
    limit_instruction: &Instruction,
    instructions: &[Instruction],
    blockhash: &solana_sdk::hash::Hash,
    tier: FeeTier,
) -> FeeResult<u64> {
    let mut legacy_instructions = Vec::with_capacity(instructions.len() + 1);
    legacy_instructions.push(limit_instruction.clone());
    legacy_instructions.extend_from_slice(instructions);

    let message = Message::new_with_blockhash(&legacy_instructions, Some(&wallet.public_key()), blockhash);
    // The estimator wants a signed transaction; it is never broadcast
    let signed = wallet
        .sign_transaction(WalletTransaction::Legacy(Transaction::new_unsigned(message)))
        .await?
        .expect_legacy()?;
    let bytes = bincode::serialize(&signed)
        .map_err(|e| CoreError::Estimation(format!("Failed to serialize estimation transaction: {}", e)))?;
    let encoded = bs58::encode(bytes).into_string();

    let estimate = service.estimate(&encoded, tier).await.map_err(|e| match e {
        CoreError::Estimation(_) => e,
        other => CoreError::Estimation(other.to_string()),
    })?;
    debug!("External fee service estimate at {}: {}", tier.priority_level(), estimate);
    Ok(estimate)
}

async fn local_unit_price(rpc_client: &(dyn RpcClient + '_), tier: FeeTier) -> FeeResult<u64> {
    let samples = rpc_client
        .get_recent_prioritization_fees()
        .await
        .map_err(|e| CoreError::Estimation(format!("Failed to fetch recent prioritization fees: {}", e)))?;
    let price = select_fee_sample(&samples, tier)?;
    debug!("Local fee estimate from {} samples at {}: {}", samples.len(), tier, price);
    Ok(price)
}


#[cfg(all(test, feature = "native"))]
mod native_tests {
    use super::*;
    use crate::native::KeypairWallet;
    use crate::test_support::{MockFeeService, MockRpcClient};
    use solana_program::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signer};
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    #[tokio::test]
    async fn external_service_receives_signed_legacy_transaction() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();
        let wallet = KeypairWallet::new(keypair);
        let rpc = MockRpcClient::new().with_units(Some(150_000)).with_fees(vec![1]);
        let service = MockFeeService::returning(4_321);
        #[allow(deprecated)]
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);

        let budget = estimate_compute_budget(&rpc, &wallet, Some(&service), &[ix], FeeTier::Max)
            .await
            .unwrap();

        assert_eq!(budget.unit_price_micro_lamports, 4_321);
        assert_eq!(*rpc.fee_queries.lock().unwrap(), 0);

        let calls = service.calls.lock().unwrap();
        let (encoded, tier) = &calls[0];
        assert_eq!(*tier, FeeTier::Max);
        let bytes = bs58::decode(encoded).into_vec().unwrap();
        let tx: Transaction = bincode::deserialize(&bytes).unwrap();
        assert!(tx.verify().is_ok());
        // limit instruction first, then the caller's transfer
        assert_eq!(tx.message.instructions.len(), 2);
        assert_eq!(rpc.send_count(), 0);
    }
}
