// End-to-end send pipeline:
// estimate budget -> assemble -> wallet sign -> (sign-only return | submit/confirm)

use crate::confirm::{send_and_confirm, ConfirmConfig};
use crate::error::CoreError;
use crate::models::{FeeTier, SubmissionOutcome, SubmissionResult};
use crate::priority_fee::{estimate_compute_budget, PriorityFeeService};
use crate::rpc_client::RpcClient;
use crate::transaction_signer::{SignerResult, WalletConfig, WalletTransaction};
use crate::tx_builder::assemble_transaction;
use log::{debug, info};
use solana_program::instruction::Instruction;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;

/// Per-call knobs
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub fee_tier: FeeTier,
    /// Overrides `WalletConfig::sign_only` for this call only
    pub sign_only: Option<bool>,
    /// Extra keypairs some instructions require as signers
    pub co_signers: Vec<Arc<Keypair>>,
}

impl SendOptions {
    pub fn tier(fee_tier: FeeTier) -> Self {
        Self { fee_tier, ..Self::default() }
    }

    pub fn sign_only(mut self, sign_only: bool) -> Self {
        self.sign_only = Some(sign_only);
        self
    }

    pub fn co_signer(mut self, keypair: Arc<Keypair>) -> Self {
        self.co_signers.push(keypair);
        self
    }
}

/// Estimate, assemble, sign and (unless sign-only) submit `instructions`.
pub async fn send_transaction(
    rpc_client: &(dyn RpcClient + '_),
    wallet_config: &WalletConfig,
    fee_service: Option<&(dyn PriorityFeeService + '_)>,
    instructions: &[Instruction],
    options: &SendOptions,
    confirm_config: &ConfirmConfig,
) -> SubmissionResult {
    if instructions.is_empty() {
        return Err(CoreError::Assembly("No instructions to send".to_string()));
    }
    let wallet = wallet_config.wallet.as_ref();

    let budget = estimate_compute_budget(rpc_client, wallet, fee_service, instructions, options.fee_tier).await?;

    // Fresh blockhash: the one used for simulation may be stale by now
    let latest = rpc_client.get_latest_blockhash().await?;
    let co_signers: Vec<&Keypair> = options.co_signers.iter().map(|k| k.as_ref()).collect();
    let unsigned = assemble_transaction(&budget, instructions, &wallet.public_key(), latest.blockhash, &co_signers)?;

    let signed = wallet
        .sign_transaction(WalletTransaction::Versioned(unsigned))
        .await?
        .expect_versioned()?;

    if wallet_config.effective_sign_only(options.sign_only) {
        info!("Sign-only mode: returning signed transaction without broadcast");
        return Ok(SubmissionOutcome::SignedTransaction(signed));
    }

    debug!(
        "Submitting transaction (limit={}, price={} micro-lamports, valid until height {})",
        budget.unit_limit, budget.unit_price_micro_lamports, latest.last_valid_block_height
    );
    let signature = send_and_confirm(rpc_client, &signed, confirm_config).await?;
    Ok(SubmissionOutcome::Signature(signature))
}

/// Sign already assembled transactions in one wallet round trip, preserving order
pub async fn sign_transactions_batch(
    wallet_config: &WalletConfig,
    transactions: Vec<VersionedTransaction>,
) -> SignerResult<Vec<VersionedTransaction>> {
    let count = transactions.len();
    let signed = wallet_config
        .wallet
        .sign_all_transactions(transactions.into_iter().map(WalletTransaction::Versioned).collect())
        .await?;
    if signed.len() != count {
        return Err(CoreError::Signing(format!(
            "Wallet returned {} transactions for {} requested",
            signed.len(),
            count
        )));
    }
    signed.into_iter().map(WalletTransaction::expect_versioned).collect()
}


#[cfg(all(test, feature = "native"))]
mod native_tests {
    use super::*;
    use crate::native::KeypairWallet;
    use crate::test_support::MockRpcClient;
    use crate::transaction_signer::WalletCapability;
    use solana_sdk::pubkey::Pubkey;
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    #[tokio::test(start_paused = true)]
    async fn keypair_wallet_lands_on_third_poll() {
        let wallet = KeypairWallet::new(Keypair::new());
        let payer = wallet.public_key();
        #[allow(deprecated)]
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 10);
        let rpc = MockRpcClient::new()
            .with_units(Some(50_000))
            .with_fees(vec![100, 200, 300])
            .with_statuses(vec![None, None, MockRpcClient::landed()]);
        let config = WalletConfig::new(Arc::new(wallet));

        let outcome = send_transaction(
            &rpc,
            &config,
            None,
            &[ix],
            &SendOptions::default(),
            &ConfirmConfig::default(),
        )
        .await
        .unwrap();

        let sig = *outcome.signature().unwrap();
        let sent = rpc.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].0.signatures[0], sig);
        assert!(sent[0].0.verify_with_results().iter().all(|ok| *ok));
    }
}
