// Agent-callable actions built on the send pipeline.
// The registry is frozen at construction; name collisions are rejected there.

use crate::confirm::ConfirmConfig;
use crate::error::CoreError;
use crate::models::{FeeTier, SubmissionOutcome, SubmissionResult};
use crate::pipeline::{send_transaction, SendOptions};
use crate::priority_fee::PriorityFeeService;
use crate::rpc_client::RpcClient;
use crate::transaction_signer::WalletConfig;
use crate::tx_builder::encode_transaction_base64;
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

pub type ActionResult = Result<Value, CoreError>;

/// Shared handles every action runs with
#[derive(Clone)]
pub struct ActionContext {
    pub rpc_client: Arc<dyn RpcClient>,
    pub wallet_config: WalletConfig,
    pub fee_service: Option<Arc<dyn PriorityFeeService>>,
    pub confirm_config: ConfirmConfig,
    pub default_fee_tier: FeeTier,
}

impl ActionContext {
    pub fn new(rpc_client: Arc<dyn RpcClient>, wallet_config: WalletConfig) -> Self {
        Self {
            rpc_client,
            wallet_config,
            fee_service: None,
            confirm_config: ConfirmConfig::default(),
            default_fee_tier: FeeTier::default(),
        }
    }

    pub fn with_fee_service(mut self, fee_service: Arc<dyn PriorityFeeService>) -> Self {
        self.fee_service = Some(fee_service);
        self
    }

    pub fn with_confirm_config(mut self, confirm_config: ConfirmConfig) -> Self {
        self.confirm_config = confirm_config;
        self
    }

    pub fn with_default_fee_tier(mut self, tier: FeeTier) -> Self {
        self.default_fee_tier = tier;
        self
    }

    pub async fn send(&self, instructions: &[Instruction], options: &SendOptions) -> SubmissionResult {
        send_transaction(
            self.rpc_client.as_ref(),
            &self.wallet_config,
            self.fee_service.as_deref(),
            instructions,
            options,
            &self.confirm_config,
        )
        .await
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, ctx: &ActionContext, input: Value) -> ActionResult;
}

#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, action: Arc<dyn Action>) -> Result<Self, CoreError> {
        let name = action.name().to_string();
        if self.actions.contains_key(&name) {
            return Err(CoreError::DuplicateAction(name));
        }
        debug!("Registered action {}", name);
        self.actions.insert(name, action);
        Ok(self)
    }

    pub fn build(self) -> ActionRegistry {
        ActionRegistry { actions: self.actions }
    }
}

pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::new()
    }

    /// Registry holding every built-in action
    pub fn with_defaults() -> Result<Self, CoreError> {
        Ok(Self::builder().register(Arc::new(TransferAction))?.build())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    /// Sorted action names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute(&self, name: &str, ctx: &ActionContext, input: Value) -> ActionResult {
        let action = self
            .get(name)
            .ok_or_else(|| CoreError::Action(format!("Unknown action: {}", name)))?;
        info!("Executing action {}", name);
        action.execute(ctx, input).await
    }
}

/// Render a pipeline outcome as action output
pub fn outcome_to_json(outcome: &SubmissionOutcome) -> ActionResult {
    match outcome {
        SubmissionOutcome::Signature(sig) => Ok(json!({ "signature": sig.to_string() })),
        SubmissionOutcome::SignedTransaction(tx) => {
            Ok(json!({ "signed_transaction": encode_transaction_base64(tx)? }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferInput {
    to: String,
    lamports: u64,
    #[serde(default)]
    fee_tier: Option<FeeTier>,
    #[serde(default)]
    sign_only: Option<bool>,
}

/// Native SOL transfer from the wallet's fee payer
pub struct TransferAction;

#[async_trait]
impl Action for TransferAction {
    fn name(&self) -> &str {
        "transfer"
    }

    fn description(&self) -> &str {
        "Transfer lamports from the agent wallet to another account"
    }

    async fn execute(&self, ctx: &ActionContext, input: Value) -> ActionResult {
        let input: TransferInput = serde_json::from_value(input)
            .map_err(|e| CoreError::InvalidInput(format!("transfer input: {}", e)))?;
        let to = Pubkey::from_str(&input.to)
            .map_err(|e| CoreError::InvalidInput(format!("Invalid recipient {}: {}", input.to, e)))?;
        if input.lamports == 0 {
            return Err(CoreError::InvalidInput("lamports must be > 0".to_string()));
        }

        let from = ctx.wallet_config.wallet.public_key();
        #[allow(deprecated)]
        let ix = solana_sdk::system_instruction::transfer(&from, &to, input.lamports);
        let options = SendOptions {
            fee_tier: input.fee_tier.unwrap_or(ctx.default_fee_tier),
            sign_only: input.sign_only,
            co_signers: Vec::new(),
        };

        let outcome = ctx.send(&[ix], &options).await?;
        outcome_to_json(&outcome)
    }
}
