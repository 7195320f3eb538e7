// Native wallet using an in-process Solana keypair

use crate::error::CoreError;
use crate::models::SendConfig;
use crate::rpc_client::RpcClient;
use crate::transaction_signer::{sign_versioned_slot, SignerResult, WalletCapability, WalletTransaction};
use async_trait::async_trait;
use log::debug;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::sync::Arc;

pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    rpc_client: Option<Arc<dyn RpcClient>>,
    send_config: SendConfig,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self::from_arc(Arc::new(keypair))
    }

    pub fn from_arc(keypair: Arc<Keypair>) -> Self {
        Self {
            keypair,
            rpc_client: None,
            send_config: SendConfig::loop_owned(),
        }
    }

    /// Attach the connection used by `sign_and_send_transaction`
    pub fn with_rpc(mut self, rpc_client: Arc<dyn RpcClient>) -> Self {
        self.rpc_client = Some(rpc_client);
        self
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    fn sign_one(&self, transaction: WalletTransaction) -> SignerResult<WalletTransaction> {
        match transaction {
            WalletTransaction::Legacy(mut tx) => {
                let blockhash = tx.message.recent_blockhash;
                tx.try_partial_sign(&[self.keypair.as_ref()], blockhash)
                    .map_err(|e| CoreError::Signing(format!("Failed to sign legacy transaction: {}", e)))?;
                Ok(WalletTransaction::Legacy(tx))
            }
            WalletTransaction::Versioned(mut tx) => {
                sign_versioned_slot(&mut tx, self.keypair.as_ref())
                    .map_err(|e| CoreError::Signing(format!("Failed to sign versioned transaction: {}", e)))?;
                Ok(WalletTransaction::Versioned(tx))
            }
        }
    }
}

#[async_trait]
impl WalletCapability for KeypairWallet {
    fn public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: WalletTransaction) -> SignerResult<WalletTransaction> {
        self.sign_one(transaction)
    }

    async fn sign_all_transactions(&self, transactions: Vec<WalletTransaction>) -> SignerResult<Vec<WalletTransaction>> {
        transactions.into_iter().map(|tx| self.sign_one(tx)).collect()
    }

    async fn sign_and_send_transaction(&self, transaction: WalletTransaction) -> SignerResult<Signature> {
        let rpc_client = self.rpc_client.as_ref().ok_or_else(|| {
            CoreError::Signing("Keypair wallet has no RPC connection to send with".to_string())
        })?;
        let signed = self.sign_one(transaction)?.into_versioned();
        let signature = rpc_client.send_transaction(&signed, self.send_config).await?;
        debug!("Keypair wallet {} sent {}", self.keypair.pubkey(), signature);
        Ok(signature)
    }
}
