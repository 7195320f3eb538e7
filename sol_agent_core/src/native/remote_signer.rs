// Remote custodial signer reached over JSON-RPC
//
// Transactions travel as base64 bincode. The reply is decoded into the same
// shape that was sent.

use crate::error::CoreError;
use crate::transaction_signer::{SignerResult, WalletCapability, WalletTransaction};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine};
use log::{debug, info};
use serde_json::{json, Value};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::time::Duration;

pub struct RemoteWallet {
    url: String,
    public_key: Pubkey,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RemoteWallet {
    pub fn new(url: &str, public_key: Pubkey, api_key: Option<String>, timeout: Duration) -> SignerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Signing(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.to_string(),
            public_key,
            api_key,
            client,
        })
    }

    async fn call(&self, method: &str, params: Value) -> SignerResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!("Remote signer {} -> {}", method, self.url);

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CoreError::Signing(format!("Remote signer request failed: {}", e)))?;
        let status = response.status();
        let v: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Signing(format!("Remote signer returned invalid JSON ({}): {}", status, e)))?;

        if let Some(err) = v.get("error") {
            return Err(CoreError::Signing(format!("Remote signer {} error: {}", method, err)));
        }
        v.get("result")
            .cloned()
            .ok_or_else(|| CoreError::Signing(format!("Remote signer {} returned no result", method)))
    }
}

fn encode(transaction: &WalletTransaction) -> SignerResult<String> {
    Ok(Base64Engine.encode(transaction.serialize()?))
}

/// Decode `encoded` using the shape of `original`
fn decode_like(original: &WalletTransaction, encoded: &str) -> SignerResult<WalletTransaction> {
    let bytes = Base64Engine
        .decode(encoded)
        .map_err(|e| CoreError::Signing(format!("Remote signer returned bad base64: {}", e)))?;
    let decoded = match original {
        WalletTransaction::Legacy(_) => bincode::deserialize(&bytes).map(WalletTransaction::Legacy),
        WalletTransaction::Versioned(_) => bincode::deserialize(&bytes).map(WalletTransaction::Versioned),
    };
    decoded.map_err(|e| CoreError::Signing(format!("Remote signer returned undecodable transaction: {}", e)))
}

fn field<'a>(result: &'a Value, name: &str) -> SignerResult<&'a Value> {
    result
        .get(name)
        .ok_or_else(|| CoreError::Signing(format!("Remote signer result missing `{}`", name)))
}

#[async_trait]
impl WalletCapability for RemoteWallet {
    fn public_key(&self) -> Pubkey {
        self.public_key
    }

    async fn sign_transaction(&self, transaction: WalletTransaction) -> SignerResult<WalletTransaction> {
        let params = json!([{ "pubkey": self.public_key.to_string(), "transaction": encode(&transaction)? }]);
        let result = self.call("signTransaction", params).await?;
        let encoded = field(&result, "transaction")?
            .as_str()
            .ok_or_else(|| CoreError::Signing("`transaction` is not a string".to_string()))?;
        decode_like(&transaction, encoded)
    }

    async fn sign_all_transactions(&self, transactions: Vec<WalletTransaction>) -> SignerResult<Vec<WalletTransaction>> {
        let encoded = transactions.iter().map(encode).collect::<SignerResult<Vec<_>>>()?;
        let params = json!([{ "pubkey": self.public_key.to_string(), "transactions": encoded }]);
        let result = self.call("signAllTransactions", params).await?;

        let returned = field(&result, "transactions")?
            .as_array()
            .ok_or_else(|| CoreError::Signing("`transactions` is not an array".to_string()))?;
        if returned.len() != transactions.len() {
            return Err(CoreError::Signing(format!(
                "Remote signer returned {} transactions for {} requested",
                returned.len(),
                transactions.len()
            )));
        }

        transactions
            .iter()
            .zip(returned)
            .map(|(original, value)| {
                let encoded = value
                    .as_str()
                    .ok_or_else(|| CoreError::Signing("Signed transaction is not a string".to_string()))?;
                decode_like(original, encoded)
            })
            .collect()
    }

    async fn sign_and_send_transaction(&self, transaction: WalletTransaction) -> SignerResult<Signature> {
        let params = json!([{ "pubkey": self.public_key.to_string(), "transaction": encode(&transaction)? }]);
        let result = self.call("signAndSendTransaction", params).await?;
        let sig = field(&result, "signature")?
            .as_str()
            .ok_or_else(|| CoreError::Signing("`signature` is not a string".to_string()))?;
        let signature = Signature::from_str(sig)
            .map_err(|e| CoreError::Signing(format!("Remote signer returned bad signature: {}", e)))?;
        info!("Remote signer sent {}", signature);
        Ok(signature)
    }
}
