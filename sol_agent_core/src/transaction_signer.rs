// Wallet capability abstraction
// Lets the pipeline sign with an in-process keypair, a remote custodial signer,
// or nothing at all (pass-through) without knowing which one it holds.

use crate::error::CoreError;
use async_trait::async_trait;
use log::debug;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Signature, Signer};
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::sync::Arc;

pub type SignerResult<T> = Result<T, CoreError>;

/// A transaction in either wire shape. Wallets return the shape they were given.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletTransaction {
    Legacy(Transaction),
    Versioned(VersionedTransaction),
}

impl WalletTransaction {
    pub fn signatures(&self) -> &[Signature] {
        match self {
            WalletTransaction::Legacy(tx) => &tx.signatures,
            WalletTransaction::Versioned(tx) => &tx.signatures,
        }
    }

    /// First signature slot, which identifies the transaction once signed by the fee payer
    pub fn first_signature(&self) -> Option<&Signature> {
        self.signatures().first()
    }

    pub fn serialize(&self) -> SignerResult<Vec<u8>> {
        let bytes = match self {
            WalletTransaction::Legacy(tx) => bincode::serialize(tx),
            WalletTransaction::Versioned(tx) => bincode::serialize(tx),
        };
        bytes.map_err(|e| CoreError::Signing(format!("Failed to serialize transaction: {}", e)))
    }

    pub fn into_versioned(self) -> VersionedTransaction {
        match self {
            WalletTransaction::Legacy(tx) => VersionedTransaction::from(tx),
            WalletTransaction::Versioned(tx) => tx,
        }
    }

    /// Unwrap a versioned transaction, rejecting a wallet that changed the shape
    pub fn expect_versioned(self) -> SignerResult<VersionedTransaction> {
        match self {
            WalletTransaction::Versioned(tx) => Ok(tx),
            WalletTransaction::Legacy(_) => Err(CoreError::Signing(
                "Wallet returned a legacy transaction for a versioned request".to_string(),
            )),
        }
    }

    pub fn expect_legacy(self) -> SignerResult<Transaction> {
        match self {
            WalletTransaction::Legacy(tx) => Ok(tx),
            WalletTransaction::Versioned(_) => Err(CoreError::Signing(
                "Wallet returned a versioned transaction for a legacy request".to_string(),
            )),
        }
    }
}

impl From<Transaction> for WalletTransaction {
    fn from(tx: Transaction) -> Self {
        WalletTransaction::Legacy(tx)
    }
}

impl From<VersionedTransaction> for WalletTransaction {
    fn from(tx: VersionedTransaction) -> Self {
        WalletTransaction::Versioned(tx)
    }
}

/// Wallet capability trait
/// Implementations exist for:
/// - Native: in-process keypair (`native::KeypairWallet`)
/// - Native: remote custodial signer over HTTP (`native::RemoteWallet`)
/// - Pass-through: no key material, leaves the payer slot for someone else
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Public key of the fee payer this wallet signs for
    fn public_key(&self) -> Pubkey;

    /// Sign one transaction, touching only signature fields
    async fn sign_transaction(&self, transaction: WalletTransaction) -> SignerResult<WalletTransaction>;

    /// Sign a batch, preserving order
    async fn sign_all_transactions(&self, transactions: Vec<WalletTransaction>) -> SignerResult<Vec<WalletTransaction>>;

    /// Sign and broadcast one transaction
    async fn sign_and_send_transaction(&self, transaction: WalletTransaction) -> SignerResult<Signature>;
}

/// Wallet settings carried through a pipeline call.
/// `sign_only` is the process default; callers may override it per call.
#[derive(Clone)]
pub struct WalletConfig {
    pub wallet: Arc<dyn WalletCapability>,
    pub sign_only: bool,
}

impl WalletConfig {
    pub fn new(wallet: Arc<dyn WalletCapability>) -> Self {
        Self { wallet, sign_only: false }
    }

    pub fn sign_only(mut self, sign_only: bool) -> Self {
        self.sign_only = sign_only;
        self
    }

    /// Per-call override wins over the configured default
    pub fn effective_sign_only(&self, override_flag: Option<bool>) -> bool {
        override_flag.unwrap_or(self.sign_only)
    }
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("public_key", &self.wallet.public_key())
            .field("sign_only", &self.sign_only)
            .finish()
    }
}

/// Fill the signature slot belonging to `signer` in a versioned transaction.
/// Other slots are left untouched so co-signer and payer signatures can be
/// added in any order.
pub fn sign_versioned_slot<S: Signer + ?Sized>(
    transaction: &mut VersionedTransaction,
    signer: &S,
) -> Result<(), String> {
    let pubkey = signer.try_pubkey().map_err(|e| e.to_string())?;
    let required = usize::from(transaction.message.header().num_required_signatures);
    let position = transaction
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or_else(|| format!("{} is not a required signer of this message", pubkey))?;

    if transaction.signatures.len() < required {
        transaction.signatures.resize(required, Signature::default());
    }

    let message_bytes = transaction.message.serialize();
    let signature = signer
        .try_sign_message(&message_bytes)
        .map_err(|e| e.to_string())?;
    transaction.signatures[position] = signature;
    Ok(())
}

/// Wallet without key material. Signing hands the transaction back unchanged,
/// leaving the fee payer slot open for an external approver.
#[derive(Debug, Clone)]
pub struct PassThroughWallet {
    public_key: Pubkey,
}

impl PassThroughWallet {
    pub fn new(public_key: Pubkey) -> Self {
        Self { public_key }
    }
}

#[async_trait]
impl WalletCapability for PassThroughWallet {
    fn public_key(&self) -> Pubkey {
        self.public_key
    }

    async fn sign_transaction(&self, transaction: WalletTransaction) -> SignerResult<WalletTransaction> {
        debug!("Pass-through wallet {} leaving transaction unsigned", self.public_key);
        Ok(transaction)
    }

    async fn sign_all_transactions(&self, transactions: Vec<WalletTransaction>) -> SignerResult<Vec<WalletTransaction>> {
        Ok(transactions)
    }

    async fn sign_and_send_transaction(&self, _transaction: WalletTransaction) -> SignerResult<Signature> {
        Err(CoreError::Signing(
            "Pass-through wallet cannot broadcast; the fee payer signature is missing".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{v0, VersionedMessage};
    use solana_sdk::signature::Keypair;
    use solana_sdk::system_instruction;

    fn two_signer_tx(payer: &Keypair, other: &Keypair) -> VersionedTransaction {
        let ix = system_instruction::transfer(&other.pubkey(), &payer.pubkey(), 5);
        let message = v0::Message::try_compile(&payer.pubkey(), &[ix], &[], Hash::new_unique()).unwrap();
        let message = VersionedMessage::V0(message);
        let required = usize::from(message.header().num_required_signatures);
        VersionedTransaction {
            signatures: vec![Signature::default(); required],
            message,
        }
    }

    #[test]
    fn slot_signing_leaves_other_slots_open() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let mut tx = two_signer_tx(&payer, &other);

        sign_versioned_slot(&mut tx, &other).unwrap();

        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.signatures[0], Signature::default());
        assert_ne!(tx.signatures[1], Signature::default());

        sign_versioned_slot(&mut tx, &payer).unwrap();
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn slot_signing_rejects_unrelated_key() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let stranger = Keypair::new();
        let mut tx = two_signer_tx(&payer, &other);

        let err = sign_versioned_slot(&mut tx, &stranger).unwrap_err();
        assert!(err.contains("not a required signer"));
    }

    #[tokio::test]
    async fn pass_through_wallet_returns_transaction_unchanged() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let tx = two_signer_tx(&payer, &other);
        let wallet = PassThroughWallet::new(payer.pubkey());

        let out = wallet
            .sign_transaction(WalletTransaction::Versioned(tx.clone()))
            .await
            .unwrap();
        assert_eq!(out, WalletTransaction::Versioned(tx.clone()));

        let err = wallet
            .sign_and_send_transaction(WalletTransaction::Versioned(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Signing(_)));
    }

    #[test]
    fn wallet_config_override_wins() {
        let wallet: Arc<dyn WalletCapability> = Arc::new(PassThroughWallet::new(Pubkey::new_unique()));
        let config = WalletConfig::new(wallet).sign_only(true);
        assert!(config.effective_sign_only(None));
        assert!(!config.effective_sign_only(Some(false)));
    }
}
