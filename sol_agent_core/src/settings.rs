use crate::confirm::ConfirmConfig;
use crate::error::CoreError;
use crate::models::{FeeTier, SendConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "native")]
use crate::native::{HeliusPriorityFeeClient, KeypairWallet, NativeRpcClient, RemoteWallet};
#[cfg(feature = "native")]
use crate::priority_fee::PriorityFeeService;
#[cfg(feature = "native")]
use crate::rpc_client::RpcClient;
#[cfg(feature = "native")]
use crate::transaction_signer::WalletCapability;
#[cfg(feature = "native")]
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine};
#[cfg(feature = "native")]
use log::{info, warn};
#[cfg(feature = "native")]
use solana_program::pubkey::Pubkey;
#[cfg(feature = "native")]
use solana_sdk::signature::{read_keypair_file, Keypair};
#[cfg(feature = "native")]
use std::sync::Arc;

/// Environment variable holding a base64 keypair, checked after the other key sources
pub const WALLET_KEYPAIR_ENV: &str = "SOL_AGENT_WALLET_KEYPAIR";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// When set, fees come from the external estimator instead of recent samples
    #[serde(default)]
    pub priority_fee_api_key: Option<String>,
    #[serde(default = "default_priority_fee_endpoint")]
    pub priority_fee_endpoint: String,
    #[serde(default)]
    pub default_fee_tier: FeeTier,

    /// Process-wide default; callers can override per call
    #[serde(default)]
    pub sign_only: bool,
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    #[serde(default)]
    pub wallet_keypair_path: Option<String>,
    #[serde(default)]
    pub wallet_private_key_string: Option<String>,
    #[serde(default)]
    pub remote_signer_url: Option<String>,
    #[serde(default)]
    pub remote_signer_pubkey: Option<String>,
    #[serde(default)]
    pub remote_signer_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            priority_fee_api_key: None,
            priority_fee_endpoint: default_priority_fee_endpoint(),
            default_fee_tier: FeeTier::default(),
            sign_only: false,
            confirm_timeout_secs: default_confirm_timeout_secs(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            wallet_keypair_path: None,
            wallet_private_key_string: None,
            remote_signer_url: None,
            remote_signer_pubkey: None,
            remote_signer_api_key: None,
        }
    }
}

impl Settings {
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Load `path` (optional) and apply `SOL_AGENT_*` environment overrides on top
    #[cfg(feature = "native")]
    pub fn load(path: &str) -> Result<Self, CoreError> {
        Self::load_with_env_prefix(path, "SOL_AGENT")
    }

    #[cfg(feature = "native")]
    pub fn load_with_env_prefix(path: &str, env_prefix: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(env_prefix).try_parsing(true));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.rpc_url.trim().is_empty() {
            return Err(CoreError::Validation("rpc_url must not be empty".to_string()));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(CoreError::Validation("rpc_timeout_secs must be > 0".to_string()));
        }
        if self.confirm_timeout_secs == 0 {
            return Err(CoreError::Validation("confirm_timeout_secs must be > 0".to_string()));
        }
        if self.confirm_poll_interval_ms == 0 {
            return Err(CoreError::Validation("confirm_poll_interval_ms must be > 0".to_string()));
        }
        if self.confirm_poll_interval_ms > self.confirm_timeout_secs.saturating_mul(1_000) {
            return Err(CoreError::Validation(
                "confirm_poll_interval_ms must not exceed confirm_timeout_secs".to_string(),
            ));
        }
        if self.priority_fee_api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(CoreError::Validation("priority_fee_api_key must not be blank".to_string()));
        }
        if self.remote_signer_url.is_some() != self.remote_signer_pubkey.is_some() {
            return Err(CoreError::Validation(
                "remote_signer_url and remote_signer_pubkey must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn confirm_config(&self) -> ConfirmConfig {
        ConfirmConfig {
            timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.confirm_poll_interval_ms),
            send_config: SendConfig::loop_owned(),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    #[cfg(feature = "native")]
    pub fn build_rpc_client(&self) -> Arc<dyn RpcClient> {
        Arc::new(NativeRpcClient::new(self.rpc_url.clone(), self.rpc_timeout()))
    }

    /// External estimator when an API key is configured, otherwise None (local samples)
    #[cfg(feature = "native")]
    pub fn build_fee_service(&self) -> Result<Option<Arc<dyn PriorityFeeService>>, CoreError> {
        match &self.priority_fee_api_key {
            Some(key) => {
                let client = HeliusPriorityFeeClient::new(&self.priority_fee_endpoint, key, self.rpc_timeout())?;
                Ok(Some(Arc::new(client)))
            }
            None => Ok(None),
        }
    }

    /// Pick a wallet: remote signer first, then a local keypair from path,
    /// key string, or `SOL_AGENT_WALLET_KEYPAIR`.
    #[cfg(feature = "native")]
    pub fn build_wallet(&self, rpc_client: Arc<dyn RpcClient>) -> Result<Arc<dyn WalletCapability>, CoreError> {
        self.validate()?;
        if let (Some(url), Some(pubkey)) = (&self.remote_signer_url, &self.remote_signer_pubkey) {
            let pubkey = pubkey
                .parse::<Pubkey>()
                .map_err(|e| CoreError::InvalidKeypair(format!("remote_signer_pubkey: {}", e)))?;
            info!("Using remote signer at {} for {}", url, pubkey);
            let wallet = RemoteWallet::new(url, pubkey, self.remote_signer_api_key.clone(), self.rpc_timeout())?;
            return Ok(Arc::new(wallet));
        }

        let keypair = self.load_keypair()?;
        Ok(Arc::new(KeypairWallet::new(keypair).with_rpc(rpc_client)))
    }

    #[cfg(feature = "native")]
    fn load_keypair(&self) -> Result<Keypair, CoreError> {
        if let Some(path) = &self.wallet_keypair_path {
            return read_keypair_file(path)
                .map_err(|e| CoreError::InvalidKeypair(format!("Failed to read {}: {}", path, e)));
        }
        if let Some(s) = &self.wallet_private_key_string {
            let bytes = parse_private_key_string(s).map_err(CoreError::InvalidKeypair)?;
            return keypair_from_bytes(&bytes);
        }
        if let Some(bytes) = load_keypair_from_env_var(WALLET_KEYPAIR_ENV) {
            return keypair_from_bytes(&bytes);
        }
        Err(CoreError::InvalidKeypair(
            "No wallet configured: set remote_signer_url, wallet_keypair_path, wallet_private_key_string or SOL_AGENT_WALLET_KEYPAIR".to_string(),
        ))
    }
}

#[cfg(feature = "native")]
#[allow(deprecated)]
fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, CoreError> {
    Keypair::from_bytes(bytes).map_err(|e| CoreError::InvalidKeypair(e.to_string()))
}

/// Try to read a base64-encoded keypair from the given env var. Returns
/// the raw decoded bytes if present and valid, otherwise None.
#[cfg(feature = "native")]
pub fn load_keypair_from_env_var(var: &str) -> Option<Vec<u8>> {
    let s = std::env::var(var).ok()?;
    match Base64Engine.decode(s.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Failed to decode {}: {}", var, e);
            None
        }
    }
}

/// Parse a private key string in various formats:
/// - Base58 (standard Solana format, 88 chars)
/// - JSON array string like "[1,2,3,...]"
/// - Comma-separated bytes like "1,2,3,..."
pub fn parse_private_key_string(s: &str) -> Result<Vec<u8>, String> {
    let trimmed = s.trim();

    if trimmed.len() >= 80 && !trimmed.starts_with('[') && !trimmed.contains(',') {
        return bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| format!("Base58 decode failed: {}", e));
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<u8>>(trimmed)
            .map_err(|e| format!("JSON parse failed: {}", e));
    }

    if trimmed.contains(',') {
        let parts: Result<Vec<u8>, _> = trimmed
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect();
        return parts.map_err(|e| format!("CSV parse failed: {}", e));
    }

    Err("Unrecognized private key format. Expected: base58, JSON array, or comma-separated bytes".to_string())
}

fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout_secs() -> u64 { 30 }
fn default_priority_fee_endpoint() -> String { "https://mainnet.helius-rpc.com/".to_string() }
fn default_confirm_timeout_secs() -> u64 { 90 }
fn default_confirm_poll_interval_ms() -> u64 { 1_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_confirm_loop() {
        let s = Settings::default();
        assert_eq!(s.confirm_config(), ConfirmConfig::default());
        assert_eq!(s.default_fee_tier, FeeTier::Mid);
        assert!(!s.sign_only);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let mut s = Settings { confirm_timeout_secs: 0, ..Settings::default() };
        assert!(matches!(s.validate(), Err(CoreError::Validation(_))));

        s = Settings { confirm_poll_interval_ms: 120_000, ..Settings::default() };
        assert!(s.validate().is_err());

        s = Settings { remote_signer_url: Some("http://signer".into()), ..Settings::default() };
        assert!(s.validate().is_err());

        s = Settings { priority_fee_api_key: Some("  ".into()), ..Settings::default() };
        assert!(s.validate().is_err());
    }

    #[test]
    fn private_key_formats() {
        let bytes: Vec<u8> = (0..64).collect();
        let b58 = bs58::encode(&bytes).into_string();
        assert_eq!(parse_private_key_string(&b58).unwrap(), bytes);

        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(parse_private_key_string(&json).unwrap(), bytes);

        assert_eq!(parse_private_key_string(" 1, 2,3 ").unwrap(), vec![1, 2, 3]);
        assert!(parse_private_key_string("1,2,300").is_err());
        assert!(parse_private_key_string("nope").is_err());
    }
}

#[cfg(all(test, feature = "native"))]
mod native_tests {
    use super::*;
    use crate::test_support::MockRpcClient;
    use solana_sdk::signature::Signer;
    use std::io::Write;

    #[test]
    fn load_example_config() {
        let s = Settings::from_file("config.example.toml").unwrap();
        assert_eq!(s.confirm_timeout_secs, 90);
        assert_eq!(s.confirm_poll_interval_ms, 1_000);
        assert_eq!(s.default_fee_tier, FeeTier::Mid);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        let path = path.to_str().unwrap();
        let s = Settings {
            sign_only: true,
            default_fee_tier: FeeTier::Max,
            priority_fee_api_key: Some("abc".into()),
            ..Settings::default()
        };

        s.save_to_file(path).unwrap();
        assert_eq!(Settings::from_file(path).unwrap(), s);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "rpc_url = \"http://from-file\"\nconfirm_timeout_secs = 30").unwrap();
        std::env::set_var("SOL_AGENT_ENV_OVERRIDE_CONFIRM_TIMEOUT_SECS", "45");

        let s = Settings::load_with_env_prefix(file.path().to_str().unwrap(), "SOL_AGENT_ENV_OVERRIDE").unwrap();
        std::env::remove_var("SOL_AGENT_ENV_OVERRIDE_CONFIRM_TIMEOUT_SECS");

        assert_eq!(s.rpc_url, "http://from-file");
        assert_eq!(s.confirm_timeout_secs, 45);
    }

    #[test]
    fn wallet_from_key_string() {
        let kp = Keypair::new();
        let s = Settings {
            wallet_private_key_string: Some(kp.to_base58_string()),
            ..Settings::default()
        };
        let wallet = s.build_wallet(Arc::new(MockRpcClient::new())).unwrap();
        assert_eq!(wallet.public_key(), kp.pubkey());
    }

    #[test]
    fn remote_signer_takes_precedence() {
        let remote = Keypair::new().pubkey();
        let s = Settings {
            remote_signer_url: Some("http://127.0.0.1:9".into()),
            remote_signer_pubkey: Some(remote.to_string()),
            wallet_private_key_string: Some(Keypair::new().to_base58_string()),
            ..Settings::default()
        };
        let wallet = s.build_wallet(Arc::new(MockRpcClient::new())).unwrap();
        assert_eq!(wallet.public_key(), remote);
    }

    #[test]
    fn half_configured_remote_signer_is_rejected() {
        let s = Settings {
            remote_signer_url: Some("http://127.0.0.1:9".into()),
            wallet_private_key_string: Some(Keypair::new().to_base58_string()),
            ..Settings::default()
        };
        let err = s.build_wallet(Arc::new(MockRpcClient::new())).err().unwrap();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn fee_service_only_with_api_key() {
        assert!(Settings::default().build_fee_service().unwrap().is_none());
        let s = Settings { priority_fee_api_key: Some("k".into()), ..Settings::default() };
        assert!(s.build_fee_service().unwrap().is_some());
    }
}
