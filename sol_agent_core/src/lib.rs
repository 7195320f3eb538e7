// Sol Agent Core Library
// Fee-estimating transaction pipeline and agent actions for Solana

pub mod actions;
pub mod confirm;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod priority_fee;
pub mod rpc_client;
pub mod settings;
pub mod transaction_signer;
pub mod tx_builder;

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
mod test_support;

// Re-exports
pub use actions::{Action, ActionContext, ActionRegistry, ActionRegistryBuilder, TransferAction};
pub use confirm::{send_and_confirm, ConfirmConfig, SubmitState};
pub use error::CoreError;
pub use models::*;
pub use pipeline::{send_transaction, sign_transactions_batch, SendOptions};
pub use priority_fee::{estimate_compute_budget, PriorityFeeService};
pub use rpc_client::RpcClient;
pub use settings::Settings;
pub use transaction_signer::*;
pub use tx_builder::{assemble_transaction, encode_transaction_base64};

#[cfg(feature = "native")]
pub use native::{HeliusPriorityFeeClient, KeypairWallet, NativeRpcClient, RemoteWallet};

/// Initialise logging from `RUST_LOG` (default `info`). Safe to call more than once.
#[cfg(feature = "native")]
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

#[cfg(not(feature = "native"))]
pub fn init() {
    // No-op without a native logger
}
