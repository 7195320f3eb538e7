// Native implementations

pub mod priority_fee_client;
pub mod remote_signer;
pub mod rpc_impl;
pub mod transaction_signer;

pub use priority_fee_client::HeliusPriorityFeeClient;
pub use remote_signer::RemoteWallet;
pub use rpc_impl::NativeRpcClient;
pub use transaction_signer::KeypairWallet;
