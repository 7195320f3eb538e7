// Submit/confirm loop as an explicit state machine.
//
// Sending -> Polling -> { Confirmed | Failed | Retrying -> Sending } until the
// deadline turns the next Sending into TimedOut.

use crate::error::CoreError;
use crate::models::{SendConfig, SignatureStatusEntry};
use crate::rpc_client::{get_signature_status, RpcClient};
use log::{debug, info, warn};
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

pub type ConfirmResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmConfig {
    /// Wall-clock budget measured from loop start
    pub timeout: Duration,
    /// Cadence of one send + status cycle
    pub poll_interval: Duration,
    pub send_config: SendConfig,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            send_config: SendConfig::loop_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitState {
    Sending,
    Polling(Signature),
    /// Waiting out the rest of the cadence before re-sending
    Retrying(Duration),
    Confirmed(Signature),
    Failed(TransactionError),
    TimedOut,
}

impl SubmitState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmitState::Confirmed(_) | SubmitState::Failed(_) | SubmitState::TimedOut
        )
    }
}

/// Transition out of Polling given the status query result.
pub fn on_status(
    signature: Signature,
    status: Option<&SignatureStatusEntry>,
    cycle_elapsed: Duration,
    poll_interval: Duration,
) -> SubmitState {
    match status {
        None => SubmitState::Retrying(poll_interval.saturating_sub(cycle_elapsed)),
        Some(entry) => match &entry.err {
            None => SubmitState::Confirmed(signature),
            Some(err) => SubmitState::Failed(err.clone()),
        },
    }
}

/// No new send attempt starts at or after the deadline.
pub fn check_deadline(state: SubmitState, now: Instant, deadline: Instant) -> SubmitState {
    match state {
        SubmitState::Sending if now >= deadline => SubmitState::TimedOut,
        other => other,
    }
}

/// Broadcast `transaction` until it lands, fails on-chain, or the deadline passes.
///
/// The same signed bytes are re-sent every cycle; nothing is re-assembled or
/// re-signed. Errors from the send or status calls propagate immediately.
/// In-flight RPC calls are cut off at the deadline.
pub async fn send_and_confirm<C: RpcClient + ?Sized>(
    rpc_client: &C,
    transaction: &VersionedTransaction,
    config: &ConfirmConfig,
) -> ConfirmResult<Signature> {
    let start = Instant::now();
    let deadline = start + config.timeout;
    let mut cycle_start = start;
    let mut last_signature = transaction.signatures.first().copied().unwrap_or_default();
    let mut attempts: u32 = 0;
    let mut state = SubmitState::Sending;

    loop {
        state = match state {
            SubmitState::Sending => {
                cycle_start = Instant::now();
                attempts += 1;
                match timeout_at(deadline, rpc_client.send_transaction(transaction, config.send_config)).await {
                    Ok(sent) => {
                        let signature = sent?;
                        debug!("Broadcast attempt {} for {}", attempts, signature);
                        last_signature = signature;
                        SubmitState::Polling(signature)
                    }
                    Err(_) => SubmitState::TimedOut,
                }
            }
            SubmitState::Polling(signature) => {
                match timeout_at(deadline, get_signature_status(rpc_client, &signature)).await {
                    Ok(status) => {
                        let status = status?;
                        on_status(signature, status.as_ref(), cycle_start.elapsed(), config.poll_interval)
                    }
                    Err(_) => SubmitState::TimedOut,
                }
            }
            SubmitState::Retrying(wait) => {
                let wait = wait.min(deadline.saturating_duration_since(Instant::now()));
                if !wait.is_zero() {
                    sleep(wait).await;
                }
                SubmitState::Sending
            }
            SubmitState::Confirmed(signature) => {
                info!(
                    "Transaction {} landed after {} attempt(s) in {:?}",
                    signature,
                    attempts,
                    start.elapsed()
                );
                return Ok(signature);
            }
            SubmitState::Failed(err) => {
                warn!("Transaction {} failed on-chain: {}", last_signature, err);
                return Err(CoreError::Execution(err));
            }
            SubmitState::TimedOut => {
                let elapsed = start.elapsed();
                warn!(
                    "Transaction {} not confirmed after {} attempt(s) in {:?}",
                    last_signature, attempts, elapsed
                );
                return Err(CoreError::Timeout {
                    signature: last_signature,
                    elapsed,
                });
            }
        };
        state = check_deadline(state, Instant::now(), deadline);
    }
}
