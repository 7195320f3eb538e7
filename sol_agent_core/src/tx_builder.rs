// Transaction assembly: compute budget first, caller instructions after,
// compiled into one v0 message bound to a fresh blockhash.

use crate::error::CoreError;
use crate::models::ComputeBudget;
use crate::transaction_signer::sign_versioned_slot;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine};
use log::debug;
use solana_program::instruction::Instruction;
use solana_program::pubkey::Pubkey;
use solana_sdk::hash::Hash;
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;

pub type AssemblyResult<T> = Result<T, CoreError>;

/// Concatenate `[limit, price, ...instructions]` in that order.
pub fn with_compute_budget(budget: &ComputeBudget, instructions: &[Instruction]) -> Vec<Instruction> {
    let mut all = Vec::with_capacity(instructions.len() + 2);
    all.push(budget.limit_instruction.clone());
    all.push(budget.price_instruction.clone());
    all.extend_from_slice(instructions);
    all
}

/// Assemble an unsigned-by-payer versioned transaction.
///
/// Co-signers (ephemeral keypairs some instructions require) sign their own
/// slots here. The fee payer slot is left as the default signature for the
/// wallet to fill.
pub fn assemble_transaction(
    budget: &ComputeBudget,
    instructions: &[Instruction],
    payer: &Pubkey,
    recent_blockhash: Hash,
    co_signers: &[&Keypair],
) -> AssemblyResult<VersionedTransaction> {
    if instructions.is_empty() {
        return Err(CoreError::Assembly("No instructions to assemble".to_string()));
    }

    let all_instructions = with_compute_budget(budget, instructions);
    let message = v0::Message::try_compile(payer, &all_instructions, &[], recent_blockhash)
        .map_err(|e| CoreError::Assembly(format!("Failed to compile message: {}", e)))?;
    let message = VersionedMessage::V0(message);
    let required = usize::from(message.header().num_required_signatures);

    let mut transaction = VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message,
    };

    for signer in co_signers {
        sign_versioned_slot(&mut transaction, *signer)
            .map_err(|e| CoreError::Assembly(format!("Co-signer could not sign: {}", e)))?;
    }

    debug!(
        "Assembled v0 transaction: {} instruction(s), {} required signature(s), {} co-signer(s)",
        all_instructions.len(),
        required,
        co_signers.len()
    );
    Ok(transaction)
}

/// Base64 wire encoding, for handing a signed artifact to a caller
pub fn encode_transaction_base64(transaction: &VersionedTransaction) -> AssemblyResult<String> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| CoreError::Validation(format!("Failed to serialize transaction: {}", e)))?;
    Ok(Base64Engine.encode(bytes))
}

pub fn decode_transaction_base64(encoded: &str) -> AssemblyResult<VersionedTransaction> {
    let bytes = Base64Engine
        .decode(encoded)
        .map_err(|e| CoreError::ParseError(format!("Failed to decode base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| CoreError::ParseError(format!("Failed to deserialize transaction: {}", e)))
}
