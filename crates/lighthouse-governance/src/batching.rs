//! Packs instructions into as few legacy transactions as fit the packet size,
//! and partially signs them with the gas tank so only the user signature is
//! missing.

use {
    lighthouse_common::{Error, Result},
    solana_sdk::{
        hash::Hash,
        instruction::Instruction,
        packet::PACKET_DATA_SIZE,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        transaction::Transaction,
    },
    tracing::debug,
};

/// Largest serialized transaction the cluster accepts
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

/// Serialized size of `instructions` in one transaction paid by `fee_payer`,
/// counting a placeholder for every required signature.
pub fn transaction_size(instructions: &[Instruction], fee_payer: &Pubkey) -> Result<usize> {
    let transaction = Transaction::new_with_payer(instructions, Some(fee_payer));
    let size = bincode::serialized_size(&transaction)
        .map_err(|e| Error::Serialization(format!("failed to size transaction: {}", e)))?;
    Ok(size as usize)
}

/// Greedily group `instructions`, in order, into batches that each fit one
/// transaction of at most `MAX_TRANSACTION_SIZE` bytes.
pub fn pack_instructions(
    instructions: Vec<Instruction>,
    fee_payer: &Pubkey,
) -> Result<Vec<Vec<Instruction>>> {
    let mut batches = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    for instruction in instructions {
        current.push(instruction);
        if transaction_size(&current, fee_payer)? <= MAX_TRANSACTION_SIZE {
            continue;
        }

        let overflow = current.pop();
        if current.is_empty() {
            return Err(Error::Transaction(
                "instruction does not fit in a single transaction".to_string(),
            ));
        }
        batches.push(std::mem::take(&mut current));
        current.extend(overflow);
        if transaction_size(&current, fee_payer)? > MAX_TRANSACTION_SIZE {
            return Err(Error::Transaction(
                "instruction does not fit in a single transaction".to_string(),
            ));
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}

/// Pack each group separately, then sign every transaction with the gas tank
/// only and serialize it, leaving the other required signatures empty for the
/// wallet to fill in. Groups stay in order and empty groups are skipped.
pub fn serialize_partially_signed(
    groups: Vec<Vec<Instruction>>,
    fee_payer: &Keypair,
    recent_blockhash: Hash,
) -> Result<Vec<Vec<u8>>> {
    let payer = fee_payer.pubkey();
    let mut serialized = Vec::new();

    for group in groups.into_iter().filter(|group| !group.is_empty()) {
        for batch in pack_instructions(group, &payer)? {
            let mut transaction = Transaction::new_with_payer(&batch, Some(&payer));
            transaction
                .try_partial_sign(&[fee_payer], recent_blockhash)
                .map_err(|e| Error::Transaction(format!("gas tank signing failed: {}", e)))?;

            serialized.push(bincode::serialize(&transaction).map_err(|e| {
                Error::Serialization(format!("failed to serialize transaction: {}", e))
            })?);
        }
    }

    debug!("Serialized {} partially signed transaction(s)", serialized.len());
    Ok(serialized)
}

/// Fully sign `transaction` with every keypair the service holds.
pub fn sign_transaction(
    transaction: &mut Transaction,
    signers: &[&dyn Signer],
    recent_blockhash: Hash,
) -> Result<()> {
    transaction
        .try_sign(signers, recent_blockhash)
        .map_err(|e| Error::Transaction(format!("signing failed: {}", e)))
}
