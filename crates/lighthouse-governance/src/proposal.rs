//! Proposal instruction assembly.
//!
//! A proposal is created in one transaction and filled in a second one: every
//! instruction the proposal should execute is inserted as its own proposal
//! transaction, then the proposer signs the proposal off so voting starts.

use {
    crate::realm_info::RealmInfo,
    lighthouse_common::{Error, Result},
    solana_sdk::{
        instruction::{AccountMeta, Instruction},
        message::Message,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        transaction::Transaction,
    },
    spl_governance::{
        instruction::{create_proposal, insert_transaction, sign_off_proposal},
        state::{
            enums::VoteThreshold,
            governance::GovernanceConfig,
            proposal::{get_proposal_address, VoteType},
            proposal_transaction::InstructionData,
        },
    },
};

const APPROVE_OPTION: &str = "Approve";

/// The accounts and text of a proposal to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    pub realm: Pubkey,
    pub governance: Pubkey,
    pub governing_token_mint: Pubkey,
    pub token_owner_record: Pubkey,
    pub proposer: Pubkey,
    /// Pays rent for the proposal accounts
    pub payer: Pubkey,
    pub name: String,
    pub description: String,
}

impl ProposalDraft {
    /// A council proposal on `info`'s council mint governance.
    pub fn for_council(info: &RealmInfo, proposer: Pubkey, payer: Pubkey, action: &ProposalAction) -> Self {
        Self {
            realm: info.realm,
            governance: info.council_mint_governance,
            governing_token_mint: info.council_mint,
            token_owner_record: info.token_owner_record,
            proposer,
            payer,
            name: action.name(),
            description: action.description(),
        }
    }
}

/// What a proposal does, used for its title and description
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalAction {
    AddAdmin {
        new_admin: Pubkey,
    },
    AddMultisigMember {
        new_admin: Pubkey,
    },
    AddLog {
        receiver: Pubkey,
        amount: f64,
        reason: String,
        tags: String,
        points_breakdown: String,
    },
    AddPoints {
        receiver: Pubkey,
        amount: f64,
        reason: String,
    },
    ChangeConfig {
        yes_vote_percentage: u8,
    },
}

impl ProposalAction {
    pub fn name(&self) -> String {
        match self {
            ProposalAction::AddAdmin { new_admin } => format!("Add {} as a admin", new_admin),
            ProposalAction::AddMultisigMember { new_admin } => {
                format!("Add {} as a member of the multisig", new_admin)
            }
            ProposalAction::AddLog { receiver, .. } => {
                format!("Add an attestation for {}", receiver)
            }
            ProposalAction::AddPoints {
                receiver, amount, ..
            } => format!("Add {} points to {}", amount, receiver),
            ProposalAction::ChangeConfig { .. } => "Change governance config".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            ProposalAction::AddAdmin { new_admin } => {
                format!("Created a proposal to add {} as a admin", new_admin)
            }
            ProposalAction::AddMultisigMember { new_admin } => format!(
                "Created a proposal to add {} as a member of the multisig",
                new_admin
            ),
            ProposalAction::AddLog {
                amount,
                reason,
                tags,
                points_breakdown,
                ..
            } => format!(
                "Reason: {}, amount: {} Tags: {}, Points Breakdown: {}",
                reason, amount, tags, points_breakdown
            ),
            ProposalAction::AddPoints { reason, .. } => format!("Reason: {}", reason),
            ProposalAction::ChangeConfig {
                yes_vote_percentage,
            } => format!(
                "Change required yes vote percentage to {}%",
                yes_vote_percentage
            ),
        }
    }
}

/// Append a single-choice "Approve" proposal with a fresh random seed and
/// return its address.
pub fn with_create_proposal(
    instructions: &mut Vec<Instruction>,
    program_id: &Pubkey,
    draft: &ProposalDraft,
) -> Pubkey {
    let proposal_seed = Keypair::new().pubkey();
    with_create_proposal_seeded(instructions, program_id, draft, &proposal_seed)
}

pub fn with_create_proposal_seeded(
    instructions: &mut Vec<Instruction>,
    program_id: &Pubkey,
    draft: &ProposalDraft,
    proposal_seed: &Pubkey,
) -> Pubkey {
    instructions.push(create_proposal(
        program_id,
        &draft.governance,
        &draft.token_owner_record,
        &draft.proposer,
        &draft.payer,
        None,
        &draft.realm,
        draft.name.clone(),
        draft.description.clone(),
        &draft.governing_token_mint,
        VoteType::SingleChoice,
        vec![APPROVE_OPTION.to_string()],
        true,
        proposal_seed,
    ));

    get_proposal_address(
        program_id,
        &draft.governance,
        &draft.governing_token_mint,
        proposal_seed,
    )
}

/// Insert every instruction in `inner` into option 0 of `proposal`, in order,
/// then sign the proposal off.
pub fn insert_instructions_and_sign_off(
    instructions: &mut Vec<Instruction>,
    program_id: &Pubkey,
    draft: &ProposalDraft,
    proposal: &Pubkey,
    inner: Vec<Instruction>,
) -> Result<()> {
    for (index, instruction) in inner.into_iter().enumerate() {
        let index = u16::try_from(index).map_err(|_| {
            Error::Validation("too many instructions for one proposal".to_string())
        })?;

        instructions.push(insert_transaction(
            program_id,
            &draft.governance,
            proposal,
            &draft.token_owner_record,
            &draft.proposer,
            &draft.payer,
            0,
            index,
            0,
            vec![InstructionData::from(instruction)],
        ));
    }

    instructions.push(sign_off_proposal(
        program_id,
        &draft.realm,
        &draft.governance,
        proposal,
        &draft.proposer,
        Some(&draft.token_owner_record),
    ));

    Ok(())
}

/// Decode a serialized legacy transaction and rebuild its instructions.
pub fn decompile_transaction(bytes: &[u8]) -> Result<Vec<Instruction>> {
    let transaction: Transaction = bincode::deserialize(bytes)
        .map_err(|e| Error::Serialization(format!("invalid transaction bytes: {}", e)))?;

    decompile_message(&transaction.message)
}

pub fn decompile_message(message: &Message) -> Result<Vec<Instruction>> {
    let key_at = |index: usize| {
        message.account_keys.get(index).copied().ok_or_else(|| {
            Error::Serialization(format!("account index {} out of range", index))
        })
    };

    message
        .instructions
        .iter()
        .map(|compiled| {
            let program_id = key_at(compiled.program_id_index as usize)?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&index| {
                    let index = index as usize;
                    Ok(AccountMeta {
                        pubkey: key_at(index)?,
                        is_signer: message.is_signer(index),
                        is_writable: message.is_writable(index),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

/// Copy of `config` requiring `percentage` yes votes.
///
/// The community threshold is only touched when community voting is enabled.
pub fn change_yes_threshold(config: &GovernanceConfig, percentage: u8) -> Result<GovernanceConfig> {
    if percentage == 0 || percentage >= 100 {
        return Err(Error::Validation(format!(
            "yes vote percentage must be between 1 and 99, got {}",
            percentage
        )));
    }

    let mut config = config.clone();
    config.council_vote_threshold = VoteThreshold::YesVotePercentage(percentage);
    if config.community_vote_threshold != VoteThreshold::Disabled {
        config.community_vote_threshold = VoteThreshold::YesVotePercentage(percentage);
    }
    Ok(config)
}
