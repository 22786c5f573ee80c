//! Owned views of the governance accounts this service reads.
//!
//! The RPC layer decodes raw accounts with the SDK and keeps only the fields
//! the handlers and the indexer use.

use {
    lighthouse_common::VoteRecordVersion,
    solana_sdk::pubkey::Pubkey,
    spl_governance::state::{
        enums::{ProposalState, VoteThreshold},
        governance::{GovernanceConfig, GovernanceV2},
        proposal::ProposalV2,
        realm::RealmV2,
        token_owner_record::TokenOwnerRecordV2,
        vote_record::{Vote, VoteRecordV2},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct RealmAccount {
    pub pubkey: Pubkey,
    pub name: String,
    pub community_mint: Pubkey,
    pub council_mint: Option<Pubkey>,
    pub authority: Option<Pubkey>,
}

impl RealmAccount {
    pub fn from_data(pubkey: Pubkey, realm: RealmV2) -> Self {
        Self {
            pubkey,
            name: realm.name,
            community_mint: realm.community_mint,
            council_mint: realm.config.council_mint,
            authority: realm.authority,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GovernanceAccount {
    pub pubkey: Pubkey,
    pub realm: Pubkey,
    pub config: GovernanceConfig,
    pub active_proposal_count: u64,
}

impl GovernanceAccount {
    pub fn from_data(pubkey: Pubkey, governance: GovernanceV2) -> Self {
        Self {
            pubkey,
            realm: governance.realm,
            config: governance.config,
            active_proposal_count: governance.active_proposal_count,
        }
    }

    /// Yes-vote percentage required by the council, falling back to the
    /// community threshold when council voting is disabled.
    pub fn yes_vote_percentage(&self) -> Option<u8> {
        threshold_percentage(&self.config.council_vote_threshold)
            .or_else(|| threshold_percentage(&self.config.community_vote_threshold))
    }
}

fn threshold_percentage(threshold: &VoteThreshold) -> Option<u8> {
    match threshold {
        VoteThreshold::YesVotePercentage(p) | VoteThreshold::QuorumPercentage(p) => Some(*p),
        VoteThreshold::Disabled => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenOwnerRecordAccount {
    pub pubkey: Pubkey,
    pub realm: Pubkey,
    pub governing_token_mint: Pubkey,
    pub governing_token_owner: Pubkey,
    pub governing_token_deposit_amount: u64,
}

impl TokenOwnerRecordAccount {
    pub fn from_data(pubkey: Pubkey, record: TokenOwnerRecordV2) -> Self {
        Self {
            pubkey,
            realm: record.realm,
            governing_token_mint: record.governing_token_mint,
            governing_token_owner: record.governing_token_owner,
            governing_token_deposit_amount: record.governing_token_deposit_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalAccount {
    pub pubkey: Pubkey,
    pub governance: Pubkey,
    pub governing_token_mint: Pubkey,
    pub state: ProposalState,
    pub name: String,
    pub description_link: String,
    pub draft_at: i64,
    pub voting_completed_at: Option<i64>,
    pub yes_vote_weight: u64,
    pub no_vote_weight: u64,
}

impl ProposalAccount {
    pub fn from_data(pubkey: Pubkey, proposal: ProposalV2) -> Self {
        let yes_vote_weight = proposal
            .options
            .iter()
            .map(|option| option.vote_weight)
            .fold(0u64, u64::saturating_add);

        Self {
            pubkey,
            governance: proposal.governance,
            governing_token_mint: proposal.governing_token_mint,
            state: proposal.state,
            name: proposal.name,
            description_link: proposal.description_link,
            draft_at: proposal.draft_at,
            voting_completed_at: proposal.voting_completed_at,
            yes_vote_weight,
            no_vote_weight: proposal.deny_vote_weight.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecordAccount {
    pub pubkey: Pubkey,
    pub proposal: Pubkey,
    pub governing_token_owner: Pubkey,
    /// Layout the record was written with on chain
    pub version: VoteRecordVersion,
    pub approve: bool,
    pub voter_weight: u64,
}

impl VoteRecordAccount {
    pub fn from_data(pubkey: Pubkey, version: VoteRecordVersion, record: VoteRecordV2) -> Self {
        Self {
            pubkey,
            proposal: record.proposal,
            governing_token_owner: record.governing_token_owner,
            version,
            approve: matches!(record.vote, Vote::Approve(_)),
            voter_weight: record.voter_weight,
        }
    }
}
