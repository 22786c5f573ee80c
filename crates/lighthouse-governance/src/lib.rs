//! lighthouse-governance - SPL governance plumbing
//!
//! Reads realm state over RPC, assembles proposal and realm instructions with
//! the `spl-governance` builders, and packs them into fee-payer signed
//! transactions for a client wallet to countersign.

pub mod accounts;
pub mod batching;
pub mod proposal;
pub mod realm;
pub mod realm_info;
pub mod rpc;
pub mod token;

pub use accounts::{
    GovernanceAccount, ProposalAccount, RealmAccount, TokenOwnerRecordAccount, VoteRecordAccount,
};
pub use batching::{pack_instructions, serialize_partially_signed, MAX_TRANSACTION_SIZE};
pub use proposal::{ProposalAction, ProposalDraft};
pub use realm::{RealmPlan, RealmRequest};
pub use realm_info::{get_realm_info, RealmInfo};
pub use rpc::{GovernanceRpc, RpcGovernanceClient};

/// Re-exported so callers can name SDK types without a direct dependency
pub use spl_governance;
