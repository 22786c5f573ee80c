//! Types shared between the store, the indexer and the HTTP layer

pub mod rows;
pub mod wallet;

pub use rows::{ProposalRow, RealmRow, Vote, VoteRecordRow, VoteRecordVersion};
pub use wallet::WalletInfo;
