//! Governance program reads (and the few writes the service submits itself)
//! over Solana JSON-RPC.

use {
    crate::accounts::{
        GovernanceAccount, ProposalAccount, RealmAccount, TokenOwnerRecordAccount,
        VoteRecordAccount,
    },
    async_trait::async_trait,
    lighthouse_common::{Error, Result, VoteRecordVersion},
    solana_account_decoder::UiAccountEncoding,
    solana_client::{
        client_error::ClientError,
        nonblocking::rpc_client::RpcClient,
        rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
        rpc_filter::{Memcmp, RpcFilterType},
    },
    solana_sdk::{
        account::Account,
        account_info::{AccountInfo, IntoAccountInfo},
        commitment_config::CommitmentConfig,
        hash::Hash,
        program_error::ProgramError,
        pubkey::Pubkey,
        signature::Signature,
        transaction::Transaction,
    },
    spl_governance::state::{
        enums::GovernanceAccountType,
        governance::get_governance_data,
        proposal::get_proposal_data,
        realm::get_realm_data,
        token_owner_record::get_token_owner_record_data,
        vote_record::get_vote_record_data,
    },
    std::sync::Arc,
    tracing::{debug, warn},
};

/// Account-type discriminators, the first byte of every governance account
pub const GOVERNANCE_TYPES: [u8; 8] = [
    GovernanceAccountType::GovernanceV1 as u8,
    GovernanceAccountType::ProgramGovernanceV1 as u8,
    GovernanceAccountType::MintGovernanceV1 as u8,
    GovernanceAccountType::TokenGovernanceV1 as u8,
    GovernanceAccountType::GovernanceV2 as u8,
    GovernanceAccountType::ProgramGovernanceV2 as u8,
    GovernanceAccountType::MintGovernanceV2 as u8,
    GovernanceAccountType::TokenGovernanceV2 as u8,
];
pub const TOKEN_OWNER_RECORD_TYPES: [u8; 2] = [
    GovernanceAccountType::TokenOwnerRecordV1 as u8,
    GovernanceAccountType::TokenOwnerRecordV2 as u8,
];
pub const PROPOSAL_TYPES: [u8; 2] = [
    GovernanceAccountType::ProposalV1 as u8,
    GovernanceAccountType::ProposalV2 as u8,
];
pub const VOTE_RECORD_V1: u8 = GovernanceAccountType::VoteRecordV1 as u8;
pub const VOTE_RECORD_V2: u8 = GovernanceAccountType::VoteRecordV2 as u8;

// Offsets shared by the V1 and V2 layouts
const REALM_OFFSET: usize = 1;
const GOVERNED_ACCOUNT_OFFSET: usize = 33;
const GOVERNANCE_OFFSET: usize = 1;
const PROPOSAL_OFFSET: usize = 1;
const TOKEN_OWNER_RECORD_MINT_OFFSET: usize = 33;
const TOKEN_OWNER_RECORD_OWNER_OFFSET: usize = 65;

/// Everything the service needs from the chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GovernanceRpc: Send + Sync {
    fn program_id(&self) -> Pubkey;

    async fn get_realm(&self, realm: &Pubkey) -> Result<RealmAccount>;

    async fn get_governance(&self, governance: &Pubkey) -> Result<GovernanceAccount>;

    async fn get_governances_by_realm(&self, realm: &Pubkey) -> Result<Vec<GovernanceAccount>>;

    async fn get_governances_by_governed_account(
        &self,
        governed_account: &Pubkey,
    ) -> Result<Vec<GovernanceAccount>>;

    async fn get_token_owner_records(
        &self,
        realm: &Pubkey,
        governing_token_mint: Option<Pubkey>,
        governing_token_owner: Option<Pubkey>,
    ) -> Result<Vec<TokenOwnerRecordAccount>>;

    async fn get_proposals_by_governance(
        &self,
        governance: &Pubkey,
    ) -> Result<Vec<ProposalAccount>>;

    async fn get_vote_records_by_proposal(
        &self,
        proposal: &Pubkey,
    ) -> Result<Vec<VoteRecordAccount>>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature>;
}

/// `GovernanceRpc` backed by the nonblocking Solana RPC client
#[derive(Clone)]
pub struct RpcGovernanceClient {
    client: Arc<RpcClient>,
    program_id: Pubkey,
}

fn rpc_error(e: ClientError) -> Error {
    Error::Rpc(e.to_string())
}

fn decode<T, F>(program_id: &Pubkey, pubkey: Pubkey, mut account: Account, decoder: F) -> Result<T>
where
    F: FnOnce(&Pubkey, &AccountInfo<'_>) -> std::result::Result<T, ProgramError>,
{
    let account_info = (&pubkey, &mut account).into_account_info();
    decoder(program_id, &account_info)
        .map_err(|e| Error::Governance(format!("Failed to decode account {}: {}", pubkey, e)))
}

impl RpcGovernanceClient {
    pub fn new(rpc_url: impl Into<String>, program_id: Pubkey) -> Self {
        let rpc_url = rpc_url.into();
        debug!("Initializing governance RPC client for {}", rpc_url);

        Self {
            client: Arc::new(RpcClient::new_with_commitment(
                rpc_url,
                CommitmentConfig::confirmed(),
            )),
            program_id,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    /// `getProgramAccounts` once per account type, all sharing `filters`.
    async fn program_accounts(
        &self,
        account_types: &[u8],
        filters: &[(usize, Pubkey)],
    ) -> Result<Vec<(Pubkey, Account)>> {
        let mut accounts = Vec::new();

        for account_type in account_types {
            let mut rpc_filters = vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                0,
                &[*account_type],
            ))];
            rpc_filters.extend(filters.iter().map(|(offset, key)| {
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, key.as_ref()))
            }));

            let config = RpcProgramAccountsConfig {
                filters: Some(rpc_filters),
                account_config: RpcAccountInfoConfig {
                    encoding: Some(UiAccountEncoding::Base64),
                    commitment: Some(self.client.commitment()),
                    ..RpcAccountInfoConfig::default()
                },
                ..RpcProgramAccountsConfig::default()
            };

            let found = self
                .client
                .get_program_accounts_with_config(&self.program_id, config)
                .await
                .map_err(rpc_error)?;

            debug!(
                "getProgramAccounts type={} filters={} returned {} accounts",
                account_type,
                filters.len(),
                found.len()
            );
            accounts.extend(found);
        }

        Ok(accounts)
    }

    async fn fetch_account(&self, pubkey: &Pubkey) -> Result<Account> {
        self.client
            .get_account_with_commitment(pubkey, self.client.commitment())
            .await
            .map_err(rpc_error)?
            .value
            .ok_or_else(|| Error::NotFound(format!("account {} does not exist", pubkey)))
    }

    fn decode_governances(&self, accounts: Vec<(Pubkey, Account)>) -> Vec<GovernanceAccount> {
        accounts
            .into_iter()
            .filter_map(|(pubkey, account)| {
                match decode(&self.program_id, pubkey, account, get_governance_data) {
                    Ok(data) => Some(GovernanceAccount::from_data(pubkey, data)),
                    Err(e) => {
                        warn!("Skipping governance: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl GovernanceRpc for RpcGovernanceClient {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn get_realm(&self, realm: &Pubkey) -> Result<RealmAccount> {
        let account = self.fetch_account(realm).await?;
        let data = decode(&self.program_id, *realm, account, get_realm_data)?;
        Ok(RealmAccount::from_data(*realm, data))
    }

    async fn get_governance(&self, governance: &Pubkey) -> Result<GovernanceAccount> {
        let account = self.fetch_account(governance).await?;
        let data = decode(&self.program_id, *governance, account, get_governance_data)?;
        Ok(GovernanceAccount::from_data(*governance, data))
    }

    async fn get_governances_by_realm(&self, realm: &Pubkey) -> Result<Vec<GovernanceAccount>> {
        let accounts = self
            .program_accounts(&GOVERNANCE_TYPES, &[(REALM_OFFSET, *realm)])
            .await?;
        Ok(self.decode_governances(accounts))
    }

    async fn get_governances_by_governed_account(
        &self,
        governed_account: &Pubkey,
    ) -> Result<Vec<GovernanceAccount>> {
        let accounts = self
            .program_accounts(
                &GOVERNANCE_TYPES,
                &[(GOVERNED_ACCOUNT_OFFSET, *governed_account)],
            )
            .await?;
        Ok(self.decode_governances(accounts))
    }

    async fn get_token_owner_records(
        &self,
        realm: &Pubkey,
        governing_token_mint: Option<Pubkey>,
        governing_token_owner: Option<Pubkey>,
    ) -> Result<Vec<TokenOwnerRecordAccount>> {
        let mut filters = vec![(REALM_OFFSET, *realm)];
        if let Some(mint) = governing_token_mint {
            filters.push((TOKEN_OWNER_RECORD_MINT_OFFSET, mint));
        }
        if let Some(owner) = governing_token_owner {
            filters.push((TOKEN_OWNER_RECORD_OWNER_OFFSET, owner));
        }

        let accounts = self
            .program_accounts(&TOKEN_OWNER_RECORD_TYPES, &filters)
            .await?;

        Ok(accounts
            .into_iter()
            .filter_map(|(pubkey, account)| {
                match decode(&self.program_id, pubkey, account, get_token_owner_record_data) {
                    Ok(data) => Some(TokenOwnerRecordAccount::from_data(pubkey, data)),
                    Err(e) => {
                        warn!("Skipping token owner record: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    async fn get_proposals_by_governance(
        &self,
        governance: &Pubkey,
    ) -> Result<Vec<ProposalAccount>> {
        let accounts = self
            .program_accounts(&PROPOSAL_TYPES, &[(GOVERNANCE_OFFSET, *governance)])
            .await?;

        Ok(accounts
            .into_iter()
            .filter_map(|(pubkey, account)| {
                match decode(&self.program_id, pubkey, account, get_proposal_data) {
                    Ok(data) => Some(ProposalAccount::from_data(pubkey, data)),
                    Err(e) => {
                        warn!("Skipping proposal: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    async fn get_vote_records_by_proposal(
        &self,
        proposal: &Pubkey,
    ) -> Result<Vec<VoteRecordAccount>> {
        let accounts = self
            .program_accounts(
                &[VOTE_RECORD_V1, VOTE_RECORD_V2],
                &[(PROPOSAL_OFFSET, *proposal)],
            )
            .await?;

        Ok(accounts
            .into_iter()
            .filter_map(|(pubkey, account)| {
                let version = if account.data.first() == Some(&VOTE_RECORD_V1) {
                    VoteRecordVersion::V1
                } else {
                    VoteRecordVersion::V2
                };

                match decode(&self.program_id, pubkey, account, get_vote_record_data) {
                    Ok(data) => Some(VoteRecordAccount::from_data(pubkey, version, data)),
                    Err(e) => {
                        warn!("Skipping vote record: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.client.get_latest_blockhash().await.map_err(rpc_error)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(rpc_error)
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        self.client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(|e| Error::Transaction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_discriminators() {
        assert_eq!(VOTE_RECORD_V1, 7);
        assert_eq!(VOTE_RECORD_V2, 12);
        assert!(!GOVERNANCE_TYPES.contains(&VOTE_RECORD_V1));
        assert!(!PROPOSAL_TYPES.contains(&VOTE_RECORD_V2));
    }

    #[test]
    fn test_client_keeps_program_id() {
        let program_id = Pubkey::new_unique();
        let client = RpcGovernanceClient::new("http://localhost:8899", program_id);
        assert_eq!(client.program_id(), program_id);
        assert_eq!(client.url(), "http://localhost:8899");
    }
}
