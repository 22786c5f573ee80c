use {
    crate::{accounts::GovernanceAccount, rpc::GovernanceRpc},
    lighthouse_common::{Error, Result},
    solana_sdk::pubkey::Pubkey,
    spl_governance::state::native_treasury::get_native_treasury_address,
    tracing::debug,
};

/// Everything a proposal builder needs to know about a council-governed realm
#[derive(Debug, Clone, PartialEq)]
pub struct RealmInfo {
    pub realm: Pubkey,
    pub council_mint: Pubkey,
    pub council_mint_governance: Pubkey,
    pub governance: GovernanceAccount,
    /// Native treasury of the council mint governance, the DAO wallet
    pub native_treasury: Pubkey,
    /// The proposer's council token owner record
    pub token_owner_record: Pubkey,
    pub proposal_count: usize,
}

/// Resolve the council mint, its governance, the native treasury, the
/// proposer's token owner record and the number of proposals for `realm`.
pub async fn get_realm_info<R>(rpc: &R, realm: &Pubkey, proposer: &Pubkey) -> Result<RealmInfo>
where
    R: GovernanceRpc + ?Sized,
{
    let program_id = rpc.program_id();
    let realm_account = rpc.get_realm(realm).await?;

    let council_mint = realm_account
        .council_mint
        .ok_or_else(|| Error::Governance(format!("realm {} has no council mint", realm)))?;

    let governance = rpc
        .get_governances_by_governed_account(&council_mint)
        .await?
        .into_iter()
        .find(|governance| governance.realm == *realm)
        .ok_or_else(|| {
            Error::NotFound(format!(
                "no governance over council mint {} in realm {}",
                council_mint, realm
            ))
        })?;

    let native_treasury = get_native_treasury_address(&program_id, &governance.pubkey);

    let token_owner_record = rpc
        .get_token_owner_records(realm, Some(council_mint), Some(*proposer))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::NotFound(format!(
                "proposer {} has no token owner record in realm {}",
                proposer, realm
            ))
        })?;

    let proposal_count = rpc
        .get_proposals_by_governance(&governance.pubkey)
        .await?
        .len();

    debug!(
        "Realm {} council mint {} governance {} treasury {} proposals {}",
        realm, council_mint, governance.pubkey, native_treasury, proposal_count
    );

    Ok(RealmInfo {
        realm: *realm,
        council_mint,
        council_mint_governance: governance.pubkey,
        governance,
        native_treasury,
        token_owner_record: token_owner_record.pubkey,
        proposal_count,
    })
}
