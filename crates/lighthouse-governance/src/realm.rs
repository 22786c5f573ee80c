//! Realm creation plan: two mints, council tokens for every member, the realm,
//! a governance per mint with its native treasury, and the realm authority
//! handed over to the community governance.

use {
    crate::token::{
        mint_natural_amount, with_create_mint, with_mint_single_token, with_set_mint_authority,
    },
    lighthouse_common::{utils::seconds_from_days, Error, Result},
    solana_sdk::{
        instruction::Instruction,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
    },
    spl_associated_token_account::get_associated_token_address,
    spl_governance::{
        instruction::{
            create_governance, create_native_treasury, create_realm, deposit_governing_tokens,
            set_realm_authority,
        },
        state::{
            enums::{MintMaxVoterWeightSource, VoteThreshold, VoteTipping},
            governance::{get_governance_address, GovernanceConfig},
            native_treasury::get_native_treasury_address,
            realm::{get_realm_address, SetRealmAuthorityAction},
            token_owner_record::get_token_owner_record_address,
        },
    },
    tracing::info,
};

pub const COMMUNITY_MINT_DECIMALS: u8 = 6;
pub const COUNCIL_MINT_DECIMALS: u8 = 0;
/// Community tokens needed to create a governance or a proposal
pub const MIN_COMMUNITY_WEIGHT_TOKENS: f64 = 1_000_000.0;
pub const VOTING_BASE_TIME_SECONDS: u32 = seconds_from_days(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmRequest {
    pub community: String,
    /// The wallet that countersigns the realm setup; must be a council member
    pub wallet: Pubkey,
    pub council_members: Vec<Pubkey>,
    pub yes_vote_threshold: u8,
}

impl RealmRequest {
    pub fn realm_name(&self) -> String {
        format!("{}-multisig", self.community)
    }
}

/// Instructions and addresses for a new multisig realm.
///
/// `mint_setup` is signed by the gas tank and the mint keypairs in
/// `mint_signers`. `realm_setup` additionally needs the wallet's signature.
#[derive(Debug)]
pub struct RealmPlan {
    pub realm: Pubkey,
    pub community_mint: Pubkey,
    pub council_mint: Pubkey,
    pub community_mint_governance: Pubkey,
    pub council_mint_governance: Pubkey,
    pub dao_wallet: Pubkey,
    pub mint_signers: Vec<Keypair>,
    pub mint_setup: Vec<Instruction>,
    pub realm_setup: Vec<Instruction>,
}

pub fn realm_governance_config(yes_vote_threshold: u8) -> Result<GovernanceConfig> {
    if yes_vote_threshold == 0 || yes_vote_threshold >= 100 {
        return Err(Error::Validation(format!(
            "yes vote threshold must be between 1 and 99, got {}",
            yes_vote_threshold
        )));
    }

    Ok(GovernanceConfig {
        community_vote_threshold: VoteThreshold::YesVotePercentage(yes_vote_threshold),
        min_community_weight_to_create_proposal: mint_natural_amount(
            MIN_COMMUNITY_WEIGHT_TOKENS,
            COMMUNITY_MINT_DECIMALS,
        )?,
        min_transaction_hold_up_time: 0,
        voting_base_time: VOTING_BASE_TIME_SECONDS,
        community_vote_tipping: VoteTipping::Strict,
        council_vote_threshold: VoteThreshold::YesVotePercentage(yes_vote_threshold),
        council_veto_vote_threshold: VoteThreshold::Disabled,
        min_council_weight_to_create_proposal: 1,
        council_vote_tipping: VoteTipping::Strict,
        community_veto_vote_threshold: VoteThreshold::Disabled,
        voting_cool_off_time: 0,
        deposit_exempt_proposal_count: 10,
    })
}

/// Plan a realm with freshly generated mints.
pub fn plan_realm(
    program_id: &Pubkey,
    request: &RealmRequest,
    gas_tank: &Pubkey,
    mint_rent_lamports: u64,
) -> Result<RealmPlan> {
    plan_realm_with_mints(
        program_id,
        request,
        gas_tank,
        mint_rent_lamports,
        Keypair::new(),
        Keypair::new(),
    )
}

pub fn plan_realm_with_mints(
    program_id: &Pubkey,
    request: &RealmRequest,
    gas_tank: &Pubkey,
    mint_rent_lamports: u64,
    community_mint: Keypair,
    council_mint: Keypair,
) -> Result<RealmPlan> {
    let config = realm_governance_config(request.yes_vote_threshold)?;

    let mut members: Vec<Pubkey> = Vec::with_capacity(request.council_members.len());
    for member in &request.council_members {
        if !members.contains(member) {
            members.push(*member);
        }
    }
    if !members.contains(&request.wallet) {
        return Err(Error::Unauthorized(
            "Current wallet must be a member of the realm".to_string(),
        ));
    }

    let wallet = request.wallet;
    let community_mint_key = community_mint.pubkey();
    let council_mint_key = council_mint.pubkey();

    let mut mint_setup = Vec::new();
    with_create_mint(
        &mut mint_setup,
        gas_tank,
        &community_mint_key,
        &wallet,
        COMMUNITY_MINT_DECIMALS,
        mint_rent_lamports,
    )?;
    with_create_mint(
        &mut mint_setup,
        gas_tank,
        &council_mint_key,
        &wallet,
        COUNCIL_MINT_DECIMALS,
        mint_rent_lamports,
    )?;

    let mut realm_setup = Vec::new();
    for member in &members {
        with_mint_single_token(&mut realm_setup, gas_tank, &council_mint_key, &wallet, member)?;
    }

    let realm_name = request.realm_name();
    let realm = get_realm_address(program_id, &realm_name);
    realm_setup.push(create_realm(
        program_id,
        gas_tank,
        &community_mint_key,
        gas_tank,
        Some(council_mint_key),
        None,
        None,
        realm_name,
        config.min_community_weight_to_create_proposal,
        MintMaxVoterWeightSource::FULL_SUPPLY_FRACTION,
    ));

    realm_setup.push(deposit_governing_tokens(
        program_id,
        &realm,
        &get_associated_token_address(&wallet, &council_mint_key),
        &wallet,
        &wallet,
        gas_tank,
        1,
        &council_mint_key,
    ));
    let token_owner_record =
        get_token_owner_record_address(program_id, &realm, &council_mint_key, &wallet);

    let mut governances = Vec::with_capacity(2);
    for mint in [community_mint_key, council_mint_key] {
        realm_setup.push(create_governance(
            program_id,
            &realm,
            Some(&mint),
            &token_owner_record,
            gas_tank,
            &wallet,
            None,
            config.clone(),
        ));
        let governance = get_governance_address(program_id, &realm, &mint);
        with_set_mint_authority(&mut realm_setup, &mint, &wallet, &governance)?;
        realm_setup.push(create_native_treasury(program_id, &governance, gas_tank));
        governances.push(governance);
    }
    let (community_mint_governance, council_mint_governance) = (governances[0], governances[1]);

    realm_setup.push(set_realm_authority(
        program_id,
        &realm,
        gas_tank,
        Some(&community_mint_governance),
        SetRealmAuthorityAction::SetChecked,
    ));

    let dao_wallet = get_native_treasury_address(program_id, &council_mint_governance);
    info!(
        "Planned realm {} ({} council members, dao wallet {})",
        realm,
        members.len(),
        dao_wallet
    );

    Ok(RealmPlan {
        realm,
        community_mint: community_mint_key,
        council_mint: council_mint_key,
        community_mint_governance,
        council_mint_governance,
        dao_wallet,
        mint_signers: vec![community_mint, council_mint],
        mint_setup,
        realm_setup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(wallet: Pubkey, members: Vec<Pubkey>) -> RealmRequest {
        RealmRequest {
            community: "lighthouse".to_string(),
            wallet,
            council_members: members,
            yes_vote_threshold: 60,
        }
    }

    #[test]
    fn test_plan_addresses() {
        let program_id = Pubkey::new_unique();
        let gas_tank = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let community = Keypair::new();
        let council = Keypair::new();
        let (community_key, council_key) = (community.pubkey(), council.pubkey());

        let plan = plan_realm_with_mints(
            &program_id,
            &request(wallet, vec![wallet, Pubkey::new_unique()]),
            &gas_tank,
            1_461_600,
            community,
            council,
        )
        .unwrap();

        assert_eq!(plan.realm, get_realm_address(&program_id, "lighthouse-multisig"));
        assert_eq!(plan.community_mint, community_key);
        assert_eq!(plan.council_mint, council_key);
        assert_eq!(
            plan.council_mint_governance,
            get_governance_address(&program_id, &plan.realm, &council_key)
        );
        assert_eq!(
            plan.dao_wallet,
            get_native_treasury_address(&program_id, &plan.council_mint_governance)
        );
        assert_eq!(plan.mint_signers.len(), 2);
        assert_eq!(plan.mint_setup.len(), 4);
    }

    #[test]
    fn test_realm_setup_layout() {
        let program_id = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let other = Pubkey::new_unique();

        let plan = plan_realm(
            &program_id,
            &request(wallet, vec![wallet, other, other]),
            &Pubkey::new_unique(),
            1,
        )
        .unwrap();

        // 2 members x (ata + mint), realm, deposit, 2 x (governance + authority + treasury), realm authority
        assert_eq!(plan.realm_setup.len(), 4 + 1 + 1 + 6 + 1);
        let last = plan.realm_setup.last().unwrap();
        assert_eq!(last.program_id, program_id);
        assert_eq!(
            plan.realm_setup
                .iter()
                .filter(|ix| ix.program_id == program_id)
                .count(),
            1 + 1 + 4 + 1
        );
    }

    #[test]
    fn test_wallet_must_be_member() {
        let err = plan_realm(
            &Pubkey::new_unique(),
            &request(Pubkey::new_unique(), vec![Pubkey::new_unique()]),
            &Pubkey::new_unique(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_governance_config() {
        let config = realm_governance_config(60).unwrap();
        assert_eq!(config.council_vote_threshold, VoteThreshold::YesVotePercentage(60));
        assert_eq!(config.min_community_weight_to_create_proposal, 1_000_000_000_000);
        assert_eq!(config.voting_base_time, 259_200);
        assert!(realm_governance_config(0).is_err());
        assert!(realm_governance_config(100).is_err());
    }
}
