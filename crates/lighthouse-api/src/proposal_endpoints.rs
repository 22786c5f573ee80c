//! Proposal routes. Each one creates a council proposal on the realm's council
//! mint governance, fills it with the instructions for its action, and returns
//! the transactions partially signed by the community's gas tank.

use {
    crate::{
        action_client::Action,
        rest::AppState,
        types::{whole_percentage, ApiError, ApiJson, ApiResponse, ApiResult},
    },
    axum::{
        extract::{Path, State},
        routing::post,
        Json, Router,
    },
    lighthouse_common::utils::string_to_pubkey,
    lighthouse_governance::{
        get_realm_info,
        proposal::{
            change_yes_threshold, decompile_transaction, insert_instructions_and_sign_off,
            with_create_proposal,
        },
        serialize_partially_signed,
        spl_governance::instruction::set_governance_config,
        token::{with_create_associated_token_account, with_mint_to},
        ProposalAction, ProposalDraft, RealmInfo,
    },
    serde::{Deserialize, Serialize},
    serde_json::json,
    solana_sdk::{
        instruction::Instruction,
        pubkey::Pubkey,
        signature::{Keypair, Signer},
    },
    tracing::info,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalTransactions {
    /// Wire transactions, proposal creation first, each as a byte array
    pub serialized_txns: Vec<Vec<u8>>,
    pub proposal_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminRequest {
    pub new_admin: String,
    pub proposer: String,
    pub multisig_realm: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMultisigAdminRequest {
    pub new_admin: String,
    pub proposer: String,
    pub realm_pk: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLogRequest {
    pub receiver: String,
    pub realm_pk: String,
    pub amount: f64,
    pub reason: String,
    pub tags: String,
    pub points_breakdown: String,
    pub proposer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPointsRequest {
    pub receiver: String,
    pub realm_pk: String,
    pub amount: f64,
    pub reason: String,
    pub proposer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeConfigRequest {
    pub proposer: String,
    pub realm_pk: String,
    pub new_yes_vote_percentage: f64,
}

pub fn create_proposal_router() -> Router<AppState> {
    Router::new()
        .route("/:community/addAdminProposal", post(add_admin_proposal))
        .route(
            "/:community/addMultisigAdminProposal",
            post(add_multisig_admin_proposal),
        )
        .route("/:community/addLogProposal", post(add_log_proposal))
        .route("/:community/addPointsProposal", post(add_points_proposal))
        .route("/:community/changeConfigProposal", post(change_config_proposal))
}

/// Gas tank and realm info for a proposal by `proposer` in `realm`
async fn prepare(
    state: &AppState,
    community: &str,
    realm: &Pubkey,
    proposer: &Pubkey,
) -> Result<(Keypair, RealmInfo), ApiError> {
    let gas_tank = state.gas_tank.gas_tank(community).await?;
    let info = get_realm_info(state.rpc.as_ref(), realm, proposer).await?;
    Ok((gas_tank, info))
}

/// Create the proposal, insert `inner` and sign off, then pack and partially
/// sign everything with the gas tank.
async fn build_proposal(
    state: &AppState,
    gas_tank: &Keypair,
    info: &RealmInfo,
    proposer: Pubkey,
    action: ProposalAction,
    inner: Vec<Instruction>,
) -> ApiResult<ProposalTransactions> {
    let program_id = state.rpc.program_id();
    let draft = ProposalDraft::for_council(info, proposer, gas_tank.pubkey(), &action);

    let mut proposal_instructions = Vec::new();
    let proposal = with_create_proposal(&mut proposal_instructions, &program_id, &draft);

    let mut insert_instructions = Vec::new();
    insert_instructions_and_sign_off(
        &mut insert_instructions,
        &program_id,
        &draft,
        &proposal,
        inner,
    )?;

    let blockhash = state.rpc.get_latest_blockhash().await?;
    let serialized_txns = serialize_partially_signed(
        vec![proposal_instructions, insert_instructions],
        gas_tank,
        blockhash,
    )?;

    state.metrics.increment("proposals_built").await;
    info!(
        "Built proposal {} \"{}\" in realm {} ({} transactions)",
        proposal,
        draft.name,
        info.realm,
        serialized_txns.len()
    );

    Ok(Json(ApiResponse::success(ProposalTransactions {
        serialized_txns,
        proposal_address: proposal.to_string(),
    })))
}

/// Ask the action API for the instructions of `action` and decode them.
async fn action_instructions(
    state: &AppState,
    community: &str,
    action: Action,
    body: serde_json::Value,
) -> Result<Vec<Instruction>, ApiError> {
    let bytes = state.actions.request(community, action, body).await?;
    decompile_transaction(&bytes).map_err(|e| ApiError::Upstream(e.to_string()))
}

pub async fn add_admin_proposal(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<AddAdminRequest>,
) -> ApiResult<ProposalTransactions> {
    let new_admin = string_to_pubkey(&request.new_admin)?;
    let proposer = string_to_pubkey(&request.proposer)?;
    let realm = string_to_pubkey(&request.multisig_realm)?;

    let (gas_tank, info) = prepare(&state, &community, &realm, &proposer).await?;
    let dao_wallet = info.native_treasury.to_string();
    let inner = action_instructions(
        &state,
        &community,
        Action::AddAdmin,
        json!({
            "adminAuthority": dao_wallet,
            "newAdmin": new_admin.to_string(),
            "daoWallet": dao_wallet,
        }),
    )
    .await?;

    build_proposal(
        &state,
        &gas_tank,
        &info,
        proposer,
        ProposalAction::AddAdmin { new_admin },
        inner,
    )
    .await
}

pub async fn add_multisig_admin_proposal(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<AddMultisigAdminRequest>,
) -> ApiResult<ProposalTransactions> {
    let new_admin = string_to_pubkey(&request.new_admin)?;
    let proposer = string_to_pubkey(&request.proposer)?;
    let realm = string_to_pubkey(&request.realm_pk)?;

    let (gas_tank, info) = prepare(&state, &community, &realm, &proposer).await?;

    // Executed by the governance: the treasury pays for the ATA and the
    // council mint governance holds the mint authority.
    let mut inner = Vec::new();
    let ata = with_create_associated_token_account(
        &mut inner,
        &info.native_treasury,
        &new_admin,
        &info.council_mint,
    );
    with_mint_to(
        &mut inner,
        &info.council_mint,
        &ata,
        &info.council_mint_governance,
        1,
    )?;

    build_proposal(
        &state,
        &gas_tank,
        &info,
        proposer,
        ProposalAction::AddMultisigMember { new_admin },
        inner,
    )
    .await
}

pub async fn add_log_proposal(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<AddLogRequest>,
) -> ApiResult<ProposalTransactions> {
    let receiver = string_to_pubkey(&request.receiver)?;
    let proposer = string_to_pubkey(&request.proposer)?;
    let realm = string_to_pubkey(&request.realm_pk)?;
    if !request.amount.is_finite() {
        return Err(ApiError::BadRequest("amount must be a number".to_string()));
    }

    let (gas_tank, info) = prepare(&state, &community, &realm, &proposer).await?;
    let dao_wallet = info.native_treasury.to_string();
    let inner = action_instructions(
        &state,
        &community,
        Action::AddLog,
        json!({
            "receiver": receiver.to_string(),
            "admin": dao_wallet,
            "amount": request.amount,
            "reason": request.reason,
            "tags": request.tags,
            "pointsBreakdown": request.points_breakdown,
            "daoWallet": dao_wallet,
        }),
    )
    .await?;

    build_proposal(
        &state,
        &gas_tank,
        &info,
        proposer,
        ProposalAction::AddLog {
            receiver,
            amount: request.amount,
            reason: request.reason,
            tags: request.tags,
            points_breakdown: request.points_breakdown,
        },
        inner,
    )
    .await
}

pub async fn add_points_proposal(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<AddPointsRequest>,
) -> ApiResult<ProposalTransactions> {
    let receiver = string_to_pubkey(&request.receiver)?;
    let proposer = string_to_pubkey(&request.proposer)?;
    let realm = string_to_pubkey(&request.realm_pk)?;
    if !request.amount.is_finite() {
        return Err(ApiError::BadRequest("amount must be a number".to_string()));
    }

    let (gas_tank, info) = prepare(&state, &community, &realm, &proposer).await?;
    let dao_wallet = info.native_treasury.to_string();
    let inner = action_instructions(
        &state,
        &community,
        Action::AddPoints,
        json!({
            "receiver": receiver.to_string(),
            "admin": dao_wallet,
            "amount": request.amount,
            "daoWallet": dao_wallet,
        }),
    )
    .await?;

    build_proposal(
        &state,
        &gas_tank,
        &info,
        proposer,
        ProposalAction::AddPoints {
            receiver,
            amount: request.amount,
            reason: request.reason,
        },
        inner,
    )
    .await
}

pub async fn change_config_proposal(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<ChangeConfigRequest>,
) -> ApiResult<ProposalTransactions> {
    let proposer = string_to_pubkey(&request.proposer)?;
    let realm = string_to_pubkey(&request.realm_pk)?;
    let percentage = whole_percentage("newYesVotePercentage", request.new_yes_vote_percentage)?;

    let (gas_tank, info) = prepare(&state, &community, &realm, &proposer).await?;
    let config = change_yes_threshold(&info.governance.config, percentage)?;
    let inner = vec![set_governance_config(
        &state.rpc.program_id(),
        &info.council_mint_governance,
        config,
    )];

    build_proposal(
        &state,
        &gas_tank,
        &info,
        proposer,
        ProposalAction::ChangeConfig {
            yes_vote_percentage: percentage,
        },
        inner,
    )
    .await
}
