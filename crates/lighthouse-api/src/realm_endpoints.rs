use {
    crate::{
        rest::AppState,
        types::{whole_percentage, ApiError, ApiJson, ApiResponse, ApiResult},
    },
    axum::{
        extract::{Path, State},
        routing::post,
        Json, Router,
    },
    lighthouse_common::{utils::string_to_pubkey, Error},
    lighthouse_governance::{
        batching::sign_transaction,
        realm::{plan_realm, RealmRequest},
        serialize_partially_signed,
        token::MINT_LEN,
    },
    serde::{Deserialize, Serialize},
    solana_sdk::{signature::Signer, transaction::Transaction},
    tracing::info,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRealmRequest {
    /// Percentage in (0, 100), rounded down to a whole percent
    pub yes_vote_threshold: f64,
    pub council_member_pks: Vec<String>,
    pub wallet_pk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRealmResponse {
    pub serialized_txns: Vec<Vec<u8>>,
    pub realm_pk: String,
    pub council_mint_gov_pk: String,
    pub dao_wallet: String,
    /// Signature of the already submitted mint setup transaction
    pub mint_setup_signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmInfoRequest {
    pub council_mint_gov_pk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceSummary {
    pub quorum_percentage: Option<u8>,
    pub proposal_count: usize,
    pub voting_proposal_count: u64,
    pub max_voting_time: u32,
    pub min_council_tokens_to_create_proposal: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StewardsRequest {
    pub realm_pk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StewardsResponse {
    pub stewards: Vec<String>,
}

pub fn create_realm_router() -> Router<AppState> {
    Router::new()
        .route("/:community/createRealm", post(create_realm))
        .route("/getRealmInfo", post(get_realm_info))
        .route("/getRealmStewards", post(get_realm_stewards))
}

/// Submit the mint setup right away, return the rest of the realm setup for
/// the wallet to countersign.
pub async fn create_realm(
    State(state): State<AppState>,
    Path(community): Path<String>,
    ApiJson(request): ApiJson<CreateRealmRequest>,
) -> ApiResult<CreateRealmResponse> {
    let yes_vote_threshold = whole_percentage("yesVoteThreshold", request.yes_vote_threshold)?;
    let wallet = string_to_pubkey(&request.wallet_pk)?;
    let council_members = request
        .council_member_pks
        .iter()
        .map(|key| string_to_pubkey(key))
        .collect::<Result<Vec<_>, _>>()?;
    if !council_members.contains(&wallet) {
        return Err(ApiError::Unauthorized(
            "Current wallet must be a member of the realm".to_string(),
        ));
    }

    let gas_tank = state.gas_tank.gas_tank(&community).await?;
    let program_id = state.rpc.program_id();
    let rent = state
        .rpc
        .get_minimum_balance_for_rent_exemption(MINT_LEN)
        .await?;

    let plan = plan_realm(
        &program_id,
        &RealmRequest {
            community: community.clone(),
            wallet,
            council_members,
            yes_vote_threshold,
        },
        &gas_tank.pubkey(),
        rent,
    )?;

    let blockhash = state.rpc.get_latest_blockhash().await?;
    let mint_setup = {
        let mut signers: Vec<&dyn Signer> = vec![&gas_tank];
        signers.extend(plan.mint_signers.iter().map(|k| k as &dyn Signer));

        let mut transaction =
            Transaction::new_with_payer(&plan.mint_setup, Some(&gas_tank.pubkey()));
        sign_transaction(&mut transaction, &signers, blockhash)?;
        transaction
    };
    let signature = state.rpc.send_and_confirm_transaction(&mint_setup).await?;
    info!("Mint setup for {} confirmed: {}", plan.realm, signature);

    let blockhash = state.rpc.get_latest_blockhash().await?;
    let serialized_txns = serialize_partially_signed(vec![plan.realm_setup], &gas_tank, blockhash)?;

    state.metrics.increment("realms_created").await;
    Ok(Json(ApiResponse::success(CreateRealmResponse {
        serialized_txns,
        realm_pk: plan.realm.to_string(),
        council_mint_gov_pk: plan.council_mint_governance.to_string(),
        dao_wallet: plan.dao_wallet.to_string(),
        mint_setup_signature: signature.to_string(),
    })))
}

pub async fn get_realm_info(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RealmInfoRequest>,
) -> ApiResult<GovernanceSummary> {
    let governance_key = string_to_pubkey(&request.council_mint_gov_pk)?;
    let governance = state.rpc.get_governance(&governance_key).await?;
    let proposals = state.rpc.get_proposals_by_governance(&governance_key).await?;

    Ok(Json(ApiResponse::success(GovernanceSummary {
        quorum_percentage: governance.yes_vote_percentage(),
        proposal_count: proposals.len(),
        voting_proposal_count: governance.active_proposal_count,
        max_voting_time: governance.config.voting_base_time,
        min_council_tokens_to_create_proposal: governance
            .config
            .min_council_weight_to_create_proposal,
    })))
}

pub async fn get_realm_stewards(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StewardsRequest>,
) -> ApiResult<StewardsResponse> {
    let realm_key = string_to_pubkey(&request.realm_pk)?;
    let realm = state.rpc.get_realm(&realm_key).await?;
    let council_mint = realm
        .council_mint
        .ok_or_else(|| Error::Governance(format!("realm {} has no council mint", realm_key)))?;

    let stewards = state
        .rpc
        .get_token_owner_records(&realm_key, Some(council_mint), None)
        .await?
        .into_iter()
        .map(|record| record.governing_token_owner.to_string())
        .collect();

    Ok(Json(ApiResponse::success(StewardsResponse { stewards })))
}

#[cfg(test)]
mod tests {
    use {
        crate::{
            rest::create_router,
            test_support::{body_json, post_json, test_state, FakeChain},
        },
        axum::http::StatusCode,
        solana_sdk::pubkey::Pubkey,
        tower::ServiceExt,
    };

    #[tokio::test]
    async fn test_create_realm() {
        let chain = FakeChain::new();
        let (state, _) = test_state(chain.clone());
        let router = create_router(state, None);
        let wallet = Pubkey::new_unique();

        let response = router
            .oneshot(post_json(
                "/lighthouse/createRealm",
                serde_json::json!({
                    "yesVoteThreshold": 60,
                    "councilMemberPks": [wallet.to_string(), Pubkey::new_unique().to_string()],
                    "walletPk": wallet.to_string(),
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(!body["data"]["serializedTxns"].as_array().unwrap().is_empty());
        assert!(body["data"]["daoWallet"].is_string());
        assert_eq!(chain.sent_transactions(), 1);
    }

    #[tokio::test]
    async fn test_create_realm_requires_wallet_membership() {
        let chain = FakeChain::new();
        let (state, _) = test_state(chain.clone());
        let router = create_router(state, None);

        let response = router
            .oneshot(post_json(
                "/lighthouse/createRealm",
                serde_json::json!({
                    "yesVoteThreshold": 60,
                    "councilMemberPks": [Pubkey::new_unique().to_string()],
                    "walletPk": Pubkey::new_unique().to_string(),
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(chain.sent_transactions(), 0);
    }

    #[tokio::test]
    async fn test_create_realm_threshold_bounds() {
        let chain = FakeChain::new();
        let (state, _) = test_state(chain.clone());
        let router = create_router(state, None);
        let wallet = Pubkey::new_unique().to_string();

        for (threshold, status) in [
            (serde_json::json!(150), StatusCode::BAD_REQUEST),
            (serde_json::json!("sixty"), StatusCode::BAD_REQUEST),
            (serde_json::json!(55.5), StatusCode::OK),
        ] {
            let response = router
                .clone()
                .oneshot(post_json(
                    "/lighthouse/createRealm",
                    serde_json::json!({
                        "yesVoteThreshold": threshold,
                        "councilMemberPks": [wallet],
                        "walletPk": wallet,
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), status, "{}", threshold);
        }
        assert_eq!(chain.sent_transactions(), 1);
    }

    #[tokio::test]
    async fn test_get_realm_info_and_stewards() {
        let chain = FakeChain::new();
        let (state, _) = test_state(chain.clone());
        let router = create_router(state, None);

        let response = router
            .clone()
            .oneshot(post_json(
                "/getRealmInfo",
                serde_json::json!({ "councilMintGovPk": chain.governance().pubkey.to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["quorumPercentage"], 60);
        assert_eq!(body["data"]["maxVotingTime"], 259_200);

        let response = router
            .oneshot(post_json(
                "/getRealmStewards",
                serde_json::json!({ "realmPk": chain.realm.to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["data"]["stewards"],
            serde_json::json!([chain.proposer.to_string()])
        );
    }
}
