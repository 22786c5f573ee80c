//! Read and refresh the governance mirror.

use {
    crate::{
        rest::AppState,
        types::{ApiError, ApiJson, ApiResponse, ApiResult},
    },
    axum::{
        body::Bytes,
        extract::State,
        routing::{get, post},
        Json, Router,
    },
    lighthouse_common::{
        types::{ProposalRow, RealmRow, VoteRecordRow},
        utils::string_to_pubkey,
    },
    lighthouse_indexer::SyncReport,
    serde::{Deserialize, Serialize},
    serde_json::json,
    tracing::{info, warn},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInfoRequest {
    pub realm_pub_key: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSnapshot {
    pub proposals: Vec<ProposalRow>,
    pub vote_records: Vec<VoteRecordRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub realm_pub_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub realm_pub_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestResponse {
    pub latest: Option<i64>,
}

pub fn create_index_router() -> Router<AppState> {
    Router::new()
        .route("/getInfo", post(get_info))
        .route("/updateDB", post(update_db))
        .route("/grape", post(update_db))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/getLatest", get(get_latest))
}

pub async fn get_info(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GetInfoRequest>,
) -> ApiResult<RealmSnapshot> {
    let realm = string_to_pubkey(&request.realm_pub_key)?.to_string();
    if let (Some(start), Some(end)) = (request.start, request.end) {
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start {} is after end {}",
                start, end
            )));
        }
    }

    let proposals = state
        .store
        .get_proposals(&realm, request.start, request.end)
        .await?;
    let vote_records = state
        .store
        .get_vote_records(&realm, request.start, request.end)
        .await?;

    Ok(Json(ApiResponse::success(RealmSnapshot {
        proposals,
        vote_records,
    })))
}

/// An empty body reads as no request at all; anything else must parse.
fn parse_update_request(body: &[u8]) -> Result<UpdateRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UpdateRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse the request body: {}", e)))
}

/// Sync one realm now. Without a body or a `realmPubKey` it falls back to the
/// configured default realm.
pub async fn update_db(State(state): State<AppState>, body: Bytes) -> ApiResult<SyncReport> {
    let request = parse_update_request(&body)?;
    let realm = match request.realm_pub_key {
        Some(key) => string_to_pubkey(&key)?,
        None => state.default_realm.ok_or_else(|| {
            ApiError::BadRequest("realmPubKey is required, no default realm is configured".to_string())
        })?,
    };

    state.metrics.increment("sync_requests").await;
    let report = match state.syncer.sync(&realm).await {
        Ok(report) => report,
        Err(e) => {
            state.metrics.increment("sync_failures").await;
            warn!("Sync of realm {} failed: {}", realm, e);
            return Err(e.into());
        }
    };

    state
        .metrics
        .add("vote_records_indexed", report.vote_records as u64)
        .await;
    state
        .metrics
        .set_metric(
            "last_sync",
            json!({
                "realm": report.realm,
                "latestTimestamp": report.latest_timestamp,
            }),
        )
        .await;
    info!(
        "Realm {} synced on request: {} new proposals",
        realm, report.new_proposals
    );
    Ok(Json(ApiResponse::success(report)))
}

pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscriptionRequest>,
) -> ApiResult<RealmRow> {
    let realm = string_to_pubkey(&request.realm_pub_key)?.to_string();
    let row = state
        .store
        .set_subscription(&realm, true, true)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("realm {} was not created", realm)))?;

    info!("Subscribed realm {}", realm);
    Ok(Json(ApiResponse::success(row)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubscriptionRequest>,
) -> ApiResult<RealmRow> {
    let realm = string_to_pubkey(&request.realm_pub_key)?.to_string();
    let row = state
        .store
        .set_subscription(&realm, false, false)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("realm {} is not tracked", realm)))?;

    info!("Unsubscribed realm {}", realm);
    Ok(Json(ApiResponse::success(row)))
}

pub async fn get_latest(State(state): State<AppState>) -> ApiResult<LatestResponse> {
    let latest = state.store.get_latest_vote_record_created_at().await?;
    Ok(Json(ApiResponse::success(LatestResponse { latest })))
}
