use {
    crate::{
        action_client::ActionApi,
        gas_tank::GasTankSource,
        health::HealthService,
        index_endpoints::create_index_router,
        metrics::MetricsService,
        proposal_endpoints::create_proposal_router,
        realm_endpoints::create_realm_router,
        types::{ApiResponse, HealthResponse, StatusResponse},
    },
    axum::{
        extract::State,
        http::{header, Method},
        routing::get,
        Json, Router,
    },
    lighthouse_governance::GovernanceRpc,
    lighthouse_indexer::RealmSyncer,
    lighthouse_store::Storage,
    solana_sdk::pubkey::Pubkey,
    std::{net::SocketAddr, sync::Arc, time::Instant},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<HealthService>,
    pub metrics: Arc<MetricsService>,
    pub start_time: Instant,
    pub service_name: String,
    pub version: String,
    /// Cluster proposals and realms are built against
    pub rpc: Arc<dyn GovernanceRpc>,
    pub store: Arc<dyn Storage>,
    /// Indexer over the indexing cluster, shares `store`
    pub syncer: Arc<RealmSyncer>,
    pub gas_tank: Arc<dyn GasTankSource>,
    pub actions: Arc<dyn ActionApi>,
    /// Realm synced by `/updateDB` when the request names none
    pub default_realm: Option<Pubkey>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub service_name: String,
    pub version: String,
    pub path_prefix: Option<String>,
}

pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn health(&self) -> Arc<HealthService> {
        self.state.health.clone()
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        tracing::info!(
            "Starting {} API server on {}",
            self.config.service_name,
            self.config.bind_addr
        );

        let router = create_router(self.state.clone(), self.config.path_prefix.as_deref());

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("Listening on {}", self.config.bind_addr);

        axum::serve(listener, router).await?;

        Ok(())
    }
}

pub fn create_router(state: AppState, path_prefix: Option<&str>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .merge(create_proposal_router())
        .merge(create_realm_router())
        .merge(create_index_router());

    if let Some(prefix) = path_prefix.filter(|p| !p.is_empty() && *p != "/") {
        router = Router::new().nest(prefix, router);
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.health.check_all().await)
}

async fn status_handler(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let mut additional = std::collections::HashMap::new();
    additional.insert(
        "governanceProgramId".to_string(),
        serde_json::json!(state.rpc.program_id().to_string()),
    );
    if let Some(realm) = state.default_realm {
        additional.insert("defaultRealm".to_string(), serde_json::json!(realm.to_string()));
    }

    let status = StatusResponse {
        name: state.service_name.clone(),
        version: state.version.clone(),
        uptime: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        additional,
    };

    Json(ApiResponse::success(status))
}

async fn metrics_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.metrics.get_metrics().await)
}
