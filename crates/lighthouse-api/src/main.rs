use {
    anyhow::{Context, Result},
    clap::Parser,
    lighthouse_api::{
        gas_tank::GasTankSource, health::health_check, ActionClient, ApiConfig, ApiServer,
        AppState, HealthCheckResult, HealthService, MetricsService, RemoteGasTank, StaticGasTank,
    },
    lighthouse_common::{GasTankSourceKind, ServiceConfig},
    lighthouse_governance::{GovernanceRpc, RpcGovernanceClient},
    lighthouse_indexer::RealmSyncer,
    lighthouse_store::{create_storage, Storage},
    std::{future::Future, path::PathBuf, sync::Arc, time::Instant},
    tracing::{error, info},
    tracing_subscriber::EnvFilter,
};

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Lighthouse governance API",
    long_about = "Builds SPL governance proposals and realms for wallets to countersign"
)]
struct Args {
    /// JSON config file, environment variables override it
    #[clap(long, env = "LIGHTHOUSE_CONFIG")]
    config: Option<PathBuf>,
}

fn gas_tank_source(config: &ServiceConfig) -> Result<Arc<dyn GasTankSource>> {
    match (config.gas_tank.source, &config.gas_tank.secret_key) {
        (GasTankSourceKind::Static, Some(secret)) => {
            info!("Using the configured gas tank for every community");
            Ok(Arc::new(
                StaticGasTank::from_base58(secret).context("invalid gas tank secret key")?,
            ))
        }
        (GasTankSourceKind::Static, None) => {
            anyhow::bail!("static gas tank selected but no secret key is configured")
        }
        (GasTankSourceKind::Remote, _) => {
            info!("Fetching gas tanks from {}", config.action_api_url);
            Ok(Arc::new(RemoteGasTank::new(&config.action_api_url)))
        }
    }
}

async fn register_health_checks(
    health: &HealthService,
    rpc: Arc<dyn GovernanceRpc>,
    store: Arc<dyn Storage>,
) {
    health
        .register(
            "rpc",
            health_check(move || {
                let rpc = rpc.clone();
                async move {
                    match rpc.get_latest_blockhash().await {
                        Ok(hash) => HealthCheckResult::healthy(format!("latest blockhash {}", hash)),
                        Err(e) => HealthCheckResult::unhealthy(e.to_string()),
                    }
                }
            }),
        )
        .await;

    health
        .register(
            "store",
            health_check(move || {
                let store = store.clone();
                async move {
                    match store.get_subscribed_realms().await {
                        Ok(realms) => {
                            HealthCheckResult::healthy(format!("{} subscribed realms", realms.len()))
                        }
                        Err(e) => HealthCheckResult::unhealthy(e.to_string()),
                    }
                }
            }),
        )
        .await;
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    }
    .with_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    config.validate()?;

    let program_id = config.program_id()?;
    let rpc: Arc<dyn GovernanceRpc> =
        Arc::new(RpcGovernanceClient::new(config.rpc_url.clone(), program_id));
    let indexer_rpc: Arc<dyn GovernanceRpc> = Arc::new(RpcGovernanceClient::new(
        config.indexer_rpc_url.clone(),
        program_id,
    ));

    let store = create_storage(&config.database).await?;
    let syncer = Arc::new(RealmSyncer::new(
        indexer_rpc,
        store.clone(),
        config.indexer.max_concurrent_requests,
    ));

    let health = Arc::new(HealthService::new());
    register_health_checks(&health, rpc.clone(), store.clone()).await;

    let service_name = "lighthouse-api".to_string();
    let version = env!("CARGO_PKG_VERSION").to_string();

    let state = AppState {
        health,
        metrics: Arc::new(MetricsService::new()),
        start_time: Instant::now(),
        service_name: service_name.clone(),
        version: version.clone(),
        rpc,
        store: store.clone(),
        syncer,
        gas_tank: gas_tank_source(&config)?,
        actions: Arc::new(ActionClient::new(&config.action_api_url)),
        default_realm: config.default_realm()?,
    };

    let server = ApiServer::new(
        ApiConfig {
            bind_addr: config.socket_addr()?,
            service_name,
            version,
            path_prefix: config.path_prefix.clone(),
        },
        state,
    );

    info!(
        "Building against {} (program {}), indexing {}",
        config.rpc_url, program_id, config.indexer_rpc_url
    );

    let served = serve_until_shutdown(server.start(), tokio::signal::ctrl_c()).await;
    if let Err(e) = &served {
        error!("API server error: {:#}", e);
    }

    store.close().await?;
    served
}

/// Run `server` until it stops or `shutdown` resolves. A server that stops on
/// its own is an error for the process.
async fn serve_until_shutdown<F, S>(server: F, shutdown: S) -> Result<()>
where
    F: Future<Output = Result<()>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = server => result.context("API server failed"),
        _ = shutdown => {
            info!("Shutting down...");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_failure_is_returned() {
        let server = async { Err::<(), _>(anyhow::anyhow!("address in use")) };
        let result = serve_until_shutdown(server, std::future::pending()).await;
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("address in use"));
    }

    #[tokio::test]
    async fn test_shutdown_signal_is_clean() {
        let shutdown = async { Ok::<(), std::io::Error>(()) };
        let result = serve_until_shutdown(std::future::pending(), shutdown).await;
        assert!(result.is_ok());
    }
}
