use {
    anyhow::Result,
    clap::Parser,
    lighthouse_common::{utils::string_to_pubkey, ServiceConfig},
    lighthouse_governance::RpcGovernanceClient,
    lighthouse_indexer::{tracked_realms, RealmSyncer},
    lighthouse_store::create_storage,
    std::{path::PathBuf, sync::Arc, time::Duration},
    tracing::{error, info, warn},
    tracing_subscriber::EnvFilter,
};

#[derive(Parser, Debug)]
#[clap(
    version,
    about = "Governance indexer for lighthouse",
    long_about = "Mirrors finished proposals and their vote records into the database"
)]
struct Args {
    /// JSON config file, environment variables override it
    #[clap(long, env = "LIGHTHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Sync once and exit
    #[clap(long)]
    once: bool,

    /// Realm to sync instead of the configured ones
    #[clap(long)]
    realm: Option<String>,

    /// Seconds between syncs, overrides the config
    #[clap(long)]
    interval_seconds: Option<u64>,
}

async fn sync_all(syncer: &RealmSyncer, realms: &[solana_sdk::pubkey::Pubkey]) {
    for realm in realms {
        match syncer.sync(realm).await {
            Ok(report) if report.up_to_date => info!("Realm {} already up to date", realm),
            Ok(report) => info!(
                "Realm {} synced: {} new proposals, {} vote records",
                realm, report.new_proposals, report.vote_records
            ),
            Err(e) => error!("Failed to sync realm {}: {}", realm, e),
        }
    }
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
    let rpc = Arc::new(RpcGovernanceClient::new(
        config.indexer_rpc_url.clone(),
        program_id,
    ));
    let rpc_url = rpc.url();
    let store = create_storage(&config.database).await?;
    let syncer = RealmSyncer::new(rpc, store.clone(), config.indexer.max_concurrent_requests);

    let pinned_realm = args.realm.as_deref().map(string_to_pubkey).transpose()?;
    let default_realm = config.default_realm()?;
    let interval = Duration::from_secs(
        args.interval_seconds
            .unwrap_or(config.indexer.interval_seconds)
            .max(1),
    );

    info!("Starting indexer against {} (program {})", rpc_url, program_id);

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let realms = match pinned_realm {
                    Some(realm) => vec![realm],
                    None => match tracked_realms(store.as_ref(), default_realm).await {
                        Ok(realms) => realms,
                        Err(e) => {
                            error!("Failed to list subscribed realms: {}", e);
                            default_realm.into_iter().collect()
                        }
                    },
                };

                if realms.is_empty() {
                    warn!("No realm configured or subscribed, nothing to index");
                }
                sync_all(&syncer, &realms).await;

                if args.once {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    store.close().await?;
    info!("Indexer stopped");
    Ok(())
}
