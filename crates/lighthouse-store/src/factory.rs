use {
    crate::{memory_store::MemoryStore, postgres_store::PostgresStore, traits::Storage},
    lighthouse_common::{DatabaseConfig, Result},
    std::sync::Arc,
    tracing::info,
};

/// Create the store selected by `config`: `memory://` gives the in-process
/// store, anything else is treated as a PostgreSQL connection string.
pub async fn create_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    if config.is_memory() {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PostgresStore::new(config).await?;
    Ok(Arc::new(store))
}
