use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSettings {
    /// Realm synced when a sync request does not name one
    pub default_realm: Option<String>,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Upper bound on in-flight `getProgramAccounts` calls during a sync
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_interval_seconds() -> u64 {
    300
}

fn default_max_concurrent_requests() -> usize {
    8
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            default_realm: None,
            interval_seconds: default_interval_seconds(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}
