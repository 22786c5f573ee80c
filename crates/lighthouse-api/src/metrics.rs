use {
    serde_json::Value,
    std::collections::BTreeMap,
    tokio::sync::RwLock,
};

/// Request and pipeline counters served on `/metrics`
#[derive(Debug, Default)]
pub struct MetricsService {
    counters: RwLock<BTreeMap<String, u64>>,
    gauges: RwLock<BTreeMap<String, Value>>,
}

impl MetricsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn increment(&self, key: &str) {
        self.add(key, 1).await;
    }

    pub async fn add(&self, key: &str, amount: u64) {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(key.to_string()).or_insert(0);
        *counter = counter.saturating_add(amount);
    }

    /// Set a metric value
    pub async fn set_metric(&self, key: &str, value: Value) {
        self.gauges.write().await.insert(key.to_string(), value);
    }

    pub async fn get_metrics(&self) -> Value {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;

        serde_json::json!({
            "counters": *counters,
            "gauges": *gauges,
        })
    }
}
