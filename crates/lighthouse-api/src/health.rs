use {
    crate::types::{HealthCheckResult, HealthResponse, HealthStatus},
    std::{collections::HashMap, future::Future, pin::Pin, sync::Arc, time::Instant},
    tokio::sync::RwLock,
};

pub type HealthCheckFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = HealthCheckResult> + Send>> + Send + Sync>;

/// Box an async check into a `HealthCheckFn`.
pub fn health_check<F, Fut>(check: F) -> HealthCheckFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HealthCheckResult> + Send + 'static,
{
    Arc::new(move || {
        Box::pin(check()) as Pin<Box<dyn Future<Output = HealthCheckResult> + Send>>
    })
}

/// Named async checks (RPC reachability, database) run on every `/health`.
pub struct HealthService {
    checks: RwLock<HashMap<String, HealthCheckFn>>,
    start_time: Instant,
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthService {
    pub fn new() -> Self {
        Self {
            checks: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn register(&self, name: &str, check: HealthCheckFn) {
        self.checks.write().await.insert(name.to_string(), check);
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn check_all(&self) -> HealthResponse {
        // Run outside the lock so a slow check does not block registration
        let checks: Vec<(String, HealthCheckFn)> = self
            .checks
            .read()
            .await
            .iter()
            .map(|(name, check)| (name.clone(), check.clone()))
            .collect();

        let mut results = HashMap::new();
        for (name, check) in checks {
            results.insert(name, check().await);
        }

        let healthy = results
            .values()
            .filter(|r| r.status == HealthStatus::Healthy)
            .count();
        let status = if healthy == results.len() {
            HealthStatus::Healthy
        } else if healthy > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthResponse {
            status,
            checks: results,
            uptime: self.uptime(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(result: fn() -> HealthCheckResult) -> HealthCheckFn {
        health_check(move || async move { result() })
    }

    #[tokio::test]
    async fn test_health_aggregation() {
        let health = HealthService::new();
        assert_eq!(health.check_all().await.status, HealthStatus::Healthy);

        health
            .register("rpc", check(|| HealthCheckResult::healthy("ok")))
            .await;
        assert_eq!(health.check_all().await.status, HealthStatus::Healthy);

        health
            .register("store", check(|| HealthCheckResult::unhealthy("down")))
            .await;
        let response = health.check_all().await;
        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.checks.len(), 2);
    }
}
