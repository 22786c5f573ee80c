//! lighthouse-api - HTTP surface of the lighthouse governance service
//!
//! Builds proposal and realm transactions for a wallet to countersign and
//! serves the proposals and vote records mirrored by the indexer.

pub mod action_client;
pub mod gas_tank;
pub mod health;
pub mod index_endpoints;
pub mod metrics;
pub mod proposal_endpoints;
pub mod realm_endpoints;
pub mod rest;
pub mod types;

#[cfg(test)]
mod test_support;

pub use action_client::{ActionApi, ActionClient};
pub use gas_tank::{GasTankSource, RemoteGasTank, StaticGasTank};
pub use health::HealthService;
pub use metrics::MetricsService;
pub use rest::{create_router, ApiConfig, ApiServer, AppState};
pub use types::{ApiError, ApiJson, ApiResponse, HealthCheckResult, HealthResponse, HealthStatus, StatusResponse};
