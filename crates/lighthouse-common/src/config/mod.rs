//! Configuration types for the lighthouse governance service

mod database;
mod indexer;

pub use database::DatabaseConfig;
pub use indexer::IndexerSettings;

use {
    serde::{Deserialize, Serialize},
    solana_sdk::pubkey::Pubkey,
    std::{fs, net::SocketAddr, path::Path, str::FromStr},
};

use crate::errors::{Error, Result};

pub const DEFAULT_GOVERNANCE_PROGRAM_ID: &str = "GovER5Lthms3bLBqWub97yVrMmEogzX7xNjdXpPPCVZw";
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GasTankSourceKind {
    /// Fetch the community's wallet info from the action API
    Remote,
    /// One configured keypair pays for every community
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasTankConfig {
    pub source: GasTankSourceKind,
    /// Base58 secret key, required for `Static`
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for GasTankConfig {
    fn default() -> Self {
        Self {
            source: GasTankSourceKind::Remote,
            secret_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Cluster used to build proposals and realms
    pub rpc_url: String,
    /// Cluster the indexer reads from
    pub indexer_rpc_url: String,
    pub governance_program_id: String,
    pub action_api_url: String,
    #[serde(default)]
    pub gas_tank: GasTankConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub indexer: IndexerSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            path_prefix: Some("/api".to_string()),
            log_level: default_log_level(),
            rpc_url: DEVNET_RPC_URL.to_string(),
            indexer_rpc_url: MAINNET_RPC_URL.to_string(),
            governance_program_id: DEFAULT_GOVERNANCE_PROGRAM_ID.to_string(),
            action_api_url: "http://localhost:3000".to_string(),
            gas_tank: GasTankConfig::default(),
            database: DatabaseConfig::default(),
            indexer: IndexerSettings::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str::<Self>(&contents)?)
    }

    /// Overlay environment variables on top of `self`.
    pub fn with_env(mut self) -> Self {
        if let Ok(port) = std::env::var("API_PORT") {
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("RPC_URL") {
            self.rpc_url = url;
        }
        if let Ok(url) = std::env::var("INDEXER_RPC_URL") {
            self.indexer_rpc_url = url;
        }
        if let Ok(id) = std::env::var("GOVERNANCE_PROGRAM_ID") {
            self.governance_program_id = id;
        }
        if let Ok(url) = std::env::var("ACTION_API_URL") {
            self.action_api_url = url;
        }
        if let Ok(secret) = std::env::var("GAS_TANK_SECRET_KEY") {
            self.gas_tank = GasTankConfig {
                source: GasTankSourceKind::Static,
                secret_key: Some(secret),
            };
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.connection_string = url;
        }
        if let Ok(realm) = std::env::var("DEFAULT_REALM") {
            self.indexer.default_realm = Some(realm);
        }
        if let Some(interval) = std::env::var("INDEX_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.indexer.interval_seconds = interval;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        SocketAddr::from_str(&self.bind_addr)
            .map_err(|e| Error::Config(format!("invalid bind address {}: {}", self.bind_addr, e)))
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.governance_program_id).map_err(|e| {
            Error::Config(format!(
                "invalid governance program id {}: {}",
                self.governance_program_id, e
            ))
        })
    }

    pub fn default_realm(&self) -> Result<Option<Pubkey>> {
        self.indexer
            .default_realm
            .as_deref()
            .map(|realm| {
                Pubkey::from_str(realm)
                    .map_err(|e| Error::Config(format!("invalid default realm {}: {}", realm, e)))
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.program_id()?;
        self.default_realm()?;

        for url in [&self.rpc_url, &self.indexer_rpc_url, &self.action_api_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!("invalid URL: {}", url)));
            }
        }

        if self.gas_tank.source == GasTankSourceKind::Static && self.gas_tank.secret_key.is_none() {
            return Err(Error::Config(
                "static gas tank requires a secret key".to_string(),
            ));
        }

        if self.indexer.max_concurrent_requests == 0 {
            return Err(Error::Config(
                "indexer.max_concurrent_requests must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.program_id().unwrap().to_string(),
            DEFAULT_GOVERNANCE_PROGRAM_ID
        );
        assert!(config.database.is_memory());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "bind_addr": "127.0.0.1:4000",
            "rpc_url": "http://localhost:8899",
            "indexer_rpc_url": "http://localhost:8899",
            "governance_program_id": "GovER5Lthms3bLBqWub97yVrMmEogzX7xNjdXpPPCVZw",
            "action_api_url": "http://localhost:3001",
            "indexer": { "default_realm": "By2sVGZXwfQq6rAiAM3rNPJ9iQfb5e2QhnF4YjJ4Bip" }
        }"#;

        let config: ServiceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.indexer.interval_seconds, 300);
        assert_eq!(config.gas_tank.source, GasTankSourceKind::Remote);
        assert!(config.default_realm().unwrap().is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_static_gas_tank_needs_secret() {
        let mut config = ServiceConfig::default();
        config.gas_tank.source = GasTankSourceKind::Static;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_program_id() {
        let config = ServiceConfig {
            governance_program_id: "not-a-key".to_string(),
            ..ServiceConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
