use {
    crate::types::ApiError,
    async_trait::async_trait,
    lighthouse_common::{
        crypto::{keypair_from_base58, keypair_matching},
        types::WalletInfo,
    },
    solana_sdk::signature::{Keypair, Signer},
    std::sync::Arc,
};

/// Where the custodial fee payer of a community comes from
#[async_trait]
pub trait GasTankSource: Send + Sync {
    async fn gas_tank(&self, community: &str) -> Result<Keypair, ApiError>;
}

/// Looks the gas tank up through the action API's `walletInfo` route.
pub struct RemoteGasTank {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteGasTank {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn wallet_info_url(&self, community: &str) -> String {
        format!("{}/api/{}/walletInfo", self.base_url, community)
    }
}

#[async_trait]
impl GasTankSource for RemoteGasTank {
    async fn gas_tank(&self, community: &str) -> Result<Keypair, ApiError> {
        let url = self.wallet_info_url(community);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("wallet info request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "wallet info for {} returned {}",
                community,
                response.status()
            )));
        }

        let info: WalletInfo = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("invalid wallet info: {}", e)))?;
        tracing::debug!("Gas tank for {} is {}", community, info.gas_tank_public_key);

        keypair_matching(&info.gas_tank_secret_key, &info.gas_tank_public_key)
            .map_err(|e| ApiError::Upstream(e.to_string()))
    }
}

/// One configured fee payer for every community
pub struct StaticGasTank {
    keypair: Arc<Keypair>,
}

impl StaticGasTank {
    pub fn from_base58(secret: &str) -> lighthouse_common::Result<Self> {
        Ok(Self {
            keypair: Arc::new(keypair_from_base58(secret)?),
        })
    }

    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }
}

#[async_trait]
impl GasTankSource for StaticGasTank {
    async fn gas_tank(&self, _community: &str) -> Result<Keypair, ApiError> {
        Keypair::from_bytes(&self.keypair.to_bytes())
            .map_err(|e| ApiError::Internal(format!("gas tank keypair: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_gas_tank() {
        let keypair = Keypair::new();
        let secret = keypair.to_base58_string();
        let source = StaticGasTank::from_base58(&secret).unwrap();

        let gas_tank = source.gas_tank("lighthouse").await.unwrap();
        assert_eq!(gas_tank.pubkey(), keypair.pubkey());
        assert!(StaticGasTank::from_base58("not a key").is_err());
    }

    #[test]
    fn test_wallet_info_url() {
        let source = RemoteGasTank::new("https://actions.example.com/");
        assert_eq!(
            source.wallet_info_url("lighthouse"),
            "https://actions.example.com/api/lighthouse/walletInfo"
        );
    }
}
