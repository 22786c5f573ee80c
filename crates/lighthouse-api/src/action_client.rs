//! Client for the community action API, which builds the instructions a
//! proposal executes and returns them as a serialized transaction.

use {
    crate::types::ApiError,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddAdmin,
    AddLog,
    AddPoints,
}

impl Action {
    pub fn path(&self) -> &'static str {
        match self {
            Action::AddAdmin => "addAdmin",
            Action::AddLog => "addLog",
            Action::AddPoints => "addPoints",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub serialized_txn: Vec<u8>,
}

#[async_trait]
pub trait ActionApi: Send + Sync {
    /// POST `body` for `action` and return the serialized transaction bytes.
    async fn request(
        &self,
        community: &str,
        action: Action,
        body: serde_json::Value,
    ) -> Result<Vec<u8>, ApiError>;
}

pub struct ActionClient {
    base_url: String,
    client: reqwest::Client,
}

impl ActionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn action_url(&self, community: &str, action: Action) -> String {
        format!("{}/api/{}/{}", self.base_url, community, action.path())
    }
}

#[async_trait]
impl ActionApi for ActionClient {
    async fn request(
        &self,
        community: &str,
        action: Action,
        body: serde_json::Value,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.action_url(community, action);
        tracing::debug!("POST {} {}", url, body);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("{} request failed: {}", action.path(), e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "{} returned {}: {}",
                action.path(),
                status,
                text
            )));
        }

        let parsed: ActionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("invalid {} response: {}", action.path(), e)))?;
        Ok(parsed.serialized_txn)
    }
}
