use serde::{Deserialize, Serialize};

/// Custodial wallet details for a community, as served by the action API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub pda: String,
    pub gas_tank_public_key: String,
    pub gas_tank_secret_key: String,
}
