use serde::{Deserialize, Serialize};

/// Connection settings for the mirrored governance database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or `memory://` for the in-process store
    pub connection_string: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Run `CREATE TABLE IF NOT EXISTS` on startup
    #[serde(default = "default_true")]
    pub create_tables: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "memory://".to_string(),
            max_connections: default_max_connections(),
            create_tables: true,
        }
    }
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.connection_string.starts_with("memory://")
    }
}
