pub mod config;
pub mod errors;
pub mod types;
pub mod utils;
pub mod crypto;

pub use config::{DatabaseConfig, GasTankConfig, GasTankSourceKind, IndexerSettings, ServiceConfig};
pub use errors::{Error, Result};
pub use types::*;
