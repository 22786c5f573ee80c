//! This is the lighthouse-store crate - persists mirrored proposals, vote
//! records, realm subscriptions and per-realm high-water marks

pub mod factory;
pub mod memory_store;
pub mod postgres_store;
pub mod traits;

pub use factory::create_storage;
pub use memory_store::MemoryStore;
pub use postgres_store::PostgresStore;
pub use traits::Storage;
