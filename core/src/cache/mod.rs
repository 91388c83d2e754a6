pub mod backend;
pub mod store;

pub use backend::CacheConfig;
pub use backend::KeyValueStore;
pub use backend::MemoryStore;
pub use backend::SledStore;
pub use backend::StoreError;
pub use store::BackupEntry;
pub use store::CacheEntry;
pub use store::CacheStore;
