pub mod memory;
pub mod redis_cache;
pub mod sqlite;

// Re-export commonly used types
pub use memory::{InMemorySettingsCache, InMemorySettingsRepository};
pub use redis_cache::RedisSettingsCache;
pub use sqlite::SqliteSettingsRepository;
