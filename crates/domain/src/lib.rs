pub mod items;
pub mod ports;
pub mod rules;

// Re-export commonly used types
pub use items::{ConfigItem, ItemRegistry};
pub use ports::{SettingsCache, SettingsRepository};
pub use rules::ValidationRule;
