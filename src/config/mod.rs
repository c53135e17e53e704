/// Cafe and table seed configuration
pub mod cafes;

/// Database configuration and connection management
pub mod database;

/// Engine settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, NotificationConfig, Settings, load_config};
