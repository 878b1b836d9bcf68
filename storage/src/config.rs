//! Storage configuration: variant selection and database location.
//!
//! The persistence flag is the single point deciding which store variant a
//! registry constructs; callers of the stores never learn which variant is
//! behind the interface.

use std::env;

/// Configuration for the storage layer. Loaded from env or built directly.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// When true, data is kept in SQLite and survives restarts; when false,
    /// everything lives in process memory for the process lifetime only.
    pub enable_persistence: bool,
    /// SQLite database file path. Ignored when persistence is disabled.
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enable_persistence: true,
            database_url: "data/chat-storage.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// Load from environment variables, falling back to the defaults.
    /// `STORAGE_PERSISTENCE_ENABLED` and `STORAGE_DATABASE_URL` override.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let enable_persistence = env::var("STORAGE_PERSISTENCE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.enable_persistence);
        let database_url =
            env::var("STORAGE_DATABASE_URL").unwrap_or_else(|_| defaults.database_url);
        Self {
            enable_persistence,
            database_url,
        }
    }

    /// Config for a purely in-memory setup, used by tests and environments
    /// where on-device persistence is disabled.
    pub fn ephemeral() -> Self {
        Self {
            enable_persistence: false,
            database_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_persistence() {
        let config = StorageConfig::default();
        assert!(config.enable_persistence);
        assert!(!config.database_url.is_empty());
    }

    #[test]
    fn ephemeral_config_disables_persistence() {
        assert!(!StorageConfig::ephemeral().enable_persistence);
    }
}
