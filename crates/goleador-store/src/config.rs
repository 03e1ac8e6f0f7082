//! Store configuration.

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Prefix of every key written by the store
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "goleador".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    ///
    /// `STORE_REDIS_URL` falls back to `REDIS_URL` so a single Redis can
    /// serve as both broker and store.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("STORE_REDIS_URL")
                .or_else(|_| std::env::var("REDIS_URL"))
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("STORE_KEY_PREFIX")
                .unwrap_or_else(|_| "goleador".to_string()),
        }
    }
}
