//! Connection settings for the hosted platform, loaded from environment
//! variables. Defaults point at a local development stack so the app runs
//! with zero configuration.

/// Backend connection configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted platform instance.
    /// Env: `REFUGE_BACKEND_URL`
    /// Default: `http://localhost:54321`
    pub base_url: String,

    /// Publishable (anonymous) API key attached to every request.
    /// Env: `REFUGE_API_KEY`
    /// Default: empty (local stacks accept anonymous access).
    pub api_key: String,

    /// Database schema the row API operates on.
    /// Env: `REFUGE_SCHEMA`
    /// Default: `public`
    pub schema: String,

    /// Per-screen cap on messages fetched for a thread.
    /// Env: `REFUGE_THREAD_PAGE_SIZE`
    /// Default: `50`
    pub thread_page_size: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            schema: "public".to_string(),
            thread_page_size: 50,
        }
    }
}

impl BackendConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults. Invalid values are logged and ignored, never fatal.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REFUGE_BACKEND_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }

        if let Ok(key) = std::env::var("REFUGE_API_KEY") {
            config.api_key = key;
        }

        if let Ok(schema) = std::env::var("REFUGE_SCHEMA") {
            if !schema.is_empty() {
                config.schema = schema;
            }
        }

        if let Ok(val) = std::env::var("REFUGE_THREAD_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.thread_page_size = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid REFUGE_THREAD_PAGE_SIZE, using default"
                    );
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:54321");
        assert_eq!(config.schema, "public");
        assert_eq!(config.thread_page_size, 50);
    }
}
