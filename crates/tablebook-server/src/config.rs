//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with no configuration
//! for local development.

use std::net::SocketAddr;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `TABLEBOOK_HOST`. Default: `0.0.0.0`
    pub host: String,

    /// Env: `TABLEBOOK_PORT`, then `PORT`. Default: `3000`
    pub port: u16,

    /// Store connection string.
    /// Env: `TABLEBOOK_DATABASE_URL`, then `DATABASE_URL`.
    /// Default: `sqlite://tablebook.db`
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite://tablebook.db".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults.
    /// A port that is present but unparseable is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let first = |keys: &[&str]| keys.iter().find_map(|key| lookup(key));

        if let Some(host) = lookup("TABLEBOOK_HOST") {
            config.host = host;
        }

        if let Some(port) = first(&["TABLEBOOK_PORT", "PORT"]) {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid port '{}'", port))?;
        }

        if let Some(url) = first(&["TABLEBOOK_DATABASE_URL", "DATABASE_URL"]) {
            config.database_url = url;
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        Ok(config)
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
