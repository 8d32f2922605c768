use std::time::Duration;
use tracing::warn;

pub const ENV_PROTOCOL: &str = "COUCHDB_PROTOCOL";
pub const ENV_HOST: &str = "COUCHDB_HOST";
pub const ENV_PORT: &str = "COUCHDB_PORT";
pub const ENV_USER: &str = "COUCHDB_USER";
pub const ENV_PASSWORD: &str = "COUCHDB_PASSWORD";

/// Server connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `http` or `https`
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Basic auth user, when the server requires one
    pub user: Option<String>,
    pub password: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 5984,
            user: None,
            password: None,
            timeout_ms: 30000,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `COUCHDB_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `COUCHDB_*`
    /// names. An unparsable port keeps the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(protocol) = lookup(ENV_PROTOCOL) {
            config.protocol = protocol;
        }
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring invalid {}: {}", ENV_PORT, port),
            }
        }
        config.user = lookup(ENV_USER).or(config.user);
        config.password = lookup(ENV_PASSWORD).or(config.password);
        config
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Server root, e.g. `http://localhost:5984`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
