use serde::Deserialize;

/// Complete devmirror configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
        }
    }
}

/// Upstream hub connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bounds snapshot and capability requests; the subscribe stream only
    /// shares its connection setup.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Session authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_session_minutes")]
    pub session_minutes: i64,
}

fn default_session_minutes() -> i64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user: String::new(),
            password: String::new(),
            session_minutes: default_session_minutes(),
        }
    }
}

/// Update stream tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the ingest→fan-out channel. A full channel blocks
    /// ingestion; nothing is dropped.
    #[serde(default = "default_forward_capacity")]
    pub forward_capacity: usize,
    /// Per-subscriber buffer in the fan-out.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
}

fn default_forward_capacity() -> usize {
    10
}

fn default_subscriber_capacity() -> usize {
    32
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            forward_capacity: default_forward_capacity(),
            subscriber_capacity: default_subscriber_capacity(),
        }
    }
}

/// Load configuration from a TOML file.
pub fn load_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}
