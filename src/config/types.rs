use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub pool: PoolConfig,
    #[serde(default)]
    pub coins: Vec<CoinConfig>,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: 0.0.0.0:8880)
    pub bind_address: SocketAddr,
    /// Maximum accepted request body size
    pub max_body_size: usize,
    /// Connection idle timeout
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Pool display name
    pub name: String,
    /// Public host address of the pool frontend
    pub host_address: String,
}

/// One configured cryptocurrency, each backed by its own [`Backend`].
///
/// [`Backend`]: crate::backend::Backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    /// Short coin name used in API requests ("BTC")
    pub name: String,
    /// Human-readable coin name ("Bitcoin")
    pub full_name: String,
    /// Required payout address prefix for this coin
    pub address_prefix: String,
    /// Default payout threshold, as a decimal string
    pub default_payout_threshold: String,
}

/// One configured mining instance (stratum endpoint) advertised over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub protocol: String,
    #[serde(default)]
    pub backends: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8880".parse().unwrap(),
            max_body_size: 1024 * 1024,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            host_address: "http://localhost:8880".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|_| crate::error::ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
        let config: Config =
            toml::from_str(&content).map_err(|e| crate::error::ConfigError::InvalidFormat {
                message: e.to_string(),
            })?;
        Ok(config)
    }
}
