use crate::config::types::Config;
use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use std::time::Duration;

impl Config {
    pub fn validate(&self) -> Result<()> {
        // Validate server configuration
        if self.server.idle_timeout == Duration::ZERO {
            return Err(ConfigError::InvalidDuration {
                field: "server.idle_timeout".to_string(),
                duration: self.server.idle_timeout,
            }
            .into());
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_body_size".to_string(),
                message: "must be > 0".to_string(),
            }
            .into());
        }

        // Validate pool configuration
        if self.pool.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "pool.name".to_string(),
            }
            .into());
        }

        // Validate coin configuration
        let mut names = HashSet::new();
        for coin in &self.coins {
            if coin.name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "coins.name".to_string(),
                }
                .into());
            }

            if !names.insert(coin.name.as_str()) {
                return Err(ConfigError::DuplicateCoin {
                    name: coin.name.clone(),
                }
                .into());
            }
        }

        // Instances may only reference configured coins
        for instance in &self.instances {
            for backend in &instance.backends {
                if !names.contains(backend.as_str()) {
                    return Err(ConfigError::UnknownInstanceCoin {
                        instance: instance.name.clone(),
                        coin: backend.clone(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CoinConfig, Config, InstanceConfig};

    fn coin(name: &str) -> CoinConfig {
        CoinConfig {
            name: name.to_string(),
            full_name: name.to_string(),
            address_prefix: "1".to_string(),
            default_payout_threshold: "0.01".to_string(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn duplicate_coin_rejected() {
        let mut config = Config::default();
        config.coins = vec![coin("BTC"), coin("BTC")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn instance_with_unknown_coin_rejected() {
        let mut config = Config::default();
        config.coins = vec![coin("BTC")];
        config.instances = vec![InstanceConfig {
            name: "stratum-eu".to_string(),
            kind: "stratum".to_string(),
            protocol: "stratum1".to_string(),
            backends: vec!["LTC".to_string()],
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn instance_with_known_coin_accepted() {
        let mut config = Config::default();
        config.coins = vec![coin("BTC"), coin("LTC")];
        config.instances = vec![InstanceConfig {
            name: "stratum-eu".to_string(),
            kind: "stratum".to_string(),
            protocol: "stratum1".to_string(),
            backends: vec!["BTC".to_string(), "LTC".to_string()],
        }];
        assert!(config.validate().is_ok());
    }
}
