//! Exporter configuration, loaded from a TOML file.
//!
//! ```toml
//! listen-address = "0.0.0.0:9560"
//! timeout = 10
//!
//! [log]
//! level = "info"
//!
//! [[chains]]
//! name = "cosmos"
//! lcd-endpoint = "https://api.cosmos.network"
//! denoms = [
//!     { denom = "uatom", display-denom = "atom", coingecko-currency = "cosmos" },
//! ]
//! validators = [
//!     { address = "cosmosvaloper1...", consensus-address = "cosmosvalcons1..." },
//! ]
//! ```
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// Timeout of a single HTTP request, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub price: PriceConfig,
    pub chains: Vec<Chain>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PriceConfig {
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            coingecko_url: default_coingecko_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub name: String,
    pub lcd_endpoint: String,
    #[serde(default)]
    pub denoms: Vec<DenomInfo>,
    #[serde(default)]
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub consumer_chains: Vec<ConsumerChain>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DenomInfo {
    pub denom: String,
    pub display_denom: String,
    #[serde(default = "default_denom_exponent")]
    pub denom_exponent: i32,
    pub coingecko_currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Validator {
    /// Operator (`valoper`) address.
    pub address: String,
    /// Consensus (`valcons`) address, needed for signing info.
    pub consensus_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsumerChain {
    pub name: String,
    pub lcd_endpoint: String,
    /// Id of the consumer chain on its provider, needed for the opt-in
    /// status, the consumer validator set and the consumer commission.
    pub consumer_id: Option<String>,
}

/// A coin amount, either in base or in display denom.
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub denom: String,
    pub amount: f64,
}

/// A non-fatal configuration issue, logged at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub chain: String,
    pub message: String,
}

impl Config {
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.to_string(), err))?;

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        let mut names = HashSet::new();

        for chain in &self.chains {
            chain.validate()?;

            let consumers = chain.consumer_chains.iter().map(|c| &c.name);
            for name in std::iter::once(&chain.name).chain(consumers) {
                if !names.insert(name.as_str()) {
                    return Err(ConfigError::DuplicateChain(name.clone()));
                }
            }
        }

        Ok(())
    }

    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();

        for chain in &self.chains {
            for denom in &chain.denoms {
                if denom.coingecko_currency.is_none() {
                    warnings.push(Warning {
                        chain: chain.name.clone(),
                        message: format!(
                            "Denom '{}' has no coingecko-currency, its price won't be fetched",
                            denom.denom
                        ),
                    });
                }
            }

            for consumer in &chain.consumer_chains {
                if consumer.consumer_id.is_none() {
                    warnings.push(Warning {
                        chain: consumer.name.clone(),
                        message: "Consumer chain has no consumer-id, its validators and commission won't be fetched"
                            .to_string(),
                    });
                }
            }

            for validator in &chain.validators {
                if validator.consensus_address.is_none() {
                    warnings.push(Warning {
                        chain: chain.name.clone(),
                        message: format!(
                            "Validator '{}' has no consensus-address, its signing info won't be fetched",
                            validator.address
                        ),
                    });
                }
            }
        }

        warnings
    }
}

impl Chain {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::Invalid {
            chain: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }

        if self.lcd_endpoint.is_empty() {
            return Err(invalid("lcd-endpoint is empty"));
        }

        if self.validators.iter().any(|v| v.address.is_empty()) {
            return Err(invalid("validator address is empty"));
        }

        if self.denoms.iter().any(|d| d.denom.is_empty() || d.display_denom.is_empty()) {
            return Err(invalid("denom or display-denom is empty"));
        }

        for consumer in &self.consumer_chains {
            if consumer.name.is_empty() || consumer.lcd_endpoint.is_empty() {
                return Err(invalid("consumer chain name or lcd-endpoint is empty"));
            }
        }

        Ok(())
    }

    pub fn find_denom(&self, denom: &str) -> Option<&DenomInfo> {
        self.denoms.iter().find(|info| info.denom == denom)
    }

    /// Converts an amount in base denom to display denom. Amounts in denoms
    /// absent from the denom table are returned as they are.
    pub fn display_amount(&self, denom: &str, amount: f64) -> Amount {
        match self.find_denom(denom) {
            Some(info) => Amount {
                denom: info.display_denom.clone(),
                amount: amount / 10f64.powi(info.denom_exponent),
            },
            None => Amount {
                denom: denom.to_string(),
                amount,
            },
        }
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9560))
}

fn default_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_denom_exponent() -> i32 {
    6
}
