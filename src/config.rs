use crate::datasource::{Referral, MAX_REFERRAL_FEE_BPS};
use crate::domain::{Address, Decimal, SlippageTolerance, DEFAULT_EVENT_LOG_CAPACITY};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Value shipped in sample env files. Accepted, but warned about at startup.
pub const PLACEHOLDER_ENCRYPTION_KEY: &str = "your-secret-encryption-key-change-this-in-production";

/// jUSDT master on TON.
pub const DEFAULT_STABLE_ASSET_ADDRESS: &str = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub ston_api_url: String,
    pub chain_rpc_url: String,
    pub chain_rpc_api_key: Option<String>,
    pub wallet_encryption_key: String,
    pub wallet_address: Option<Address>,
    pub stable_asset_address: Address,
    pub referral: Option<Referral>,
    pub default_slippage: SlippageTolerance,
    pub confirmation_timeout: Duration,
    pub confirmation_poll: Duration,
    pub min_inter_op_delay: Duration,
    pub rate_limit_cooldown: Duration,
    pub max_rate_limit_retries: u32,
    pub asset_cache_ttl: Duration,
    /// Entries kept in the in-memory session log.
    pub event_log_capacity: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("ston_api_url", &self.ston_api_url)
            .field("chain_rpc_url", &self.chain_rpc_url)
            .field(
                "chain_rpc_api_key",
                &self.chain_rpc_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("wallet_encryption_key", &"[REDACTED]")
            .field("wallet_address", &self.wallet_address)
            .field("stable_asset_address", &self.stable_asset_address)
            .field("referral", &self.referral)
            .field("default_slippage", &self.default_slippage)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("confirmation_poll", &self.confirmation_poll)
            .field("min_inter_op_delay", &self.min_inter_op_delay)
            .field("rate_limit_cooldown", &self.rate_limit_cooldown)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .field("asset_cache_ttl", &self.asset_cache_ttl)
            .field("event_log_capacity", &self.event_log_capacity)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;

        let wallet_encryption_key = required(&env_map, "WALLET_ENCRYPTION_KEY")?;
        if wallet_encryption_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "WALLET_ENCRYPTION_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let ston_api_url = optional(&env_map, "STON_API_URL")
            .unwrap_or_else(|| "https://api.ston.fi".to_string());
        let chain_rpc_url = optional(&env_map, "CHAIN_RPC_URL")
            .unwrap_or_else(|| "https://toncenter.com/api/v3".to_string());
        let chain_rpc_api_key = optional(&env_map, "CHAIN_RPC_API_KEY");
        let wallet_address = optional(&env_map, "WALLET_ADDRESS").map(Address::new);
        let stable_asset_address = Address::new(
            optional(&env_map, "STABLE_ASSET_ADDRESS")
                .unwrap_or_else(|| DEFAULT_STABLE_ASSET_ADDRESS.to_string()),
        );

        let referral = match optional(&env_map, "REFERRAL_ADDRESS") {
            Some(address) => {
                let fee_bps = parse_or(&env_map, "REFERRAL_FEE_BPS", 10u16)?;
                if fee_bps > MAX_REFERRAL_FEE_BPS {
                    return Err(ConfigError::InvalidValue(
                        "REFERRAL_FEE_BPS".to_string(),
                        format!("must be at most {}, got {}", MAX_REFERRAL_FEE_BPS, fee_bps),
                    ));
                }
                Some(Referral {
                    address: Address::new(address),
                    fee_bps,
                })
            }
            None => None,
        };

        let slippage_raw = env_map
            .get("DEFAULT_SLIPPAGE")
            .map(|s| s.as_str())
            .unwrap_or("0.01");
        let default_slippage = Decimal::from_str(slippage_raw)
            .ok()
            .and_then(|d| SlippageTolerance::new(d).ok())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_SLIPPAGE".to_string(),
                    format!("must be a fraction in [0, 1], got {}", slippage_raw),
                )
            })?;

        let confirmation_poll = millis(&env_map, "CONFIRMATION_POLL_MS", 5_000)?;
        if confirmation_poll.is_zero() {
            return Err(ConfigError::InvalidValue(
                "CONFIRMATION_POLL_MS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let event_log_capacity =
            parse_or(&env_map, "EVENT_LOG_CAPACITY", DEFAULT_EVENT_LOG_CAPACITY)?;
        if event_log_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "EVENT_LOG_CAPACITY".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            ston_api_url,
            chain_rpc_url,
            chain_rpc_api_key,
            wallet_encryption_key,
            wallet_address,
            stable_asset_address,
            referral,
            default_slippage,
            confirmation_timeout: millis(&env_map, "CONFIRMATION_TIMEOUT_MS", 90_000)?,
            confirmation_poll,
            min_inter_op_delay: millis(&env_map, "MIN_INTER_OP_DELAY_MS", 15_000)?,
            rate_limit_cooldown: millis(&env_map, "RATE_LIMIT_COOLDOWN_MS", 30_000)?,
            max_rate_limit_retries: parse_or(&env_map, "MAX_RATE_LIMIT_RETRIES", 10u32)?,
            asset_cache_ttl: millis(&env_map, "ASSET_CACHE_TTL_MS", 300_000)?,
            event_log_capacity,
        })
    }

    pub fn uses_placeholder_key(&self) -> bool {
        self.wallet_encryption_key == PLACEHOLDER_ENCRYPTION_KEY
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

/// Unset and blank values are treated alike.
fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match optional(env_map, key) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("could not parse {}", raw))
        }),
        None => Ok(default),
    }
}

fn millis(
    env_map: &HashMap<String, String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    parse_or(env_map, key, default_ms).map(Duration::from_millis)
}
