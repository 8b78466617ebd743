use crate::datasource::{RetryPolicy, MAX_PAGE_SIZE};
use crate::engine::BandConfig;
use crate::orchestration::{AnalysisConfig, WalletConfig};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub series_dir: String,
    pub kaspa_api_url: String,
    pub genesis_date: NaiveDate,
    pub max_transactions: usize,
    pub page_size: usize,
    pub http_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_secs: u64,
    pub retry_max_secs: u64,
    pub deviation_window: usize,
    pub oscillator_window: usize,
    pub band_lower_multiplier: f64,
    pub band_upper_multiplier: f64,
    pub slope_delta_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("must be {}", expected)))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or::<u16>(&env_map, "PORT", "8080", "a valid u16")?;

        let series_dir = env_map
            .get("SERIES_DIR")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("SERIES_DIR".to_string()))?;

        let kaspa_api_url = env_map
            .get("KASPA_API_URL")
            .cloned()
            .unwrap_or_else(|| crate::datasource::kaspa::DEFAULT_BASE_URL.to_string());

        let genesis_date = NaiveDate::parse_from_str(
            env_map
                .get("GENESIS_DATE")
                .map(|s| s.trim())
                .unwrap_or("2021-11-07"),
            "%Y-%m-%d",
        )
        .map_err(|_| {
            ConfigError::InvalidValue(
                "GENESIS_DATE".to_string(),
                "must be a YYYY-MM-DD date".to_string(),
            )
        })?;

        let max_transactions =
            parse_or::<usize>(&env_map, "MAX_TRANSACTIONS", "10000", "a positive integer")?;
        if max_transactions == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_TRANSACTIONS".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let page_size = parse_or::<usize>(&env_map, "PAGE_SIZE", "500", "an integer")?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue(
                "PAGE_SIZE".to_string(),
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        let http_timeout_secs =
            parse_or::<u64>(&env_map, "HTTP_TIMEOUT_SECS", "30", "a number of seconds")?;
        let retry_max_attempts = parse_or::<u32>(&env_map, "RETRY_MAX_ATTEMPTS", "3", "a valid u32")?;
        let retry_base_secs = parse_or::<u64>(&env_map, "RETRY_BASE_SECS", "4", "a number of seconds")?;
        let retry_max_secs = parse_or::<u64>(&env_map, "RETRY_MAX_SECS", "10", "a number of seconds")?;
        if retry_max_secs < retry_base_secs {
            return Err(ConfigError::InvalidValue(
                "RETRY_MAX_SECS".to_string(),
                "must not be below RETRY_BASE_SECS".to_string(),
            ));
        }

        let deviation_window =
            parse_or::<usize>(&env_map, "DEVIATION_WINDOW", "30", "a positive integer")?;
        let oscillator_window =
            parse_or::<usize>(&env_map, "OSCILLATOR_WINDOW", "7", "a positive integer")?;
        for (key, value) in [
            ("DEVIATION_WINDOW", deviation_window),
            ("OSCILLATOR_WINDOW", oscillator_window),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must be a positive integer".to_string(),
                ));
            }
        }

        let band_lower_multiplier =
            parse_or::<f64>(&env_map, "BAND_LOWER_MULTIPLIER", "0.4", "a number")?;
        let band_upper_multiplier =
            parse_or::<f64>(&env_map, "BAND_UPPER_MULTIPLIER", "2.2", "a number")?;
        if !(band_lower_multiplier.is_finite() && band_lower_multiplier > 0.0) {
            return Err(ConfigError::InvalidValue(
                "BAND_LOWER_MULTIPLIER".to_string(),
                "must be positive".to_string(),
            ));
        }
        if !(band_upper_multiplier.is_finite() && band_upper_multiplier > band_lower_multiplier) {
            return Err(ConfigError::InvalidValue(
                "BAND_UPPER_MULTIPLIER".to_string(),
                "must be greater than BAND_LOWER_MULTIPLIER".to_string(),
            ));
        }

        let slope_delta_days =
            parse_or::<i64>(&env_map, "SLOPE_DELTA_DAYS", "30", "a number of days")?;
        if slope_delta_days < 1 {
            return Err(ConfigError::InvalidValue(
                "SLOPE_DELTA_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            port,
            series_dir,
            kaspa_api_url,
            genesis_date,
            max_transactions,
            page_size,
            http_timeout_secs,
            retry_max_attempts,
            retry_base_secs,
            retry_max_secs,
            deviation_window,
            oscillator_window,
            band_lower_multiplier,
            band_upper_multiplier,
            slope_delta_days,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_attempts,
            initial_interval: Duration::from_secs(self.retry_base_secs),
            max_interval: Duration::from_secs(self.retry_max_secs),
        }
    }

    pub fn wallet_config(&self) -> WalletConfig {
        WalletConfig {
            page_size: self.page_size,
            max_transactions: self.max_transactions,
        }
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            bands: BandConfig {
                rolling_window: self.deviation_window,
                lower_multiplier: self.band_lower_multiplier,
                upper_multiplier: self.band_upper_multiplier,
                ..BandConfig::default()
            },
            oscillator_window: self.oscillator_window,
            slope_delta_days: self.slope_delta_days,
        }
    }
}
