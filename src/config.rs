use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://app.atera.com/api/v3";

#[derive(Clone, Debug)]
pub struct AteraConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Base delay of the exponential backoff; attempt `n` waits `retry_delay * 2^n`.
    pub retry_delay: Duration,
    pub page_size: u32,
}

impl Default for AteraConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            page_size: 50,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub atera: AteraConfig,
    /// Key supplied through the environment, bypassing the prompt.
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    pub log_file: PathBuf,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = AteraConfig::default();

        let api_url = env::var("ATERA_API_URL").unwrap_or(defaults.api_url);
        let request_timeout = Duration::from_secs(nonzero(
            "ATERA_REQUEST_TIMEOUT_SECS",
            parse_var("ATERA_REQUEST_TIMEOUT_SECS", 30u64)?,
        )?);
        let max_retries = parse_var("ATERA_MAX_RETRIES", defaults.max_retries)?;
        let retry_delay = Duration::from_millis(parse_var("ATERA_RETRY_DELAY_MS", 1000u64)?);
        let page_size = nonzero(
            "ATERA_PAGE_SIZE",
            parse_var("ATERA_PAGE_SIZE", defaults.page_size)?,
        )?;

        let atera = AteraConfig {
            api_url,
            request_timeout,
            max_retries,
            retry_delay,
            page_size,
        };

        let api_key = env::var("ATERA_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let poll_secs = nonzero(
            "ATERA_POLL_INTERVAL_SECS",
            parse_var("ATERA_POLL_INTERVAL_SECS", 30u64)?,
        )?;

        let log_file = env::var("ATERA_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("atera-tui.log"));
        let log_filter = env::var("ATERA_LOG").unwrap_or_else(|_| "atera_tui=info".to_string());

        Ok(Self {
            atera,
            api_key,
            poll_interval: Duration::from_secs(poll_secs),
            log_file,
            log_filter,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn nonzero<T>(name: &str, value: T) -> Result<T>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        anyhow::bail!("{name} must be greater than zero");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let value: u32 = parse_var("ATERA_TUI_TEST_SURELY_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn default_atera_config_matches_upstream_limits() {
        let config = AteraConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_timeout_and_page_size_are_rejected() {
        let err = nonzero("ATERA_REQUEST_TIMEOUT_SECS", 0u64).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ATERA_REQUEST_TIMEOUT_SECS must be greater than zero"
        );
        assert!(nonzero("ATERA_PAGE_SIZE", 0u32).is_err());
        assert_eq!(nonzero("ATERA_PAGE_SIZE", 50u32).unwrap(), 50);
    }
}
