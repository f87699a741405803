use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::provider::{DEFAULT_MODEL, OPENAI_CHAT_COMPLETIONS_URL};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_COOLDOWN_MS: u64 = 2_500;
const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Provider secret. Absence is reported per request, never at startup.
    pub api_key: Option<String>,
    pub provider_url: String,
    pub model: String,
    /// Outbound call timeout; `None` leaves it to the network stack.
    pub provider_timeout: Option<Duration>,
    pub cooldown: Duration,
    pub max_request_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider_url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider_timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_key = parse_optional_string("OPENAI_API_KEY");
        let provider_url =
            parse_optional_string("LARDER_PROVIDER_URL").unwrap_or(defaults.provider_url);
        let model = parse_optional_string("LARDER_MODEL").unwrap_or(defaults.model);

        let provider_timeout = match parse_optional_u64("LARDER_PROVIDER_TIMEOUT_MS")? {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.provider_timeout,
        };
        let cooldown = parse_optional_u64("LARDER_COOLDOWN_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.cooldown);
        let max_request_bytes = parse_optional_u64("LARDER_MAX_REQUEST_BYTES")?
            .map(|v| v as usize)
            .unwrap_or(defaults.max_request_bytes);

        Ok(Self {
            api_key,
            provider_url,
            model,
            provider_timeout,
            cooldown,
            max_request_bytes,
        })
    }
}

fn parse_optional_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a non-negative integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
