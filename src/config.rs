use crate::error::{DesignerError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_ROLE: &str = "Senior Frontend Engineer";

#[derive(Debug, Clone)]
pub struct DesignerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub default_role: String,
    pub variant_count: usize,
    pub pass_score: u8,
    pub max_retries: u32,
    pub http_timeout: Duration,
    pub port_timeout: Option<Duration>,
    pub dump_dir: Option<PathBuf>,
    /// Simulated latency for the offline generator and evaluator.
    pub offline_delay: Option<Duration>,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            default_role: DEFAULT_ROLE.to_string(),
            variant_count: 3,
            pass_score: 80,
            max_retries: 3,
            http_timeout: Duration::from_secs(60),
            port_timeout: None,
            dump_dir: None,
            offline_delay: None,
        }
    }
}

impl DesignerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset so an empty line in .env falls back to the default.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let variant_count = parse_or(get("DESIGNER_VARIANT_COUNT"), "DESIGNER_VARIANT_COUNT", defaults.variant_count)?;
        if !(1..=10).contains(&variant_count) {
            return Err(DesignerError::Config(format!(
                "DESIGNER_VARIANT_COUNT must be between 1 and 10, got {variant_count}"
            )));
        }

        let pass_score: u8 = parse_or(get("DESIGNER_PASS_SCORE"), "DESIGNER_PASS_SCORE", defaults.pass_score)?;
        if pass_score > 100 {
            return Err(DesignerError::Config(format!("DESIGNER_PASS_SCORE must be at most 100, got {pass_score}")));
        }

        let max_retries: u32 = parse_or(get("DESIGNER_MAX_RETRIES"), "DESIGNER_MAX_RETRIES", defaults.max_retries)?;
        if !(1..=10).contains(&max_retries) {
            return Err(DesignerError::Config(format!(
                "DESIGNER_MAX_RETRIES must be between 1 and 10, got {max_retries}"
            )));
        }

        let http_secs: u64 = parse_or(
            get("DESIGNER_HTTP_TIMEOUT_SECS"),
            "DESIGNER_HTTP_TIMEOUT_SECS",
            defaults.http_timeout.as_secs(),
        )?;

        let port_timeout = match get("DESIGNER_PORT_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_value::<u64>(&raw, "DESIGNER_PORT_TIMEOUT_SECS")?)),
            None => None,
        };

        let offline_delay = match get("DESIGNER_OFFLINE_DELAY_MS") {
            Some(raw) => Some(Duration::from_millis(parse_value::<u64>(&raw, "DESIGNER_OFFLINE_DELAY_MS")?)),
            None => None,
        };

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            default_role: get("DESIGNER_ROLE").unwrap_or(defaults.default_role),
            variant_count,
            pass_score,
            max_retries,
            http_timeout: Duration::from_secs(http_secs),
            port_timeout,
            dump_dir: get("DESIGNER_DUMP_DIR").map(PathBuf::from),
            offline_delay,
        })
    }

    pub fn is_offline(&self) -> bool {
        self.api_key.is_none()
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(raw) => parse_value(&raw, key),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| DesignerError::Config(format!("{key} has an invalid value: '{raw}'")))
}
