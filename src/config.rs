//! Process configuration from environment variables

use crate::gateway::telegram::DEFAULT_API_BASE;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },
    #[error("Unknown gateway {0:?}, expected \"telegram\" or \"http\"")]
    UnknownGateway(String),
    #[error("BOT_TOKEN is required in telegram mode")]
    MissingBotToken,
}

/// Which front end carries the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayMode {
    Telegram {
        token: String,
        api_base: String,
        poll_timeout: Duration,
    },
    Http {
        port: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub gateway: GatewayMode,
    /// External catalog file; the built-in table when absent
    pub catalog_path: Option<PathBuf>,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let token = get("BOT_TOKEN");
        let mode = match get("AUTOQUOTE_GATEWAY") {
            Some(name) => name.trim().to_ascii_lowercase(),
            None if token.is_some() => "telegram".to_string(),
            None => "http".to_string(),
        };

        let gateway = match mode.as_str() {
            "telegram" => GatewayMode::Telegram {
                token: token.ok_or(ConfigError::MissingBotToken)?,
                api_base: get("AUTOQUOTE_TELEGRAM_API")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                poll_timeout: Duration::from_secs(parse_or(
                    get("AUTOQUOTE_POLL_TIMEOUT_SECS"),
                    "AUTOQUOTE_POLL_TIMEOUT_SECS",
                    DEFAULT_POLL_TIMEOUT_SECS,
                )?),
            },
            "http" => GatewayMode::Http {
                port: parse_or(get("AUTOQUOTE_PORT"), "AUTOQUOTE_PORT", DEFAULT_PORT)?,
            },
            _ => return Err(ConfigError::UnknownGateway(mode)),
        };

        let ttl_secs = parse_or(
            get("AUTOQUOTE_SESSION_TTL_SECS"),
            "AUTOQUOTE_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?;
        if ttl_secs == 0 {
            return Err(ConfigError::Zero {
                var: "AUTOQUOTE_SESSION_TTL_SECS",
            });
        }

        Ok(Self {
            gateway,
            catalog_path: get("AUTOQUOTE_CATALOG").map(PathBuf::from),
            session_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
