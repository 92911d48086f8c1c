//! Typed access to the environment variables the binary reads directly
//!
//! Translation settings (`INTERLINEAR_API_KEY`, `INTERLINEAR_TARGET_LANG`, ...)
//! are picked up by the layered loader in
//! [`ConfigManager`](crate::translation::config::ConfigManager); this module
//! only covers what has to be known before that loader runs.

use std::env;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// Environment variable accessor
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn default_value() -> Option<T> {
        None
    }

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::default_value().ok_or_else(|| EnvError {
                variable: Self::NAME.to_string(),
                message: "Required environment variable not set".to_string(),
            }),
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// Log level: trace, debug, info, warn, error
pub struct LogLevel;
impl EnvVar<String> for LogLevel {
    const NAME: &'static str = "INTERLINEAR_LOG_LEVEL";
    const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

    fn parse(value: &str) -> EnvResult<String> {
        match value.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
            _ => Err(EnvError {
                variable: Self::NAME.to_string(),
                message: format!(
                    "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                    value
                ),
            }),
        }
    }

    fn default_value() -> Option<String> {
        Some("info".to_string())
    }
}

pub struct NoColor;
impl EnvVar<bool> for NoColor {
    const NAME: &'static str = "NO_COLOR";
    const DESCRIPTION: &'static str = "Disable colored output when set to any value";

    fn parse(value: &str) -> EnvResult<bool> {
        // Any non-empty value disables color
        Ok(!value.is_empty())
    }

    fn default_value() -> Option<bool> {
        Some(false)
    }
}

pub struct ConfigPath;
impl EnvVar<PathBuf> for ConfigPath {
    const NAME: &'static str = "INTERLINEAR_CONFIG";
    const DESCRIPTION: &'static str = "Path of the TOML configuration file";

    fn parse(value: &str) -> EnvResult<PathBuf> {
        expand_path(Self::NAME, value)
    }
}

pub struct QuotaDbPath;
impl EnvVar<PathBuf> for QuotaDbPath {
    const NAME: &'static str = "INTERLINEAR_QUOTA_DB";
    const DESCRIPTION: &'static str = "Path of the monthly usage counter database";

    fn parse(value: &str) -> EnvResult<PathBuf> {
        expand_path(Self::NAME, value)
    }
}

fn expand_path(variable: &str, value: &str) -> EnvResult<PathBuf> {
    if value.trim().is_empty() {
        return Err(EnvError {
            variable: variable.to_string(),
            message: "Path must not be empty".to_string(),
        });
    }

    Ok(PathBuf::from(shellexpand::tilde(value).as_ref()))
}
