//! Translation configuration
//!
//! Settings are layered: built-in defaults, then the TOML file, then
//! `INTERLINEAR_*` environment variables (a `.env` file is loaded first).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::env::{ConfigPath, EnvVar};
use crate::translation::error::{helpers::config_error, TranslationError, TranslationResult};

pub mod constants {
    /// Texts per orchestration round
    pub const BATCH_SIZE: usize = 50;
    /// Texts per remote call; the calls of one round are in flight together
    pub const CONCURRENCY: usize = 5;
    pub const BATCH_DELAY_MS: u64 = 100;
    pub const MONTHLY_CHAR_LIMIT: u64 = 500_000;
    pub const DEFAULT_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";
    pub const DEFAULT_TARGET_LANG: &str = "zh";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Class carried by every injected mirror element
    pub const MARKER_CLASS: &str = "translation-container";

    /// Containers whose text is never collected
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "code", "pre"];

    /// Class fragments left behind by templating frameworks
    pub const TEMPLATE_CLASS_MARKERS: &[&str] = &["v-", "vue-"];

    /// Attribute name prefixes of template directives and bindings
    pub const DIRECTIVE_ATTR_PREFIXES: &[&str] = &["v-", "@", ":"];

    /// Text fragments that betray unrendered template source
    pub const TEMPLATE_TEXT_MARKERS: &[&str] = &["{{", "}}", "v-", "@", ":"];

    pub const ENV_PREFIX: &str = "INTERLINEAR";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub api_key: String,
    pub api_url: String,
    pub target_lang: String,

    pub batch_size: usize,
    pub concurrency: usize,
    pub batch_delay_ms: u64,

    pub monthly_char_limit: u64,
    pub request_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: constants::DEFAULT_API_URL.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            batch_size: constants::BATCH_SIZE,
            concurrency: constants::CONCURRENCY,
            batch_delay_ms: constants::BATCH_DELAY_MS,
            monthly_char_limit: constants::MONTHLY_CHAR_LIMIT,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TranslationConfig {
    pub fn validate(&self) -> TranslationResult<()> {
        if self.batch_size == 0 {
            return Err(config_error("batch_size must be greater than 0"));
        }

        if self.concurrency == 0 {
            return Err(config_error("concurrency must be greater than 0"));
        }

        if self.target_lang.trim().is_empty() {
            return Err(config_error("target_lang must not be empty"));
        }

        Url::parse(&self.api_url)
            .map_err(|e| config_error(format!("invalid api_url '{}': {}", self.api_url, e)))?;

        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Shared, persisted configuration
///
/// Clones share the same underlying settings, so a credential saved through
/// one clone is seen by every reader before its next remote call.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<TranslationConfig>>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Loads from `path`, else `INTERLINEAR_CONFIG`, else the platform config dir
    pub fn load(path: Option<&Path>) -> TranslationResult<Self> {
        dotenv::dotenv().ok();

        let config_path = match path {
            Some(path) => Some(PathBuf::from(
                shellexpand::tilde(&path.to_string_lossy()).as_ref(),
            )),
            None => ConfigPath::get().ok().or_else(Self::default_config_path),
        };

        let mut builder = Config::builder().add_source(Config::try_from(&TranslationConfig::default())?);

        if let Some(ref path) = config_path {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false));
        }

        let config: TranslationConfig = builder
            .add_source(Environment::with_prefix(constants::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        match config_path {
            Some(ref path) => tracing::debug!("configuration loaded, file: {}", path.display()),
            None => tracing::debug!("configuration loaded without a config file"),
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// In-memory manager; `save` fails since there is nowhere to persist
    pub fn from_config(config: TranslationConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            config_path: None,
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "interlinear")
            .map(|dirs| dirs.config_dir().join(constants::CONFIG_FILE_NAME))
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn get(&self) -> TranslationResult<TranslationConfig> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|e| TranslationError::InternalError(format!("config lock poisoned: {e}")))
    }

    /// The credential, or a configuration error when none is set
    pub fn api_key(&self) -> TranslationResult<String> {
        let key = self.get()?.api_key;
        if key.trim().is_empty() {
            return Err(config_error(
                "API key is not configured; run `interlinear set-key <KEY>` or set INTERLINEAR_API_KEY",
            ));
        }
        Ok(key)
    }

    pub fn set_target_lang(&self, target_lang: &str) -> TranslationResult<()> {
        self.update(|config| config.target_lang = target_lang.to_string())
    }

    /// Stores the credential and writes the config file
    pub fn set_api_key(&self, key: &str) -> TranslationResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(TranslationError::InvalidInput("API key must not be empty".to_string()));
        }

        self.update(|config| config.api_key = key.to_string())?;
        self.save()
    }

    pub fn save(&self) -> TranslationResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| config_error("no configuration file location is known"))?;

        let contents = toml::to_string_pretty(&self.get()?)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;

        tracing::info!("configuration saved to {}", path.display());
        Ok(())
    }

    fn update<F: FnOnce(&mut TranslationConfig)>(&self, apply: F) -> TranslationResult<()> {
        let mut config = self
            .config
            .write()
            .map_err(|e| TranslationError::InternalError(format!("config lock poisoned: {e}")))?;
        apply(&mut config);
        Ok(())
    }
}
