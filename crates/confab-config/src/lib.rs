//! Multi-tier TOML configuration for Confab.
//!
//! Reads configuration from multiple sources with precedence:
//! host overrides > env vars > config file > defaults

use confab_core::ReplyConfig;
use confab_history::HistoryConfig;
use confab_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default in-memory retention cap (turns per session).
pub const DEFAULT_MEMORY_CAP: usize = 20;

/// Default durable retention cap (rows per user).
pub const DEFAULT_DURABLE_CAP: usize = 50;

/// Default recent-reply window size.
pub const DEFAULT_REPLY_WINDOW: usize = 5;

/// Default number of turns handed to the completer.
pub const DEFAULT_CONTEXT_LIMIT: usize = 20;

/// Default upper bound on one completion call, in seconds.
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;

/// Resolved configuration for a Confab deployment.
#[derive(Debug, Clone)]
pub struct ConfabConfig {
    pub history: HistoryConfig,
    pub reply: ReplyConfig,
    /// Durable store directory; `None` runs memory-only.
    pub store_dir: Option<PathBuf>,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub reply: ReplySettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySettings {
    pub memory_cap: Option<usize>,
    pub durable_cap: Option<usize>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplySettings {
    pub context_limit: Option<usize>,
    pub window: Option<usize>,
    pub completion_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    pub dir: Option<PathBuf>,
}

/// Host-supplied overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub memory_cap: Option<usize>,
    pub durable_cap: Option<usize>,
    pub window: Option<usize>,
    pub context_limit: Option<usize>,
    pub system_prompt: Option<String>,
    pub store_dir: Option<PathBuf>,
}

impl ConfabConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. Host overrides
    /// 2. Environment variables
    /// 3. Config file (~/.confab/config.toml)
    /// 4. Defaults
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        let settings = load_settings_file(&config_dir.join("config.toml"));
        Self::resolve(overrides, settings, config_dir)
    }

    fn resolve(
        overrides: Overrides,
        settings: SettingsFile,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let memory_cap = overrides
            .memory_cap
            .or(settings.history.memory_cap)
            .unwrap_or(DEFAULT_MEMORY_CAP);
        let durable_cap = overrides
            .durable_cap
            .or(settings.history.durable_cap)
            .unwrap_or(DEFAULT_DURABLE_CAP);
        let system_prompt = overrides
            .system_prompt
            .or_else(|| std::env::var("CONFAB_SYSTEM_PROMPT").ok())
            .or(settings.history.system_prompt);

        let window = overrides
            .window
            .or(settings.reply.window)
            .unwrap_or(DEFAULT_REPLY_WINDOW);
        let context_limit = overrides
            .context_limit
            .or(settings.reply.context_limit)
            .unwrap_or(DEFAULT_CONTEXT_LIMIT);
        let timeout_secs = settings
            .reply
            .completion_timeout_secs
            .unwrap_or(DEFAULT_COMPLETION_TIMEOUT_SECS);

        let store_dir = overrides
            .store_dir
            .or_else(|| std::env::var("CONFAB_STORE_DIR").ok().map(PathBuf::from))
            .or(settings.store.dir);

        if memory_cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.memory_cap".into(),
                message: "retention cap must be positive".into(),
            });
        }
        if durable_cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.durable_cap".into(),
                message: "retention cap must be positive".into(),
            });
        }
        if system_prompt.is_some() && memory_cap < 2 {
            tracing::warn!(
                memory_cap,
                "memory cap leaves no room for conversation beside the system turn"
            );
        }

        Ok(ConfabConfig {
            history: HistoryConfig {
                memory_cap,
                durable_cap,
                system_prompt,
            },
            reply: ReplyConfig {
                context_limit,
                window,
                completion_timeout: Duration::from_secs(timeout_secs),
            },
            store_dir,
            config_dir,
        })
    }
}

/// Get the Confab config directory path (~/.confab/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONFAB_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".confab")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &std::path::Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}
