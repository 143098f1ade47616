//! Configuration file parser for ~/.config/dailybrief/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown top-level keys are ignored by serde but logged as warnings, since
//! they are usually typos.
//!
//! ```toml
//! default_main = "国际"
//! default_sub = "AI"
//!
//! [store]
//! url = "https://example.supabase.co"
//! api_key = "..."
//!
//! [[menu.groups]]
//! name = "国内"
//! subs = ["政治", "AI"]
//!
//! [speech]
//! program = "espeak-ng"
//! args = ["-v", "zh"]
//! ```
use crate::content::StoreSettings;
use crate::menu::{Menu, MenuGroup, Selection};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Env var overriding `[store] url`.
pub const STORE_URL_ENV: &str = "DAILYBRIEF_STORE_URL";
/// Env var overriding `[store] api_key`.
pub const STORE_KEY_ENV: &str = "DAILYBRIEF_STORE_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Parsed fine but the values do not make sense together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial main category (two-axis menus).
    pub default_main: Option<String>,
    /// Initial sub-category (two-axis menus).
    pub default_sub: Option<String>,
    /// Initial category (flat menus).
    pub default_category: Option<String>,

    pub store: StoreConfig,
    pub menu: MenuConfig,
    pub speech: SpeechConfig,
}

/// `[store]` section.
///
/// Custom Debug impl masks `api_key` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the store. `DAILYBRIEF_STORE_URL` takes precedence.
    pub url: Option<String>,
    /// API key. `DAILYBRIEF_STORE_KEY` takes precedence.
    pub api_key: Option<String>,
    pub brief_table: String,
    pub quote_table: String,
    pub main_column: String,
    pub sub_column: String,
    pub category_column: String,
    pub order_column: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let defaults = StoreSettings::new("");
        Self {
            url: None,
            api_key: None,
            brief_table: defaults.brief_table,
            quote_table: defaults.quote_table,
            main_column: defaults.main_column,
            sub_column: defaults.sub_column,
            category_column: defaults.category_column,
            order_column: defaults.order_column,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("brief_table", &self.brief_table)
            .field("quote_table", &self.quote_table)
            .field("main_column", &self.main_column)
            .field("sub_column", &self.sub_column)
            .field("category_column", &self.category_column)
            .field("order_column", &self.order_column)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// `[menu]` section: `categories` for a flat menu or `groups` for a
/// two-axis one. Neither set means the stock menu.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub categories: Option<Vec<String>>,
    pub groups: Option<Vec<MenuGroup>>,
}

/// `[speech]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// TTS program. `None` picks the platform default.
    pub program: Option<String>,
    /// Extra arguments placed before the text.
    pub args: Vec<String>,
    pub enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            enabled: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Default location: `~/.config/dailybrief/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("dailybrief")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid loading a huge file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "default_main",
                "default_sub",
                "default_category",
                "store",
                "menu",
                "speech",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Build the category menu described by `[menu]`.
    pub fn to_menu(&self) -> Result<Menu, ConfigError> {
        let menu = match (&self.menu.categories, &self.menu.groups) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "[menu] sets both 'categories' and 'groups'; choose one".to_string(),
                ))
            }
            (Some(categories), None) => Menu::flat(categories.iter().cloned()),
            (None, Some(groups)) => Menu::nested(groups.clone()),
            (None, None) => return Ok(Menu::default()),
        };
        menu.map_err(|e| ConfigError::Invalid(format!("[menu]: {}", e)))
    }

    /// The selection to start on.
    ///
    /// Uses `default_main`/`default_sub` for two-axis menus and
    /// `default_category` for flat ones. Falls back to the menu's first leaf
    /// (with a warning) when the configured value is not in the menu.
    pub fn initial_selection(&self, menu: &Menu) -> Selection {
        let candidate = if menu.is_nested() {
            match (&self.default_main, &self.default_sub) {
                (Some(main), Some(sub)) => Some(Selection::pair(main, sub)),
                (Some(main), None) => menu.select_main(main).ok(),
                _ => None,
            }
        } else {
            self.default_category.as_ref().map(Selection::category)
        };

        match candidate {
            Some(selection) if menu.contains(&selection) => selection,
            Some(selection) => {
                let fallback = menu.first_leaf();
                tracing::warn!(
                    configured = %selection,
                    fallback = %fallback,
                    "Configured default selection is not in the menu"
                );
                fallback
            }
            None => {
                if self.default_main.is_some() || self.default_category.is_some() {
                    tracing::warn!("Configured default selection does not match the menu shape");
                }
                menu.first_leaf()
            }
        }
    }

    /// Resolve store settings from the environment and `[store]`.
    pub fn store_settings(&self) -> Result<StoreSettings, ConfigError> {
        self.store_settings_with(|name| std::env::var(name).ok())
    }

    /// Same as [`store_settings`](Self::store_settings) with an injectable
    /// environment lookup.
    pub fn store_settings_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<StoreSettings, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let url = non_empty(env(STORE_URL_ENV))
            .or_else(|| non_empty(self.store.url.clone()))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "no store URL: set {} or [store] url in the config file",
                    STORE_URL_ENV
                ))
            })?;
        let api_key = non_empty(env(STORE_KEY_ENV))
            .or_else(|| non_empty(self.store.api_key.clone()))
            .map(SecretString::from);
        if api_key.is_none() {
            tracing::warn!("No store API key configured; requests are sent unauthenticated");
        }

        let timeout_secs = if self.store.timeout_secs == 0 {
            tracing::warn!("[store] timeout_secs = 0 is not allowed, using default");
            StoreConfig::default().timeout_secs
        } else {
            self.store.timeout_secs
        };

        let mut settings = StoreSettings::new(url);
        settings.api_key = api_key;
        settings.brief_table = self.store.brief_table.clone();
        settings.quote_table = self.store.quote_table.clone();
        settings.main_column = self.store.main_column.clone();
        settings.sub_column = self.store.sub_column.clone();
        settings.category_column = self.store.category_column.clone();
        settings.order_column = self.store.order_column.clone();
        settings.timeout = Duration::from_secs(timeout_secs);
        Ok(settings)
    }
}

// ============================================================================
// Tests
// ============================================================================
