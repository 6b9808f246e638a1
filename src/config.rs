use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const API_BASE_ENV: &str = "FACT_FEED_API_BASE";
const PER_PAGE_ENV: &str = "FACT_FEED_PER_PAGE";
/// WordPress rejects `per_page` above this.
const MAX_PER_PAGE: u32 = 100;

fn valid_per_page(per_page: u32) -> bool {
    (1..=MAX_PER_PAGE).contains(&per_page)
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Where and how the posts listing is fetched.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Origin of the WordPress REST API, e.g. "https://example.com/wp-json/wp/v2"
    pub api_base: String,
    /// Value of the `per_page` query parameter.
    pub per_page: u32,
    /// Transport timeout applied by the HTTP client.
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.factcrescendo.com/wp-json/wp/v2".to_string(),
            per_page: 25,
            request_timeout_secs: 15,
        }
    }
}

impl NetworkConfig {
    /// Reset values the API or the HTTP client can't work with to their defaults.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !valid_per_page(self.per_page) {
            tracing::warn!(
                per_page = self.per_page,
                "per_page must be 1..={}, using {}",
                MAX_PER_PAGE,
                defaults.per_page
            );
            self.per_page = defaults.per_page;
        }
        if self.request_timeout_secs == 0 {
            tracing::warn!(
                "request_timeout_secs must be positive, using {}",
                defaults.request_timeout_secs
            );
            self.request_timeout_secs = defaults.request_timeout_secs;
        }
        if self.api_base.trim().is_empty() {
            tracing::warn!("api_base is empty, using {}", defaults.api_base);
            self.api_base = defaults.api_base;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    /// Minimum time the pull-to-refresh indicator stays visible.
    pub refresh_indicator_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_indicator_ms: 2000,
        }
    }
}

impl FeedConfig {
    pub fn refresh_indicator(&self) -> Duration {
        Duration::from_millis(self.refresh_indicator_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Per-module overrides, e.g. `{"fact_feed::internal::feed": "debug"}`
    pub module_levels: BTreeMap<String, String>,
    /// Write logs to a daily rolling file in this directory instead of stderr.
    pub log_directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: BTreeMap::new(),
            log_directory: None,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive string built from the level and module overrides.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.level.clone();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level));
        }
        filter
    }
}

impl AppConfig {
    /// Load `config.ron` from the working directory, next to the executable or the
    /// user config directory, then apply environment overrides.
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from("config.ron")];

        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join("config.ron"));
        }

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("fact-feed").join("config.ron"));
        }

        let mut config = candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from(path) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::error!("{e:#}");
                    None
                }
            })
            .unwrap_or_else(|| {
                tracing::info!("No config file found, using defaults");
                Self::default()
            });

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::from_ron(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Parse RON and reset out-of-range values to their defaults.
    pub fn from_ron(content: &str) -> Result<Self> {
        let mut config: Self = ron::from_str(content).context("invalid RON")?;
        config.network.sanitize();
        Ok(config)
    }

    /// Apply `FACT_FEED_API_BASE` / `FACT_FEED_PER_PAGE` style overrides.
    /// `lookup` is injected so tests don't touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::info!(api_base = %base, "api base overridden from environment");
            self.network.api_base = base;
        }

        if let Some(raw) = lookup(PER_PAGE_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(per_page) if valid_per_page(per_page) => self.network.per_page = per_page,
                _ => tracing::warn!(value = %raw, "ignoring invalid {}", PER_PAGE_ENV),
            }
        }
    }
}
