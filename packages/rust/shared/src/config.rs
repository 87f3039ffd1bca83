//! Application configuration for webdoc.
//!
//! User config lives at `~/.webdoc/webdoc.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, WebdocError};
use crate::types::OutputFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "webdoc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".webdoc";

/// User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("webdoc/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching webdoc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Keyword and category filters.
    #[serde(default)]
    pub filters: FiltersConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum number of pages admitted to fetching.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed. Absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,

    /// Seconds to wait before each request.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Number of concurrent fetch workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retries for transient fetch failures.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Default output format.
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Whether to generate a table of contents.
    #[serde(default)]
    pub toc: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: None,
            delay_secs: default_delay_secs(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            retries: default_retries(),
            format: default_format(),
            toc: false,
        }
    }
}

fn default_max_pages() -> usize {
    250
}
fn default_delay_secs() -> f64 {
    1.0
}
fn default_timeout_secs() -> f64 {
    10.0
}
fn default_concurrency() -> usize {
    1
}
fn default_retries() -> u32 {
    2
}
fn default_format() -> OutputFormat {
    OutputFormat::Pdf
}

/// `[filters]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Pages must mention at least one of these keywords (when non-empty).
    #[serde(default)]
    pub contains: Vec<String>,

    /// Pages mentioning any of these keywords are dropped.
    #[serde(default)]
    pub not_contains: Vec<String>,

    /// Pages must belong to one of these categories (when non-empty).
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FiltersConfig {
    /// Lowercase, trim and de-empty every list.
    pub fn normalized(&self) -> Self {
        let clean = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            contains: clean(&self.contains),
            not_contains: clean(&self.not_contains),
            categories: clean(&self.categories),
        }
    }

    /// Whether no filter is configured.
    pub fn is_empty(&self) -> bool {
        self.contains.is_empty() && self.not_contains.is_empty() && self.categories.is_empty()
    }
}

/// Split a comma-separated CLI list into trimmed, lowercased, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Convert a seconds value from config or flags into a [`Duration`].
pub fn seconds(name: &str, value: f64) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        return Err(WebdocError::config(format!(
            "{name} must be a finite number of seconds >= 0, got {value}"
        )));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| WebdocError::config(format!("{name} is out of range ({value} seconds): {e}")))
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// How the initial frontier is populated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SitemapMode {
    /// Follow links from the seed.
    #[default]
    Off,
    /// Probe the well-known sitemap locations.
    Auto,
    /// Use the given sitemap URL.
    Url(Url),
}

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Seed URL the crawl starts from and is scoped to.
    pub seed: Url,
    /// Maximum link depth; `None` is unlimited.
    pub max_depth: Option<u32>,
    /// Maximum number of pages admitted to fetching.
    pub max_pages: usize,
    /// Delay observed before every request, per worker.
    pub delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Number of concurrent fetch workers.
    pub concurrency: usize,
    /// Retries for transient fetch failures.
    pub retries: u32,
    /// Keyword and category filters (normalized).
    pub filters: FiltersConfig,
    /// Sitemap discovery mode.
    pub sitemap: SitemapMode,
    /// User-Agent header value.
    pub user_agent: String,
}

impl CrawlConfig {
    /// Build a crawl config for `seed` from the loaded application config.
    pub fn from_app_config(seed: Url, config: &AppConfig) -> Result<Self> {
        let defaults = &config.defaults;
        Ok(Self {
            seed,
            max_depth: defaults.max_depth,
            max_pages: defaults.max_pages,
            delay: seconds("delay_secs", defaults.delay_secs)?,
            timeout: seconds("timeout_secs", defaults.timeout_secs)?,
            concurrency: defaults.concurrency,
            retries: defaults.retries,
            filters: config.filters.normalized(),
            sitemap: SitemapMode::Off,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// A config with built-in defaults for `seed`.
    pub fn new(seed: Url) -> Self {
        let defaults = DefaultsConfig::default();
        Self {
            seed,
            max_depth: defaults.max_depth,
            max_pages: defaults.max_pages,
            delay: Duration::from_secs_f64(defaults.delay_secs),
            timeout: Duration::from_secs_f64(defaults.timeout_secs),
            concurrency: defaults.concurrency,
            retries: defaults.retries,
            filters: FiltersConfig::default(),
            sitemap: SitemapMode::Off,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Reject option values the crawler cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.seed.scheme(), "http" | "https") {
            return Err(WebdocError::config(format!(
                "seed URL must be http or https, got {}",
                self.seed
            )));
        }
        if self.seed.host_str().is_none() {
            return Err(WebdocError::config(format!("seed URL has no host: {}", self.seed)));
        }
        if self.max_pages == 0 {
            return Err(WebdocError::config("max_pages must be greater than 0"));
        }
        if self.timeout.is_zero() {
            return Err(WebdocError::config("timeout must be greater than 0"));
        }
        if self.concurrency == 0 {
            return Err(WebdocError::config("concurrency must be at least 1"));
        }
        if let SitemapMode::Url(url) = &self.sitemap {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(WebdocError::config(format!(
                    "sitemap URL must be http or https, got {url}"
                )));
            }
        }
        Ok(())
    }

    /// Whether a page at `depth` may still have its children enqueued.
    pub fn can_descend(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    /// Whether a page at `depth` is within the depth limit.
    pub fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.webdoc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WebdocError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.webdoc/webdoc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| WebdocError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| WebdocError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| WebdocError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| WebdocError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| WebdocError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
