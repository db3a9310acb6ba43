//! Application configuration.
//!
//! Merged from built-in defaults, an optional TOML file and `GUIDE_`-prefixed
//! environment variables (nested keys separated by `__`, e.g.
//! `GUIDE_TMDB__API_KEY`).

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "guidebuilder.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Level applied to this crate's targets when `RUST_LOG` is unset.
    pub log_level: String,
    pub base_url: String,
    /// Provider session token, sent as the `token` header.
    pub token: Option<String>,
    pub lineups: Vec<String>,
    pub schedule_days: u32,
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    /// Entity count fed to the refresh cycle; 0 uses the number of stations ingested.
    pub expected_service_count: u64,
    pub series_poster_art: bool,
    pub extended_series_data: bool,
    pub max_parallel_downloads: usize,
    pub request_timeout_secs: u64,
    pub rate_limiting: RateLimitingConfig,
    pub tmdb: Option<TmdbConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_url: "https://json.schedulesdirect.org/20141201/".to_string(),
            token: None,
            lineups: Vec::new(),
            schedule_days: 14,
            cache_path: PathBuf::from("guidebuilder-cache.json"),
            output_path: PathBuf::from("guide.json"),
            expected_service_count: 0,
            series_poster_art: false,
            extended_series_data: true,
            max_parallel_downloads: 4,
            request_timeout_secs: 30,
            rate_limiting: RateLimitingConfig::default(),
            tmdb: None,
        }
    }
}

impl Config {
    /// Loads configuration. Only the default TOML file may be missing; an
    /// explicitly named one must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = match path {
            Some(file) if !file.is_file() => {
                return Err(format!("config file not found: {}", file.display()).into());
            }
            Some(file) => file,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };
        Self::figment(file).extract()
    }

    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("GUIDE_").split("__"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Client-side request pacing, applied before every provider request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    pub api_key: String,
    #[serde(default = "default_tmdb_language")]
    pub language: String,
    #[serde(default)]
    pub include_adult: bool,
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}
