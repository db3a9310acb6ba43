//! Movie metadata lookups against TMDb, used for posters of movies the guide
//! provider has no artwork for.

use crate::config::TmdbConfig;
use crate::guide::images::ImageCandidate;
use crate::provider::client::RateLimitedClient;
use crate::provider::json::parse_json_with_context;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3/";

const MIN_POSTER_WIDTH: u32 = 300;
const MIN_BACKDROP_WIDTH: u32 = 500;

#[derive(Debug, Deserialize)]
struct ConfigurationResponse {
    images: ImageConfiguration,
}

#[derive(Debug, Deserialize)]
struct ImageConfiguration {
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    secure_base_url: Option<String>,
    #[serde(default)]
    poster_sizes: Vec<String>,
    #[serde(default)]
    backdrop_sizes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageSizes {
    base_url: String,
    poster: String,
    backdrop: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieResult {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

/// First size label `wN` with `N >= min_width`; falls back to the first label.
pub fn select_size(sizes: &[String], min_width: u32) -> Option<String> {
    sizes
        .iter()
        .find(|size| {
            size.strip_prefix('w')
                .and_then(|w| w.parse::<u32>().ok())
                .is_some_and(|w| w >= min_width)
        })
        .or_else(|| sizes.first())
        .cloned()
}

pub struct TmdbApi {
    client: Arc<RateLimitedClient>,
    settings: TmdbConfig,
    sizes: OnceLock<ImageSizes>,
}

impl TmdbApi {
    pub fn new(client: Arc<RateLimitedClient>, settings: TmdbConfig) -> Self {
        Self {
            client,
            settings,
            sizes: OnceLock::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.client.is_alive() && self.sizes.get().is_some()
    }

    /// Fetches the image configuration. On failure the client is marked not alive
    /// and every later lookup is skipped.
    pub async fn initialize(&self) -> bool {
        if self.sizes.get().is_some() {
            return true;
        }

        let path = format!(
            "configuration?api_key={}",
            urlencoding::encode(&self.settings.api_key)
        );
        let parsed = match self.client.get(&path).await {
            Some(body) => parse_json_with_context::<ConfigurationResponse>(&body)
                .map_err(|e| error!(error = %e, "Failed to parse TMDb configuration"))
                .ok(),
            None => None,
        };

        let Some(config) = parsed else {
            warn!("TMDb configuration unavailable, movie posters disabled");
            self.client.set_alive(false);
            return false;
        };

        let images = config.images;
        let sizes = ImageSizes {
            base_url: images.secure_base_url.unwrap_or(images.base_url),
            poster: select_size(&images.poster_sizes, MIN_POSTER_WIDTH).unwrap_or_default(),
            backdrop: select_size(&images.backdrop_sizes, MIN_BACKDROP_WIDTH)
                .unwrap_or_default(),
        };
        info!(
            poster_size = sizes.poster,
            backdrop_size = sizes.backdrop,
            "TMDb configuration loaded"
        );
        let _ = self.sizes.set(sizes);
        true
    }

    /// Searches movies by title, narrowed to the release year when known.
    pub async fn search_movie(&self, title: &str, year: Option<u16>) -> Option<Vec<MovieResult>> {
        if !self.is_alive() {
            return None;
        }

        let mut path = format!(
            "search/movie?api_key={}&language={}&query={}&include_adult={}",
            urlencoding::encode(&self.settings.api_key),
            urlencoding::encode(&self.settings.language),
            urlencoding::encode(title),
            self.settings.include_adult,
        );
        if let Some(year) = year {
            path.push_str(&format!("&primary_release_year={year}"));
        }

        let body = self.client.get(&path).await?;
        match parse_json_with_context::<SearchResponse>(&body) {
            Ok(response) => {
                debug!(title, results = response.results.len(), "TMDb search completed");
                Some(response.results)
            }
            Err(e) => {
                error!(title, error = %e, "Failed to parse TMDb search response");
                None
            }
        }
    }

    /// The poster of a search result as a `2x3` image candidate.
    pub fn poster_candidate(&self, movie: &MovieResult) -> Option<ImageCandidate> {
        let sizes = self.sizes.get()?;
        let poster = movie.poster_path.as_deref().filter(|p| !p.is_empty())?;
        Some(ImageCandidate {
            uri: Some(format!("{}{}{}", sizes.base_url, sizes.poster, poster)),
            aspect: Some("2x3".to_string()),
            size: Some("Md".to_string()),
            category: Some("Poster Art".to_string()),
            ..Default::default()
        })
    }

    /// The backdrop of a search result as a `16x9` image candidate.
    pub fn backdrop_candidate(&self, movie: &MovieResult) -> Option<ImageCandidate> {
        let sizes = self.sizes.get()?;
        let backdrop = movie.backdrop_path.as_deref().filter(|p| !p.is_empty())?;
        Some(ImageCandidate {
            uri: Some(format!("{}{}{}", sizes.base_url, sizes.backdrop, backdrop)),
            aspect: Some("16x9".to_string()),
            size: Some("Md".to_string()),
            category: Some("Iconic".to_string()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sizes(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&["w92", "w154", "w185", "w342", "w500", "original"], 300, Some("w342"))]
    #[case(&["w300", "w780", "w1280", "original"], 500, Some("w780"))]
    #[case(&["w92", "original"], 300, Some("w92"))]
    #[case(&[], 300, None)]
    fn test_select_size(#[case] labels: &[&str], #[case] min: u32, #[case] expected: Option<&str>) {
        assert_eq!(select_size(&sizes(labels), min).as_deref(), expected);
    }
}
