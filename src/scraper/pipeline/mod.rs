//! Staged assembly of the guide graph.
//!
//! Stages run strictly in sequence; each one fully joins its fetches before
//! the next begins. Within a stage, cache hits resolve immediately, misses are
//! fetched in batches, and responses are applied in graph order so repeated
//! runs over the same data assign the same ids.

mod descriptions;
mod extended;
mod movie_posters;
mod programs;
mod series_images;
mod stations;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::guide::{GuideGraph, ImageSelector, ReferenceResolver};
use crate::provider::{GuideApi, TmdbApi};
use crate::scraper::batch::BatchFetcher;
use crate::scraper::progress::{ProgressTracker, Stage};
use crate::utils::{fmt_duration, log_if_slow};
use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const SLOW_STAGE_THRESHOLD: Duration = Duration::from_secs(120);

/// Aspect used for a series' guide image.
const POSTER_ASPECT: &str = "2x3";
const LANDSCAPE_ASPECT: &str = "4x3";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub lineups: Vec<String>,
    pub schedule_days: u32,
    /// 0 uses the number of stations in the graph.
    pub expected_service_count: u64,
    pub series_poster_art: bool,
    pub extended_series_data: bool,
    pub max_parallel: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            lineups: config.lineups.clone(),
            schedule_days: config.schedule_days,
            expected_service_count: config.expected_service_count,
            series_poster_art: config.series_poster_art,
            extended_series_data: config.extended_series_data,
            max_parallel: config.max_parallel_downloads,
        }
    }
}

pub struct AssemblyPipeline {
    api: GuideApi,
    tmdb: Option<Arc<TmdbApi>>,
    cache: Arc<CacheStore>,
    settings: PipelineSettings,
    fetcher: BatchFetcher,
    selector: ImageSelector,
    resolver: ReferenceResolver,
    progress: ProgressTracker,
    today: NaiveDate,
    graph: GuideGraph,
    /// Program id -> schedule md5, in first-reference order.
    pending_programs: IndexMap<String, Option<String>>,
}

impl AssemblyPipeline {
    pub fn new(api: GuideApi, cache: Arc<CacheStore>, settings: PipelineSettings) -> Self {
        let selector = ImageSelector::new(api.image_base());
        Self {
            fetcher: BatchFetcher::new(settings.max_parallel),
            api,
            tmdb: None,
            cache,
            settings,
            selector,
            resolver: ReferenceResolver::new(),
            progress: ProgressTracker::new(),
            today: Utc::now().date_naive(),
            graph: GuideGraph::new(),
            pending_programs: IndexMap::new(),
        }
    }

    pub fn with_tmdb(mut self, tmdb: Arc<TmdbApi>) -> Self {
        self.tmdb = Some(tmdb);
        self
    }

    /// Overrides the date used for schedules and the refresh cycle.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn graph(&self) -> &GuideGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut GuideGraph {
        &mut self.graph
    }

    pub fn resolver_mut(&mut self) -> &mut ReferenceResolver {
        &mut self.resolver
    }

    pub fn into_graph(self) -> GuideGraph {
        self.graph
    }

    /// Runs every stage in order. Individual failures only leave the graph under-populated.
    pub async fn run(&mut self) {
        let start = Instant::now();
        for stage in Stage::ALL {
            let stage_start = Instant::now();
            match stage {
                Stage::Stations => self.stations().await,
                Stage::Programs => self.programs().await,
                Stage::SeriesDescriptions => self.series_descriptions().await,
                Stage::SeriesImages => self.series_images().await,
                Stage::ExtendedMetadata => self.extended_metadata().await,
                Stage::MoviePosters => self.movie_posters().await,
            }
            log_if_slow(stage, stage_start, SLOW_STAGE_THRESHOLD);
        }

        info!(
            stations = self.graph.station_count(),
            programs = self.graph.program_count(),
            series = self.graph.series_count(),
            images = self.graph.image_count(),
            duration = fmt_duration(start.elapsed()),
            "Guide assembly finished"
        );
    }

    fn expected_count(&self) -> u64 {
        match self.settings.expected_service_count {
            0 => self.graph.station_count() as u64,
            n => n,
        }
    }

    fn series_aspect(&self) -> &'static str {
        if self.settings.series_poster_art {
            POSTER_ASPECT
        } else {
            LANDSCAPE_ASPECT
        }
    }
}
