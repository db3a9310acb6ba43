use crate::cache::CacheStore;
use crate::config::Config;
use crate::guide::GuideGraph;
use crate::provider::tmdb::TMDB_BASE_URL;
use crate::provider::{GuideApi, RateLimitedClient, TmdbApi};
use crate::scraper::{AssemblyPipeline, PipelineSettings, Progress};
use crate::utils::fmt_duration;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// One guide build: load the cache, assemble, write the graph, persist the cache.
pub struct App {
    config: Config,
    output_path: PathBuf,
    prune_cache: bool,
}

impl App {
    pub fn new(config: Config, output: Option<PathBuf>, prune_cache: bool) -> Self {
        let output_path = output.unwrap_or_else(|| config.output_path.clone());
        Self {
            config,
            output_path,
            prune_cache,
        }
    }

    pub async fn run(&self) -> anyhow::Result<GuideGraph> {
        let start = Instant::now();
        if self.config.lineups.is_empty() {
            warn!("No lineups configured, the guide will be empty");
        }

        let cache = Arc::new(
            CacheStore::load(&self.config.cache_path)
                .await
                .context("Failed to load cache")?,
        );

        let base_url = Url::parse(&self.config.base_url).context("Invalid provider base URL")?;
        let client = RateLimitedClient::new(
            base_url,
            self.config.token.clone(),
            self.config.request_timeout(),
            self.config.rate_limiting.requests_per_second,
        )
        .context("Failed to build provider client")?;
        let api = GuideApi::new(Arc::new(client));

        let mut pipeline =
            AssemblyPipeline::new(api, Arc::clone(&cache), PipelineSettings::from(&self.config));
        if let Some(tmdb) = self.tmdb_api()? {
            pipeline = pipeline.with_tmdb(Arc::new(tmdb));
        }

        let progress_logger = tokio::spawn(log_progress(pipeline.progress().subscribe()));
        pipeline.run().await;
        progress_logger.abort();
        let graph = pipeline.into_graph();

        if graph.station_count() == 0 {
            warn!("No stations were ingested; check the configured lineups and token");
        }

        self.write_output(&graph).await?;

        if self.prune_cache {
            let removed = cache.prune_unused();
            info!(removed, "Unused cache entries pruned");
        }
        cache.flush().await.context("Failed to write cache")?;

        info!(
            output = %self.output_path.display(),
            duration = fmt_duration(start.elapsed()),
            "Guide build complete"
        );
        Ok(graph)
    }

    fn tmdb_api(&self) -> anyhow::Result<Option<TmdbApi>> {
        let Some(settings) = self.config.tmdb.clone() else {
            return Ok(None);
        };
        let base_url = Url::parse(TMDB_BASE_URL).context("Invalid TMDb base URL")?;
        let client = RateLimitedClient::new(
            base_url,
            None,
            self.config.request_timeout(),
            self.config.rate_limiting.requests_per_second,
        )
        .context("Failed to build TMDb client")?;
        Ok(Some(TmdbApi::new(Arc::new(client), settings)))
    }

    async fn write_output(&self, graph: &GuideGraph) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(graph).context("Failed to serialize guide")?;
        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&self.output_path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.output_path.display()))
    }
}

async fn log_progress(mut rx: watch::Receiver<Progress>) {
    while rx.changed().await.is_ok() {
        let progress = *rx.borrow_and_update();
        debug!(
            stage = %progress.stage,
            stage_index = progress.stage.index(),
            processed = progress.processed,
            total = progress.total,
            "Progress"
        );
    }
}
