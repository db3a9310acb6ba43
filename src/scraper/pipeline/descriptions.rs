use super::AssemblyPipeline;
use crate::guide::ids;
use crate::provider::models::GenericDescription;
use crate::scraper::batch::MAX_IMAGE_QUERIES;
use crate::scraper::progress::Stage;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

impl AssemblyPipeline {
    /// Fills series descriptions from cached or fetched generic descriptions.
    /// Sports series have none and are skipped.
    pub async fn series_descriptions(&mut self) {
        let targets: Vec<String> = self
            .graph
            .series()
            .filter(|series| !series.is_sports())
            .map(|series| series.series_id.clone())
            .collect();
        self.progress.begin(Stage::SeriesDescriptions, targets.len());

        let mut queued: Vec<String> = Vec::new();
        for series_id in &targets {
            let cache_key = ids::series_cache_key(series_id);
            match self.cached_description(&cache_key) {
                Some(description) => {
                    self.apply_description(series_id, &description);
                    self.progress.advance(1);
                }
                None => queued.push(series_id.clone()),
            }
        }
        debug!(
            cached = targets.len() - queued.len(),
            misses = queued.len(),
            "Series description cache checked"
        );

        let request_ids: Vec<String> = queued
            .iter()
            .map(|series_id| ids::description_request_id(series_id))
            .collect();
        let api = self.api.clone();
        let fetched = self
            .fetcher
            .fetch_all(&request_ids, MAX_IMAGE_QUERIES, move |batch: Vec<String>| {
                let api = api.clone();
                async move {
                    api.descriptions(&batch)
                        .await
                        .map(|found| found.into_iter().collect::<Vec<_>>())
                }
            })
            .await;

        // series key -> description
        let mut responses: HashMap<String, GenericDescription> = HashMap::with_capacity(fetched.len());
        for (request_id, description) in fetched {
            let owner = ids::description_to_series_key(&request_id)
                .and_then(|cache_key| self.resolver.owner_key(&self.graph, &cache_key));
            match owner {
                Some(series_id) => {
                    responses.insert(series_id, description);
                }
                None => warn!(request_id, "No series owns description, skipping"),
            }
        }

        for series_id in &queued {
            let Some(description) = responses.remove(series_id) else {
                continue;
            };
            let cache_key = ids::series_cache_key(series_id);
            match serde_json::to_string(&description) {
                Ok(text) if self.cache.contains_key(&cache_key) => {
                    self.cache.update_asset_json_entry(&cache_key, &text)
                }
                Ok(text) => self.cache.add_asset(&cache_key, &text),
                Err(e) => error!(series = series_id, error = %e, "Failed to cache description"),
            }
            self.apply_description(series_id, &description);
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(series = targets.len(), fetched = queued.len(), "Series descriptions resolved");
    }

    /// Parsed cached description, or `None` when absent or unreadable.
    fn cached_description(&self, cache_key: &str) -> Option<GenericDescription> {
        let text = self.cache.get_asset(cache_key).ok()?;
        if text.is_empty() {
            return None;
        }
        serde_json::from_str(&text)
            .map_err(|e| warn!(cache_key, error = %e, "Cached description unreadable, refetching"))
            .ok()
    }

    fn apply_description(&mut self, series_id: &str, description: &GenericDescription) {
        let Some(series) = self.graph.series_mut(series_id) else {
            return;
        };
        if description.code != 0 {
            return;
        }
        series.short_description = description.description100.clone();
        series.description = description.description1000.clone();
        if let Some(date) = description.start_airdate.as_deref().and_then(parse_air_date) {
            series.start_air_date = Some(date);
        }
    }
}

pub(super) fn parse_air_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}
