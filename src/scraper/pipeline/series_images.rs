use super::AssemblyPipeline;
use crate::guide::ids;
use crate::guide::images::{ImageCandidate, image_for_aspect};
use crate::provider::models::ArtworkResponse;
use crate::scraper::batch::MAX_IMAGE_QUERIES;
use crate::scraper::progress::Stage;
use crate::scraper::refresh::refresh_due_on;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, error, info, trace, warn};

/// Where a series' images come from on this run.
#[derive(Debug)]
enum ImageState {
    /// Cached list, no refresh due.
    Fresh(Vec<ImageCandidate>),
    /// Cached "no images" sentinel, no refresh due.
    Empty,
    /// Must be fetched: absent, unreadable or due for refresh.
    Queued,
}

impl AssemblyPipeline {
    /// Picks representative artwork for every series and links its guide image.
    pub async fn series_images(&mut self) {
        let series_ids = self.graph.series_ids();
        self.progress.begin(Stage::SeriesImages, series_ids.len());
        let expected = self.expected_count();

        // series key -> (cache key, ids requested from the provider)
        let mut queued: IndexMap<String, (String, Vec<String>)> = IndexMap::new();
        for series_id in &series_ids {
            let Some((cache_key, request_ids)) = self.artwork_keys(series_id) else {
                warn!(series = series_id, "Series has no provider id for artwork, skipping");
                continue;
            };

            // sports keys have no numeric id and never enter the refresh cycle
            let refresh = ids::numeric_series_id(series_id)
                .is_some_and(|id| refresh_due_on(id, expected, self.today));
            let state = match self.cache.get_images(&cache_key) {
                Some(_) if refresh => ImageState::Queued,
                Some(text) if text.is_empty() => ImageState::Empty,
                Some(text) => match serde_json::from_str::<Vec<ImageCandidate>>(&text) {
                    Ok(images) => ImageState::Fresh(images),
                    Err(e) => {
                        warn!(cache_key, error = %e, "Cached images unreadable, refetching");
                        ImageState::Queued
                    }
                },
                None => ImageState::Queued,
            };
            trace!(series = series_id, refresh, state = ?state, "Series image state");

            match state {
                ImageState::Fresh(images) => {
                    self.apply_series_images(series_id, images);
                    self.progress.advance(1);
                }
                ImageState::Empty => self.progress.advance(1),
                ImageState::Queued => {
                    queued.insert(series_id.clone(), (cache_key, request_ids));
                }
            }
        }
        debug!(
            cached = series_ids.len() - queued.len(),
            queued = queued.len(),
            "Series image cache checked"
        );

        let request_ids: Vec<String> = queued
            .values()
            .flat_map(|(_, request_ids)| request_ids.iter().cloned())
            .collect();
        let api = self.api.clone();
        let fetched = self
            .fetcher
            .fetch_all(&request_ids, MAX_IMAGE_QUERIES, move |batch: Vec<String>| {
                let api = api.clone();
                async move { api.artwork(&batch).await }
            })
            .await;
        let responses = self.index_artwork(fetched);

        for (series_id, (cache_key, request_ids)) in &queued {
            let answered: Vec<&Option<Vec<ImageCandidate>>> = request_ids
                .iter()
                .filter_map(|id| responses.get(id))
                .collect();
            if answered.is_empty() {
                // no response at all: left unresolved, retried next run
                continue;
            }
            let Some(answered) = answered.into_iter().map(Option::as_ref).collect::<Option<Vec<_>>>()
            else {
                warn!(series = series_id, cache_key, "Artwork response unreadable, leaving unresolved");
                continue;
            };

            let candidates: Vec<ImageCandidate> = answered.into_iter().flatten().cloned().collect();
            let selected = self.selector.select_list(&candidates);
            if selected.is_empty() {
                self.cache.update_asset_images(cache_key, "");
            } else {
                match serde_json::to_string(&selected) {
                    Ok(text) => self.cache.update_asset_images(cache_key, &text),
                    Err(e) => error!(cache_key, error = %e, "Failed to cache series images"),
                }
                self.apply_series_images(series_id, selected);
            }
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(
            series = series_ids.len(),
            fetched = queued.len(),
            images = self.graph.image_count(),
            "Series images resolved"
        );
    }

    /// Cache key and artwork request ids for a series.
    ///
    /// Numeric series use `SH{body}0000`; sports series are stored under their
    /// first event and request every event sharing the key.
    fn artwork_keys(&self, series_id: &str) -> Option<(String, Vec<String>)> {
        if !ids::is_sports_key(series_id) {
            let cache_key = ids::series_cache_key(series_id);
            return Some((cache_key.clone(), vec![cache_key]));
        }
        let request_ids: Vec<String> = self
            .resolver
            .sports_heads(series_id)
            .into_iter()
            .map(|head| format!("{head}0000"))
            .collect();
        let cache_key = request_ids.first()?.clone();
        Some((cache_key, request_ids))
    }

    /// Keys artwork responses by program id, dropping records no series owns.
    /// An error payload counts as an answer with no images; a payload of
    /// neither shape maps to `None`.
    fn index_artwork(
        &self,
        fetched: Vec<ArtworkResponse>,
    ) -> HashMap<String, Option<Vec<ImageCandidate>>> {
        let mut responses = HashMap::with_capacity(fetched.len());
        for response in fetched {
            if self.resolver.owner_key(&self.graph, &response.program_id).is_none() {
                warn!(program = response.program_id, "No series owns artwork, skipping");
                continue;
            }
            let images = match response.unreadable() {
                Some(e) => {
                    warn!(program = response.program_id, error = e, "Artwork payload unreadable");
                    None
                }
                None => Some(response.images().map(<[_]>::to_vec).unwrap_or_default()),
            };
            responses.insert(response.program_id, images);
        }
        responses
    }

    fn apply_series_images(&mut self, series_id: &str, images: Vec<ImageCandidate>) {
        let guide_image = image_for_aspect(&images, self.series_aspect())
            .and_then(|image| image.uri.as_deref())
            .map(|uri| self.graph.guide_image_id(uri));
        if let Some(series) = self.graph.series_mut(series_id) {
            series.images = images;
            series.guide_image = guide_image.or(series.guide_image);
        }
    }
}
