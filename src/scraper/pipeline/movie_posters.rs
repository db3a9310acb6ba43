use super::{AssemblyPipeline, POSTER_ASPECT};
use crate::guide::ids;
use crate::guide::images::{ImageCandidate, image_for_aspect};
use crate::scraper::progress::Stage;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A movie waiting on a poster lookup.
#[derive(Debug, Clone)]
struct PosterQuery {
    title: String,
    year: Option<u16>,
    programs: Vec<String>,
}

impl AssemblyPipeline {
    /// Finds posters on TMDb for movies that have no guide image.
    pub async fn movie_posters(&mut self) {
        let Some(tmdb) = self.tmdb.clone() else {
            debug!("TMDb not configured, skipping movie posters");
            self.progress.begin(Stage::MoviePosters, 0);
            return;
        };
        if !tmdb.initialize().await {
            self.progress.begin(Stage::MoviePosters, 0);
            return;
        }

        // 10-character MV head -> query, in program order
        let mut movies: IndexMap<String, PosterQuery> = IndexMap::new();
        for program in self.graph.programs() {
            if !program.is_movie() || program.guide_image.is_some() {
                continue;
            }
            let Some(head) = ids::id_head(&program.program_id) else {
                continue;
            };
            movies
                .entry(head.to_string())
                .or_insert_with(|| PosterQuery {
                    title: program.title.clone(),
                    year: program.year,
                    programs: Vec::new(),
                })
                .programs
                .push(program.program_id.clone());
        }
        self.progress.begin(Stage::MoviePosters, movies.len());

        let mut queued: Vec<String> = Vec::new();
        for (head, query) in &movies {
            match self.cache.get_images(head) {
                Some(text) if text.is_empty() => self.progress.advance(1),
                Some(text) => match serde_json::from_str::<Vec<ImageCandidate>>(&text) {
                    Ok(images) => {
                        self.apply_movie_images(&query.programs, &images);
                        self.progress.advance(1);
                    }
                    Err(e) => {
                        warn!(head, error = %e, "Cached poster unreadable, refetching");
                        queued.push(head.clone());
                    }
                },
                None => queued.push(head.clone()),
            }
        }
        debug!(cached = movies.len() - queued.len(), queued = queued.len(), "Poster cache checked");

        let lookups: Arc<HashMap<String, (String, Option<u16>)>> = Arc::new(
            queued
                .iter()
                .filter_map(|head| {
                    movies
                        .get(head)
                        .map(|q| (head.clone(), (q.title.clone(), q.year)))
                })
                .collect(),
        );
        let search = Arc::clone(&tmdb);
        let fetched = self
            .fetcher
            .fetch_all(&queued, 1, move |batch: Vec<String>| {
                let tmdb = Arc::clone(&search);
                let lookups = Arc::clone(&lookups);
                async move {
                    let mut found = Vec::with_capacity(batch.len());
                    for head in batch {
                        let Some((title, year)) = lookups.get(&head) else {
                            continue;
                        };
                        let results = tmdb.search_movie(title, *year).await?;
                        let images: Vec<ImageCandidate> = results
                            .first()
                            .map(|movie| {
                                [tmdb.poster_candidate(movie), tmdb.backdrop_candidate(movie)]
                                    .into_iter()
                                    .flatten()
                                    .collect()
                            })
                            .unwrap_or_default();
                        found.push((head, images));
                    }
                    Some(found)
                }
            })
            .await;

        let mut responses: HashMap<String, Vec<ImageCandidate>> = fetched.into_iter().collect();
        for head in &queued {
            let Some(images) = responses.remove(head) else {
                continue;
            };
            if images.is_empty() {
                self.cache.update_asset_images(head, "");
            } else {
                match serde_json::to_string(&images) {
                    Ok(text) => self.cache.update_asset_images(head, &text),
                    Err(e) => error!(head, error = %e, "Failed to cache poster"),
                }
                if let Some(query) = movies.get(head) {
                    self.apply_movie_images(&query.programs, &images);
                }
            }
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(movies = movies.len(), searched = queued.len(), "Movie posters resolved");
    }

    fn apply_movie_images(&mut self, program_ids: &[String], images: &[ImageCandidate]) {
        let Some(uri) = image_for_aspect(images, POSTER_ASPECT).and_then(|i| i.uri.as_deref()) else {
            return;
        };
        let image_id = self.graph.guide_image_id(uri);
        for program_id in program_ids {
            if let Some(program) = self.graph.program_mut(program_id) {
                program.guide_image = Some(image_id);
            }
        }
    }
}
