use super::AssemblyPipeline;
use crate::guide::ids::{self, IdPrefix};
use crate::guide::{Advisories, ContentRating, Program, ProgramFlags};
use crate::provider::models::ProgramRecord;
use crate::scraper::batch::MAX_QUERIES;
use crate::scraper::progress::Stage;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

impl AssemblyPipeline {
    /// Resolves every scheduled program from the cache or the provider and links
    /// it to its series.
    pub async fn programs(&mut self) {
        let pending: Vec<(String, String)> = self
            .pending_programs
            .iter()
            .map(|(id, md5)| (id.clone(), ids::program_cache_key(id, md5.as_deref())))
            .collect();
        self.progress.begin(Stage::Programs, pending.len());

        let mut records: HashMap<String, ProgramRecord> = HashMap::with_capacity(pending.len());
        let mut misses: Vec<String> = Vec::new();
        for (program_id, cache_key) in &pending {
            let Ok(text) = self.cache.get_asset(cache_key) else {
                misses.push(program_id.clone());
                continue;
            };
            match serde_json::from_str::<ProgramRecord>(&text) {
                Ok(record) => {
                    records.insert(program_id.clone(), record);
                }
                Err(e) => {
                    warn!(program = program_id, error = %e, "Cached program unreadable, refetching");
                    misses.push(program_id.clone());
                }
            }
        }
        debug!(
            cached = records.len(),
            misses = misses.len(),
            "Program cache checked"
        );

        let api = self.api.clone();
        let fetched = self
            .fetcher
            .fetch_all(&misses, MAX_QUERIES, move |batch: Vec<String>| {
                let api = api.clone();
                async move { api.programs(&batch).await }
            })
            .await;

        let cache_keys: HashMap<&str, &str> = pending
            .iter()
            .map(|(id, key)| (id.as_str(), key.as_str()))
            .collect();
        for record in fetched.into_iter().flatten() {
            let Some(cache_key) = cache_keys.get(record.program_id.as_str()) else {
                warn!(program = record.program_id, "Provider returned an unrequested program");
                continue;
            };
            match serde_json::to_string(&record) {
                Ok(text) => self.cache.add_asset(cache_key, &text),
                Err(e) => error!(program = record.program_id, error = %e, "Failed to cache program"),
            }
            records.insert(record.program_id.clone(), record);
        }

        for (program_id, _) in &pending {
            let Some(record) = records.remove(program_id) else {
                continue;
            };
            let series = if record_is_movie(&record) {
                None
            } else {
                self.resolver
                    .resolve_program(&mut self.graph, program_id, record.title())
            };
            let mut program = program_from_record(&record);
            program.series = series;
            self.graph.insert_program(program);
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(
            programs = self.graph.program_count(),
            series = self.graph.series_count(),
            "Programs resolved"
        );
    }
}

fn record_is_movie(record: &ProgramRecord) -> bool {
    IdPrefix::from_id(&record.program_id) == Some(IdPrefix::Movie)
        || record
            .entity_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("movie"))
}

/// Maps a provider record onto a [`Program`] node (ids assigned on insertion).
fn program_from_record(record: &ProgramRecord) -> Program {
    let mut flags = record
        .genres
        .iter()
        .fold(ProgramFlags::empty(), |acc, genre| acc | ProgramFlags::from_genre(genre));
    if let Some(show_type) = &record.show_type {
        flags |= ProgramFlags::from_show_type(show_type);
    }
    match IdPrefix::from_id(&record.program_id) {
        Some(IdPrefix::Episode) => flags |= ProgramFlags::EPISODIC,
        Some(IdPrefix::Show) => flags |= ProgramFlags::GENERIC,
        Some(IdPrefix::Sports) => flags |= ProgramFlags::SPORTS,
        Some(IdPrefix::Movie) | None => {}
    }
    if record_is_movie(record) {
        flags |= ProgramFlags::MOVIE;
    }

    let advisories = record
        .content_advisory
        .iter()
        .fold(Advisories::empty(), |acc, label| acc | Advisories::from_label(label));
    let (season_number, episode_number) = record.season_episode();

    Program {
        id: 0,
        uid: String::new(),
        program_id: record.program_id.clone(),
        title: record.title().to_string(),
        episode_title: record.episode_title150.clone(),
        description: record.descriptions.long(),
        short_description: record.descriptions.short(),
        season_number,
        episode_number,
        year: record
            .movie
            .as_ref()
            .and_then(|m| m.year.as_deref())
            .and_then(|y| y.trim().parse().ok()),
        original_air_date: record.original_air_date,
        content_ratings: record
            .content_rating
            .iter()
            .map(|r| ContentRating {
                body: r.body.clone(),
                code: r.code.clone(),
            })
            .collect(),
        advisories,
        flags,
        series: None,
        guide_image: None,
    }
}
