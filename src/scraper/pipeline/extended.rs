use super::AssemblyPipeline;
use super::descriptions::parse_air_date;
use crate::guide::ids;
use crate::provider::models::{GenericDescription, ProgramRecord};
use crate::scraper::batch::MAX_QUERIES;
use crate::scraper::progress::Stage;
use std::collections::HashMap;
use tracing::{debug, info, warn};

impl AssemblyPipeline {
    /// Looks up the series-level program record of every non-sports series
    /// still missing a start air date.
    pub async fn extended_metadata(&mut self) {
        if !self.settings.extended_series_data {
            debug!("Extended series metadata disabled");
            self.progress.begin(Stage::ExtendedMetadata, 0);
            return;
        }

        let targets: Vec<String> = self
            .graph
            .series()
            .filter(|series| !series.is_sports() && series.start_air_date.is_none())
            .map(|series| series.series_id.clone())
            .collect();
        self.progress.begin(Stage::ExtendedMetadata, targets.len());

        let request_ids: Vec<String> = targets.iter().map(|id| ids::series_cache_key(id)).collect();
        let api = self.api.clone();
        let fetched = self
            .fetcher
            .fetch_all(&request_ids, MAX_QUERIES, move |batch: Vec<String>| {
                let api = api.clone();
                async move { api.programs(&batch).await }
            })
            .await;

        let mut records: HashMap<String, ProgramRecord> = HashMap::new();
        for record in fetched.into_iter().flatten() {
            match self.resolver.owner_key(&self.graph, &record.program_id) {
                Some(series_id) => {
                    records.insert(series_id, record);
                }
                None => warn!(program = record.program_id, "No series owns program record, skipping"),
            }
        }

        let mut dated = 0usize;
        for series_id in &targets {
            let Some(record) = records.remove(series_id) else {
                continue;
            };
            self.apply_extended(series_id, &record);
            if record.original_air_date.is_some() {
                dated += 1;
            }
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(series = targets.len(), dated, "Extended series metadata resolved");
    }

    fn apply_extended(&mut self, series_id: &str, record: &ProgramRecord) {
        let Some(series) = self.graph.series_mut(series_id) else {
            return;
        };
        if series.description.is_none() {
            series.description = record.descriptions.long();
        }
        if series.short_description.is_none() {
            series.short_description = record.descriptions.short();
        }
        let Some(air_date) = record.original_air_date else {
            return;
        };
        series.start_air_date = Some(air_date);

        // persist the date with the cached description so later runs skip this lookup
        let cache_key = ids::series_cache_key(series_id);
        let Ok(text) = self.cache.get_asset(&cache_key) else {
            return;
        };
        let Ok(mut description) = serde_json::from_str::<GenericDescription>(&text) else {
            return;
        };
        let has_date = description
            .start_airdate
            .as_deref()
            .and_then(parse_air_date)
            .is_some();
        if has_date {
            return;
        }
        description.start_airdate = Some(air_date.format("%Y-%m-%d").to_string());
        match serde_json::to_string(&description) {
            Ok(updated) => self.cache.update_asset_json_entry(&cache_key, &updated),
            Err(e) => warn!(cache_key, error = %e, "Failed to update cached description"),
        }
    }
}
