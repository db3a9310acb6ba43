use super::AssemblyPipeline;
use crate::guide::{ProgramFlags, ScheduleEntry};
use crate::provider::models::{Airing, LineupResponse, ScheduleRequest, StationSchedule};
use crate::scraper::batch::MAX_QUERIES;
use crate::scraper::progress::Stage;
use chrono::Days;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl AssemblyPipeline {
    /// Builds lineups and stations, then records each station's schedule and
    /// queues the programs it airs.
    pub async fn stations(&mut self) {
        let lineups = self.settings.lineups.clone();
        self.progress.begin(Stage::Stations, lineups.len());
        for lineup_id in &lineups {
            match self.api.lineup(lineup_id).await {
                Some(response) => {
                    self.apply_lineup(lineup_id, response);
                    self.progress.advance(1);
                }
                None => warn!(lineup = lineup_id, "Lineup unavailable, skipping"),
            }
        }
        self.progress.finish();
        info!(
            lineups = self.graph.lineups().count(),
            stations = self.graph.station_count(),
            "Lineups loaded"
        );

        self.schedules().await;
    }

    fn apply_lineup(&mut self, lineup_id: &str, response: LineupResponse) {
        for record in response.stations {
            let logo = record
                .logo
                .as_ref()
                .map(|logo| self.graph.guide_image_id(&logo.url));
            let station = self.graph.station_or_insert(&record.station_id);
            if station.call_sign.is_empty() {
                station.call_sign = record.callsign;
                station.name = record.name;
                station.affiliate = record.affiliate;
            }
            station.logo_image = station.logo_image.or(logo);
        }

        let channels: Vec<(String, String)> = response
            .map
            .into_iter()
            .map(|mapping| {
                self.graph.station_or_insert(&mapping.station_id);
                (mapping.station_id, mapping.channel.unwrap_or_default())
            })
            .collect();

        let name = response
            .metadata
            .map(|m| m.lineup)
            .unwrap_or_else(|| lineup_id.to_string());
        debug!(lineup = lineup_id, channels = channels.len(), "Lineup mapped");
        self.graph.upsert_lineup(lineup_id, &name, channels);
    }

    fn schedule_dates(&self) -> Vec<String> {
        (0..u64::from(self.settings.schedule_days))
            .filter_map(|offset| self.today.checked_add_days(Days::new(offset)))
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect()
    }

    async fn schedules(&mut self) {
        let station_ids = self.graph.station_ids();
        self.progress.begin(Stage::Stations, station_ids.len());
        if station_ids.is_empty() {
            self.progress.finish();
            return;
        }

        let api = self.api.clone();
        let dates = Arc::new(self.schedule_dates());
        let fetched = self
            .fetcher
            .fetch_all(&station_ids, MAX_QUERIES, move |batch: Vec<String>| {
                let api = api.clone();
                let dates = Arc::clone(&dates);
                async move {
                    let requests: Vec<ScheduleRequest> = batch
                        .into_iter()
                        .map(|station_id| ScheduleRequest {
                            station_id,
                            date: dates.to_vec(),
                        })
                        .collect();
                    api.schedules(&requests).await
                }
            })
            .await;

        let mut by_station: HashMap<String, StationSchedule> = HashMap::with_capacity(fetched.len());
        for schedule in fetched {
            match by_station.entry(schedule.station_id.clone()) {
                Entry::Occupied(mut existing) => existing.get_mut().programs.extend(schedule.programs),
                Entry::Vacant(slot) => {
                    slot.insert(schedule);
                }
            }
        }

        for station_id in &station_ids {
            let Some(schedule) = by_station.remove(station_id) else {
                warn!(station = station_id, "No schedule returned for station");
                continue;
            };
            let mut airings = schedule.programs;
            airings.sort_by_key(|airing| airing.air_date_time);

            for airing in &airings {
                self.pending_programs
                    .entry(airing.program_id.clone())
                    .or_insert_with(|| airing.md5.clone());
            }
            if let Some(station) = self.graph.station_mut(station_id) {
                station.schedule = airings.iter().map(schedule_entry).collect();
            }
            self.progress.advance(1);
        }

        self.progress.finish();
        info!(
            stations = station_ids.len(),
            programs = self.pending_programs.len(),
            "Schedules loaded"
        );
    }
}

fn schedule_entry(airing: &Airing) -> ScheduleEntry {
    let mut flags = ProgramFlags::empty();
    if airing.premiere {
        flags |= ProgramFlags::PREMIERE;
    }
    if let Some(marker) = &airing.is_premiere_or_finale {
        flags |= ProgramFlags::from_premiere_marker(marker);
    }
    ScheduleEntry {
        program_id: airing.program_id.clone(),
        start: airing.air_date_time,
        duration_secs: airing.duration,
        is_new: airing.new,
        flags,
    }
}
