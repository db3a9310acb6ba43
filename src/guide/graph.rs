//! The in-memory program-guide graph handed to the serializer.
//!
//! Every collection is an [`IndexMap`] keyed by provider identifier, so
//! insertion order is first-reference order and each node's numeric `id` is
//! its 1-based position.

use crate::guide::ids;
use crate::guide::images::ImageCandidate;
use crate::guide::program::{Program, ProgramFlags};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub id: u32,
    pub uid: String,
    pub lineup_id: String,
    pub name: String,
    /// `(station key, channel number)` in provider map order.
    pub channels: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub program_id: String,
    pub start: DateTime<Utc>,
    pub duration_secs: u32,
    /// First airing of this program.
    pub is_new: bool,
    pub flags: ProgramFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: u32,
    pub uid: String,
    pub station_id: String,
    pub call_sign: String,
    pub name: String,
    pub affiliate: Option<String>,
    pub logo_image: Option<u32>,
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesInfo {
    pub id: u32,
    pub uid: String,
    /// Numeric 8-digit body, or a sports key (see [`ids::sports_series_key`]).
    pub series_id: String,
    pub title: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub start_air_date: Option<NaiveDate>,
    pub guide_image: Option<u32>,
    pub images: Vec<ImageCandidate>,
}

impl SeriesInfo {
    pub fn is_sports(&self) -> bool {
        ids::is_sports_key(&self.series_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideImage {
    pub id: u32,
    pub uid: String,
    pub uri: String,
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len + 1).unwrap_or(u32::MAX)
}

/// Root container for one run's guide data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideGraph {
    lineups: IndexMap<String, Lineup>,
    stations: IndexMap<String, Station>,
    programs: IndexMap<String, Program>,
    series: IndexMap<String, SeriesInfo>,
    images: IndexMap<String, GuideImage>,
}

impl GuideGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lineups(&self) -> impl Iterator<Item = &Lineup> {
        self.lineups.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn series(&self) -> impl Iterator<Item = &SeriesInfo> {
        self.series.values()
    }

    pub fn images(&self) -> impl Iterator<Item = &GuideImage> {
        self.images.values()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Inserts a lineup, replacing the channel map if it already exists.
    pub fn upsert_lineup(&mut self, lineup_id: &str, name: &str, channels: Vec<(String, String)>) -> u32 {
        let id = next_id(self.lineups.len());
        let lineup = self
            .lineups
            .entry(lineup_id.to_string())
            .or_insert_with(|| Lineup {
                id,
                uid: ids::lineup_uid(lineup_id),
                lineup_id: lineup_id.to_string(),
                name: name.to_string(),
                channels: Vec::new(),
            });
        lineup.channels = channels;
        lineup.id
    }

    /// Returns the station for `station_id`, creating it on first reference.
    pub fn station_or_insert(&mut self, station_id: &str) -> &mut Station {
        let id = next_id(self.stations.len());
        self.stations
            .entry(station_id.to_string())
            .or_insert_with(|| Station {
                id,
                uid: ids::station_uid(station_id),
                station_id: station_id.to_string(),
                call_sign: String::new(),
                name: String::new(),
                affiliate: None,
                logo_image: None,
                schedule: Vec::new(),
            })
    }

    pub fn station_mut(&mut self, station_id: &str) -> Option<&mut Station> {
        self.stations.get_mut(station_id)
    }

    pub fn station_ids(&self) -> Vec<String> {
        self.stations.keys().cloned().collect()
    }

    /// Returns the series for `series_id`, creating it on first reference.
    ///
    /// The returned flag is `true` when the node was created by this call.
    pub fn series_or_insert(&mut self, series_id: &str, title: &str) -> (&mut SeriesInfo, bool) {
        let id = next_id(self.series.len());
        let mut created = false;
        let series = self
            .series
            .entry(series_id.to_string())
            .or_insert_with(|| {
                created = true;
                SeriesInfo {
                    id,
                    uid: ids::series_uid(series_id),
                    series_id: series_id.to_string(),
                    title: title.to_string(),
                    short_description: None,
                    description: None,
                    start_air_date: None,
                    guide_image: None,
                    images: Vec::new(),
                }
            });
        (series, created)
    }

    pub fn series_by_id(&self, series_id: &str) -> Option<&SeriesInfo> {
        self.series.get(series_id)
    }

    pub fn series_mut(&mut self, series_id: &str) -> Option<&mut SeriesInfo> {
        self.series.get_mut(series_id)
    }

    /// Series keys in insertion order.
    pub fn series_ids(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Inserts a program if its id is unseen; returns the node's numeric id either way.
    pub fn insert_program(&mut self, mut program: Program) -> u32 {
        if let Some(existing) = self.programs.get(&program.program_id) {
            return existing.id;
        }
        program.id = next_id(self.programs.len());
        program.uid = ids::program_uid(&program.program_id);
        let id = program.id;
        self.programs.insert(program.program_id.clone(), program);
        id
    }

    pub fn program(&self, program_id: &str) -> Option<&Program> {
        self.programs.get(program_id)
    }

    pub fn program_mut(&mut self, program_id: &str) -> Option<&mut Program> {
        self.programs.get_mut(program_id)
    }

    pub fn program_ids(&self) -> Vec<String> {
        self.programs.keys().cloned().collect()
    }

    /// Returns the id of the image for `uri`, registering it on first reference.
    pub fn guide_image_id(&mut self, uri: &str) -> u32 {
        let id = next_id(self.images.len());
        self.images
            .entry(uri.to_string())
            .or_insert_with(|| GuideImage {
                id,
                uid: ids::image_uid(uri),
                uri: uri.to_string(),
            })
            .id
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}
