//! Wire models for the guide provider's JSON API.
//!
//! Only the fields the pipeline reads are modelled; everything is optional or
//! defaulted because the provider omits keys freely.

use crate::guide::images::ImageCandidate;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct LineupResponse {
    #[serde(default)]
    pub map: Vec<ChannelMapping>,
    #[serde(default)]
    pub stations: Vec<StationRecord>,
    #[serde(default)]
    pub metadata: Option<LineupMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMapping {
    #[serde(rename = "stationID")]
    pub station_id: String,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "stationID")]
    pub station_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub callsign: String,
    #[serde(default)]
    pub affiliate: Option<String>,
    #[serde(default)]
    pub logo: Option<StationLogo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationLogo {
    #[serde(rename = "URL")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineupMetadata {
    pub lineup: String,
    #[serde(default)]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    #[serde(rename = "stationID")]
    pub station_id: String,
    pub date: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationSchedule {
    #[serde(rename = "stationID")]
    pub station_id: String,
    #[serde(default)]
    pub programs: Vec<Airing>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airing {
    #[serde(rename = "programID")]
    pub program_id: String,
    pub air_date_time: DateTime<Utc>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub is_premiere_or_finale: Option<String>,
    #[serde(default)]
    pub premiere: bool,
}

/// A program record, cached verbatim (re-serialized) under its md5.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    #[serde(rename = "programID")]
    pub program_id: String,
    #[serde(default)]
    pub titles: Vec<ProgramTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title150: Option<String>,
    #[serde(default)]
    pub descriptions: ProgramDescriptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_air_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<ProgramMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_rating: Vec<RatingRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_advisory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<MovieInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

impl ProgramRecord {
    pub fn title(&self) -> &str {
        self.titles
            .first()
            .map(|t| t.title120.as_str())
            .unwrap_or_default()
    }

    /// Season and episode numbers from the first metadata source that has them.
    pub fn season_episode(&self) -> (Option<u16>, Option<u16>) {
        self.metadata
            .iter()
            .filter_map(|m| m.gracenote.as_ref())
            .map(|g| (g.season, g.episode))
            .find(|(s, e)| s.is_some() || e.is_some())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramTitle {
    #[serde(default)]
    pub title120: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDescriptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description100: Vec<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description1000: Vec<LocalizedText>,
}

impl ProgramDescriptions {
    fn pick(entries: &[LocalizedText]) -> Option<String> {
        entries
            .iter()
            .find(|d| d.description_language.starts_with("en"))
            .or_else(|| entries.first())
            .map(|d| d.description.clone())
    }

    pub fn short(&self) -> Option<String> {
        Self::pick(&self.description100)
    }

    pub fn long(&self) -> Option<String> {
        Self::pick(&self.description1000)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    #[serde(default)]
    pub description_language: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramMetadata {
    #[serde(rename = "Gracenote", default, skip_serializing_if = "Option::is_none")]
    pub gracenote: Option<EpisodeNumbering>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeNumbering {
    #[serde(default)]
    pub season: Option<u16>,
    #[serde(default)]
    pub episode: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    pub body: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieInfo {
    #[serde(default)]
    pub year: Option<String>,
}

/// Generic series description, cached under the series key.
///
/// `code` is required so that other records stored under the same key never
/// parse as an empty description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericDescription {
    pub code: i32,
    #[serde(default)]
    pub description100: Option<String>,
    #[serde(default)]
    pub description1000: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_airdate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtworkResponse {
    #[serde(rename = "programID")]
    pub program_id: String,
    #[serde(default)]
    pub data: Option<ArtworkData>,
}

/// The provider answers an image list, or an error object when it has none.
#[derive(Debug, Clone)]
pub enum ArtworkData {
    Images(Vec<ImageCandidate>),
    Error(ArtworkError),
    /// Neither shape; carries the parse error.
    Unreadable(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkError {
    pub error_code: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl<'de> Deserialize<'de> for ArtworkData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let parsed = if value.get("errorCode").is_some() {
            serde_json::from_value(value).map(ArtworkData::Error)
        } else {
            serde_json::from_value(value).map(ArtworkData::Images)
        };
        Ok(parsed.unwrap_or_else(|e| ArtworkData::Unreadable(e.to_string())))
    }
}

impl ArtworkResponse {
    pub fn images(&self) -> Option<&[ImageCandidate]> {
        match &self.data {
            Some(ArtworkData::Images(images)) => Some(images),
            _ => None,
        }
    }

    /// Parse error of a payload that is neither an image list nor an error object.
    pub fn unreadable(&self) -> Option<&str> {
        match &self.data {
            Some(ArtworkData::Unreadable(error)) => Some(error),
            _ => None,
        }
    }
}
