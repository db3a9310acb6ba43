//! Provider identifier conventions.
//!
//! Program ids are 14 characters: a 2-letter type prefix, an 8-digit series
//! body and a 4-digit episode suffix (e.g. `EP012345670012`). Series-level
//! lookups use the body with a zeroed suffix under a different prefix.

/// Type prefix of a provider program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Episode,
    Show,
    Movie,
    Sports,
}

impl IdPrefix {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.get(..2)? {
            "EP" => Some(Self::Episode),
            "SH" => Some(Self::Show),
            "MV" => Some(Self::Movie),
            "SP" => Some(Self::Sports),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episode => "EP",
            Self::Show => "SH",
            Self::Movie => "MV",
            Self::Sports => "SP",
        }
    }
}

/// Prefix used for every logical sports-series key.
pub const SPORTS_KEY_PREFIX: &str = "SP:";

/// The 8-digit series body of a program id, if the id is long enough.
pub fn series_body(program_id: &str) -> Option<&str> {
    program_id.get(2..10)
}

/// The 10-character `XX########` head of a program id.
pub fn id_head(program_id: &str) -> Option<&str> {
    program_id.get(..10)
}

/// Cache key under which series descriptions and images are stored.
pub fn series_cache_key(body: &str) -> String {
    format!("SH{body}0000")
}

/// Cache key of a program record: its schedule md5, or a namespaced id when the
/// schedule carries none so it cannot collide with a series record.
pub fn program_cache_key(program_id: &str, md5: Option<&str>) -> String {
    match md5.filter(|m| !m.is_empty()) {
        Some(md5) => md5.to_string(),
        None => format!("program:{program_id}"),
    }
}

/// Id used to request the generic description of a series.
pub fn description_request_id(body: &str) -> String {
    format!("EP{body}0000")
}

/// Maps a description request/response id (`EP…`) back to its series cache key (`SH…`).
pub fn description_to_series_key(request_id: &str) -> Option<String> {
    let rest = request_id.strip_prefix("EP")?;
    Some(format!("SH{rest}"))
}

/// Builds the logical key for a sports series from the event title.
pub fn sports_series_key(title: &str) -> String {
    format!("{SPORTS_KEY_PREFIX}{}", title.trim().to_lowercase())
}

pub fn is_sports_key(series_id: &str) -> bool {
    series_id.starts_with(SPORTS_KEY_PREFIX)
}

/// Numeric value of a series key, used by the refresh cycle. `None` for sports keys.
pub fn numeric_series_id(series_id: &str) -> Option<u64> {
    series_id.parse().ok()
}

pub fn program_uid(program_id: &str) -> String {
    match (program_id.get(..10), program_id.get(10..)) {
        (Some(head), Some(tail)) => format!("!Program!{head}_{tail}"),
        _ => format!("!Program!{program_id}"),
    }
}

pub fn series_uid(series_id: &str) -> String {
    format!("!Series!{series_id}")
}

pub fn image_uid(uri: &str) -> String {
    format!("!Image!{uri}")
}

pub fn station_uid(station_id: &str) -> String {
    format!("!Service!{station_id}")
}

pub fn lineup_uid(lineup_id: &str) -> String {
    format!("!Lineup!{lineup_id}")
}
