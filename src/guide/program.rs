//! Program nodes and their classification flags.

use bitflags::bitflags;
use chrono::NaiveDate;
use serde::Serialize;

bitflags! {
    /// Classification flags carried by a single program.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    #[serde(transparent)]
    pub struct ProgramFlags: u64 {
        const MOVIE = 1 << 0;
        const SERIES = 1 << 1;
        const EPISODIC = 1 << 2;
        const GENERIC = 1 << 3;
        const PREMIERE = 1 << 4;
        const SEASON_PREMIERE = 1 << 5;
        const SEASON_FINALE = 1 << 6;
        const SERIES_PREMIERE = 1 << 7;
        const SERIES_FINALE = 1 << 8;
        const MINISERIES = 1 << 9;
        const LIMITED_SERIES = 1 << 10;
        const PAID_PROGRAMMING = 1 << 11;
        const SERIAL = 1 << 12;
        const SHORT_FILM = 1 << 13;
        const SPECIAL = 1 << 14;
        const SPORTS = 1 << 15;
        const NEWS = 1 << 16;
        const KIDS = 1 << 17;
        const REALITY = 1 << 18;
        const ADULT_ONLY = 1 << 19;
        const ACTION = 1 << 20;
        const COMEDY = 1 << 21;
        const DOCUMENTARY = 1 << 22;
        const DRAMA = 1 << 23;
        const EDUCATIONAL = 1 << 24;
        const HORROR = 1 << 25;
        const INDY = 1 << 26;
        const MUSIC = 1 << 27;
        const ROMANCE = 1 << 28;
        const SCIENCE_FICTION = 1 << 29;
        const SOAP = 1 << 30;
        const THRILLER = 1 << 31;
    }
}

bitflags! {
    /// Content advisories explaining a rating.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    #[serde(transparent)]
    pub struct Advisories: u16 {
        const ADULT = 1 << 0;
        const BRIEF_NUDITY = 1 << 1;
        const GRAPHIC_LANGUAGE = 1 << 2;
        const GRAPHIC_VIOLENCE = 1 << 3;
        const LANGUAGE = 1 << 4;
        const MILD_VIOLENCE = 1 << 5;
        const NUDITY = 1 << 6;
        const RAPE = 1 << 7;
        const STRONG_SEXUAL_CONTENT = 1 << 8;
        const VIOLENCE = 1 << 9;
    }
}

impl ProgramFlags {
    /// Flag implied by a provider `showType` value.
    pub fn from_show_type(show_type: &str) -> Self {
        match show_type.to_lowercase().as_str() {
            "feature film" | "tv movie" => Self::MOVIE,
            "short film" => Self::MOVIE | Self::SHORT_FILM,
            "series" => Self::SERIES,
            "miniseries" => Self::SERIES | Self::MINISERIES,
            "limited series" => Self::SERIES | Self::LIMITED_SERIES,
            "serial" => Self::SERIES | Self::SERIAL,
            "paid programming" => Self::PAID_PROGRAMMING,
            "special" => Self::SPECIAL,
            "sports event" | "sports non-event" => Self::SPORTS,
            _ => Self::empty(),
        }
    }

    /// Flag implied by a single genre label.
    pub fn from_genre(genre: &str) -> Self {
        match genre.to_lowercase().as_str() {
            "action" | "adventure" => Self::ACTION,
            "comedy" | "sitcom" => Self::COMEDY,
            "documentary" => Self::DOCUMENTARY,
            "drama" => Self::DRAMA,
            "educational" => Self::EDUCATIONAL,
            "horror" => Self::HORROR,
            "independent" => Self::INDY,
            "music" => Self::MUSIC,
            "romance" => Self::ROMANCE,
            "science fiction" => Self::SCIENCE_FICTION,
            "soap" => Self::SOAP,
            "thriller" | "suspense" => Self::THRILLER,
            "news" => Self::NEWS,
            "children" => Self::KIDS,
            "reality" => Self::REALITY,
            "adults only" => Self::ADULT_ONLY,
            _ => Self::empty(),
        }
    }

    /// Flag implied by a schedule `isPremiereOrFinale` marker.
    pub fn from_premiere_marker(marker: &str) -> Self {
        match marker {
            "Season Premiere" => Self::SEASON_PREMIERE,
            "Season Finale" => Self::SEASON_FINALE,
            "Series Premiere" => Self::SERIES_PREMIERE,
            "Series Finale" => Self::SERIES_FINALE,
            _ => Self::empty(),
        }
    }
}

impl Advisories {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Adult Situations" => Self::ADULT,
            "Brief Nudity" => Self::BRIEF_NUDITY,
            "Graphic Language" => Self::GRAPHIC_LANGUAGE,
            "Graphic Violence" => Self::GRAPHIC_VIOLENCE,
            "Language" | "Adult Language" | "Mild Language" => Self::LANGUAGE,
            "Mild Violence" => Self::MILD_VIOLENCE,
            "Nudity" => Self::NUDITY,
            "Rape" => Self::RAPE,
            "Strong Sexual Content" => Self::STRONG_SEXUAL_CONTENT,
            "Violence" => Self::VIOLENCE,
            _ => Self::empty(),
        }
    }
}

/// A rating issued by a ratings body (e.g. `USA Parental Rating` / `TVPG`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRating {
    pub body: String,
    pub code: String,
}

/// One airing instance (episode, movie, or event).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: u32,
    pub uid: String,
    pub program_id: String,
    pub title: String,
    pub episode_title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub season_number: Option<u16>,
    pub episode_number: Option<u16>,
    pub year: Option<u16>,
    pub original_air_date: Option<NaiveDate>,
    pub content_ratings: Vec<ContentRating>,
    pub advisories: Advisories,
    pub flags: ProgramFlags,
    /// Series key, looked up in [`crate::guide::GuideGraph::series`].
    pub series: Option<String>,
    pub guide_image: Option<u32>,
}

impl Program {
    pub fn is_movie(&self) -> bool {
        self.flags.contains(ProgramFlags::MOVIE)
    }
}
