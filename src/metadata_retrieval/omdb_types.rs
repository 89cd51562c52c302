//! OMDb API response types for deserialization.
//!
//! OMDb encodes every scalar as a string and uses `"N/A"` for missing values.
//! Failed lookups come back with HTTP 200, `"Response": "False"` and an
//! `"Error"` message.
use serde::Deserialize;

/// Fields shared by every OMDb response.
#[derive(Debug, Deserialize)]
pub(super) struct OmdbStatus {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl OmdbStatus {
    pub fn is_success(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }
}

/// Response of a `?s=` search.
#[derive(Debug, Deserialize)]
pub(super) struct OmdbSearchResponse {
    #[serde(rename = "Search", default)]
    pub search: Vec<OmdbSearchItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OmdbSearchItem {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// Response of an `?i=` detail lookup (movie, series or episode).
#[derive(Debug, Deserialize)]
pub(super) struct OmdbTitle {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Runtime")]
    pub runtime: Option<String>,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Season")]
    pub season: Option<String>,
    #[serde(rename = "Episode")]
    pub episode: Option<String>,
    #[serde(rename = "seriesID")]
    pub series_id: Option<String>,
    #[serde(rename = "totalSeasons")]
    pub total_seasons: Option<String>,
}

/// Response of an `?i=<series>&Season=N` listing.
#[derive(Debug, Deserialize)]
pub(super) struct OmdbSeason {
    #[serde(rename = "Season")]
    pub season: String,
    #[serde(rename = "Episodes", default)]
    pub episodes: Vec<OmdbSeasonEpisode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OmdbSeasonEpisode {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Episode")]
    pub episode: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
}
