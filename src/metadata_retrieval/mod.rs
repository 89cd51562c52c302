//! Data structures and traits for media metadata retrieval.
//!
//! This module provides the records exchanged with external metadata
//! providers (hash lookups, title searches, episode directories) and the
//! traits that every provider implements. Concrete providers live in the
//! submodules; the resolvers only ever see the traits.
mod omdb;
mod omdb_types;
mod opensubtitles;
mod tvmaze;
mod tvmaze_types;
mod xmlrpc;

#[cfg(test)]
pub(crate) mod fakes;

pub(crate) use omdb::OmdbProvider;
pub(crate) use opensubtitles::OpenSubtitlesProvider;
pub(crate) use tvmaze::TvMazeProvider;
pub use xmlrpc::XmlRpcError;

use crate::filename_parser::MediaKind;
use reqwest::blocking::Response;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
///
/// Every variant means the provider could not be used for this request;
/// "nothing found" is never an error and is reported as an empty result.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),

    /// The provider refused our session
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider needs an API key and none is configured
    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
}

impl From<XmlRpcError> for MetadataRetrievalError {
    fn from(error: XmlRpcError) -> Self {
        MetadataRetrievalError::ParseError(error.to_string())
    }
}

/// Turns a non-success HTTP status into a request error.
fn ensure_success(response: Response) -> Result<Response, MetadataRetrievalError> {
    if response.status().is_success() {
        return Ok(response);
    }

    Err(MetadataRetrievalError::RequestError(format!(
        "HTTP {} {}",
        response.status().as_u16(),
        response.status().canonical_reason().unwrap_or("Unknown")
    )))
}

/// Type of a canonical title record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TitleType {
    Movie,
    TvSeries,
    TvEpisode,
    Other,
}

/// Canonical record for one movie or episode, as returned by a detail lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    /// IMDb identifier (`tt` followed by digits)
    pub id: String,
    /// Record type discriminator (`movie`, `tvEpisode`, ...)
    #[serde(rename = "type")]
    pub title_type: TitleType,
    /// Title of the movie or episode
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Title of the series an episode belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_seconds: Option<u64>,
    /// Identifier of the following episode; only an id, fetched on demand
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_episode: Option<String>,
}

impl ResolvedMedia {
    pub fn is_episode(&self) -> bool {
        self.title_type == TitleType::TvEpisode
    }

    /// The numeric part of the IMDb id, as expected by OpenSubtitles
    pub fn imdb_digits(&self) -> &str {
        self.id.trim_start_matches("tt")
    }

    /// Human readable title, `Show - S01E02 - Title` for episodes
    pub fn display_title(&self) -> String {
        match (&self.parent_title, self.season, self.episode) {
            (Some(parent), Some(season), Some(episode)) if self.is_episode() => {
                format!("{} - S{:02}E{:02} - {}", parent, season, episode, self.title)
            }
            _ => self.title.clone(),
        }
    }
}

/// An unverified match returned by a content-hash lookup
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HashCandidate {
    pub kind: MediaKind,
    /// For episodes this is `"Show Name" Episode Title`
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// IMDb identifier, normalized to `tt` + 7 digits
    pub imdb_id: String,
    pub year: Option<String>,
}

/// A single hit from a free-text title search
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TitleSearchResult {
    pub id: String,
    pub title: String,
    pub title_type: TitleType,
    /// First four characters of the provider's year field
    pub year: Option<String>,
}

/// One season of a series' episode listing
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SeasonListing {
    pub season: u32,
    pub episodes: Vec<EpisodeListingEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EpisodeListingEntry {
    pub episode: u32,
    /// Identifier usable with [`TitleSearchService::get_detail`]
    pub id: String,
    pub title: String,
}

/// A series as known to an episode directory
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DirectorySeries {
    pub id: u64,
    /// Canonical series name
    pub name: String,
    /// Alternative names, in provider order
    pub aliases: Vec<String>,
    /// First-aired date, `YYYY-MM-DD`
    pub first_aired: Option<String>,
}

impl DirectorySeries {
    /// Year the series first aired (first four characters of the date)
    pub fn first_aired_year(&self) -> Option<&str> {
        self.first_aired
            .as_deref()
            .and_then(|date| date.get(..4))
    }
}

/// An episode node in an episode directory
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DirectoryEpisode {
    pub id: u64,
    pub name: Option<String>,
}

/// Payload sent back to a hash lookup service to teach it a new hash
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HashSubmission {
    pub hash: String,
    pub size_bytes: u64,
    /// IMDb id digits, without the `tt` prefix
    pub imdb_id: String,
    pub duration_ms: u64,
    pub filename: String,
}

/// Response to a hash submission
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertHashResponse {
    /// Provider status line, `200 OK` on success
    pub status: String,
    /// Hashes the provider accepted
    pub accepted_hashes: Vec<String>,
}

/// Trait for services that map a content hash to known media.
pub(crate) trait HashLookupService {
    /// Returns every candidate the service knows for the given hash.
    ///
    /// An unknown hash yields an empty vector.
    fn check_hash(&self, hash: &str) -> Result<Vec<HashCandidate>, MetadataRetrievalError>;

    /// Submits a hash-to-title association.
    fn insert_hash(
        &self,
        submission: &HashSubmission,
    ) -> Result<InsertHashResponse, MetadataRetrievalError>;
}

/// Trait for services offering free-text title search and canonical records.
pub(crate) trait TitleSearchService {
    /// Searches titles by free text, in the provider's ranking order.
    fn search_title(&self, text: &str) -> Result<Vec<TitleSearchResult>, MetadataRetrievalError>;

    /// Fetches the canonical record for an identifier.
    ///
    /// Episode records carry their parent series and, when one exists, a
    /// reference to the following episode.
    fn get_detail(&self, id: &str) -> Result<Option<ResolvedMedia>, MetadataRetrievalError>;

    /// Fetches the full season/episode listing of a series.
    fn get_episode_listing(
        &self,
        series_id: &str,
    ) -> Result<Vec<SeasonListing>, MetadataRetrievalError>;
}

/// Trait for episode directories (show name → seasons and episodes).
pub(crate) trait EpisodeDirectoryService {
    /// Finds the best matching series for a show name.
    fn search_show(&self, name: &str) -> Result<Option<DirectorySeries>, MetadataRetrievalError>;

    /// Looks up one episode of a series by season and episode number.
    fn get_episode(
        &self,
        series: &DirectorySeries,
        season: u32,
        number: u32,
    ) -> Result<Option<DirectoryEpisode>, MetadataRetrievalError>;
}
