//! TVMaze API response types for deserialization.
//!
//! These structures mirror the JSON response format from the TVMaze API.
use serde::Deserialize;

/// The top-level response from the TVMaze singlesearch endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShow {
    /// TVMaze show id
    pub id: u64,
    /// The name of the TV show
    pub name: String,
    /// Premiere date, `YYYY-MM-DD` (null for unaired shows)
    pub premiered: Option<String>,
    /// Embedded resources (like akas) when requested with ?embed=
    #[serde(rename = "_embedded")]
    pub embedded: Option<TvMazeEmbedded>,
}

/// Embedded resources in a TVMaze show response.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEmbedded {
    /// Alternative show names when embed=akas is used
    #[serde(default)]
    pub akas: Vec<TvMazeAka>,
}

/// An alternative name of a show.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeAka {
    pub name: String,
}

/// A single episode from the TVMaze API.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEpisode {
    pub id: u64,
    /// Episode title (may be null for episodes without a title)
    pub name: Option<String>,
}
