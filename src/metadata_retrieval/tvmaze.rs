//! TVMaze episode directory implementation.
use super::tvmaze_types::{TvMazeEpisode, TvMazeShow};
use super::{
    DirectoryEpisode, DirectorySeries, EpisodeDirectoryService, MetadataRetrievalError,
    ensure_success,
};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Episode directory backed by the TVMaze API.
///
/// This provider looks up shows on https://api.tvmaze.com using the
/// singlesearch endpoint with embedded akas, and single episodes through
/// the episodebynumber endpoint.
pub(crate) struct TvMazeProvider {
    client: Client,
    base_url: String,
}

impl TvMazeProvider {
    /// Creates a new TVMaze provider instance.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client to use (carries the per-call timeout)
    /// * `base_url` - API root, e.g. `https://api.tvmaze.com`
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Sends a GET request and decodes the JSON body.
    ///
    /// A 404 answer is TVMaze's way of saying "no such show/episode" and
    /// maps to `Ok(None)`.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, MetadataRetrievalError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "Querying TVMaze");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = ensure_success(response)?;

        response
            .json()
            .map(Some)
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }

    /// Converts TVMaze show data to our internal DirectorySeries structure.
    fn convert_show(show: TvMazeShow) -> DirectorySeries {
        let aliases = show
            .embedded
            .map(|embedded| embedded.akas.into_iter().map(|aka| aka.name).collect())
            .unwrap_or_default();

        DirectorySeries {
            id: show.id,
            name: show.name,
            aliases,
            first_aired: show.premiered,
        }
    }

    fn convert_episode(episode: TvMazeEpisode) -> DirectoryEpisode {
        DirectoryEpisode {
            id: episode.id,
            name: episode.name,
        }
    }
}

impl EpisodeDirectoryService for TvMazeProvider {
    fn search_show(&self, name: &str) -> Result<Option<DirectorySeries>, MetadataRetrievalError> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let show: Option<TvMazeShow> = self.get_json(
            "singlesearch/shows",
            &[("q", name.to_string()), ("embed", "akas".to_string())],
        )?;

        Ok(show.map(Self::convert_show))
    }

    fn get_episode(
        &self,
        series: &DirectorySeries,
        season: u32,
        number: u32,
    ) -> Result<Option<DirectoryEpisode>, MetadataRetrievalError> {
        let episode: Option<TvMazeEpisode> = self.get_json(
            &format!("shows/{}/episodebynumber", series.id),
            &[("season", season.to_string()), ("number", number.to_string())],
        )?;

        Ok(episode.map(Self::convert_episode))
    }
}
