//! OMDb title search and canonical record implementation.
use super::omdb_types::{OmdbSearchItem, OmdbSearchResponse, OmdbSeason, OmdbStatus, OmdbTitle};
use super::{
    EpisodeListingEntry, MetadataRetrievalError, ResolvedMedia, SeasonListing, TitleSearchResult,
    TitleSearchService, TitleType, ensure_success,
};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Title search service backed by the OMDb API.
///
/// Search results and detail records carry IMDb identifiers, which is what
/// OpenSubtitles expects when learning a new hash.
pub(crate) struct OmdbProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OmdbProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    fn api_key(&self) -> Result<&str, MetadataRetrievalError> {
        self.api_key
            .as_deref()
            .ok_or(MetadataRetrievalError::MissingApiKey("OMDb"))
    }

    /// Runs one OMDb query.
    ///
    /// OMDb reports misses in the body rather than the status code; those
    /// come back as `Ok(None)`.
    fn fetch<T: DeserializeOwned>(
        &self,
        params: &[(&str, String)],
    ) -> Result<Option<T>, MetadataRetrievalError> {
        let api_key = self.api_key()?;
        debug!(params = ?params, "Querying OMDb");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", api_key)])
            .query(params)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(MetadataRetrievalError::AuthenticationFailed(
                "OMDb rejected the API key".to_string(),
            ));
        }

        let body = ensure_success(response)?
            .text()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        parse_body(&body)
    }

    fn fetch_title(&self, id: &str) -> Result<Option<OmdbTitle>, MetadataRetrievalError> {
        self.fetch(&[("i", id.to_string())])
    }

    fn fetch_season(
        &self,
        series_id: &str,
        season: u32,
    ) -> Result<Option<SeasonListing>, MetadataRetrievalError> {
        let season: Option<OmdbSeason> =
            self.fetch(&[("i", series_id.to_string()), ("Season", season.to_string())])?;
        Ok(season.and_then(convert_season))
    }

    /// Finds the episode following `season`/`episode` of a series.
    fn next_episode(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
        total_seasons: Option<u32>,
    ) -> Result<Option<String>, MetadataRetrievalError> {
        if let Some(listing) = self.fetch_season(series_id, season)? {
            if let Some(next) = next_in_season(&listing, episode) {
                return Ok(Some(next.id.clone()));
            }
        }

        if total_seasons.is_some_and(|total| season >= total) {
            return Ok(None);
        }

        Ok(self
            .fetch_season(series_id, season + 1)?
            .as_ref()
            .and_then(first_in_season)
            .map(|entry| entry.id.clone()))
    }
}

impl OmdbProvider {
    /// Adds the parent series and the next-episode reference to an episode.
    ///
    /// Both are optional; a failed lookup leaves them unset.
    fn complete_episode(&self, media: &mut ResolvedMedia, series_id: &str) {
        media.parent_id = Some(series_id.to_string());

        let total_seasons = match self.fetch_title(series_id) {
            Ok(series) => {
                let total_seasons = series
                    .as_ref()
                    .and_then(|series| parse_number(series.total_seasons.as_deref()));
                media.parent_title = series.map(|series| series.title);
                total_seasons
            }
            Err(e) => {
                warn!(series_id, error = %e, "Failed to fetch parent series");
                None
            }
        };

        if let (Some(season), Some(episode)) = (media.season, media.episode) {
            match self.next_episode(series_id, season, episode, total_seasons) {
                Ok(next) => media.next_episode = next,
                Err(e) => {
                    warn!(id = %media.id, error = %e, "Failed to find the next episode");
                }
            }
        }
    }
}

impl TitleSearchService for OmdbProvider {
    fn search_title(&self, text: &str) -> Result<Vec<TitleSearchResult>, MetadataRetrievalError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response: Option<OmdbSearchResponse> = self.fetch(&[("s", text.to_string())])?;

        Ok(response
            .map(|response| response.search.into_iter().map(convert_search_item).collect())
            .unwrap_or_default())
    }

    fn get_detail(&self, id: &str) -> Result<Option<ResolvedMedia>, MetadataRetrievalError> {
        let Some(title) = self.fetch_title(id)? else {
            return Ok(None);
        };

        let series_id = title.series_id.clone();
        let mut media = convert_title(title);

        if media.is_episode() {
            if let Some(series_id) = series_id.as_deref().and_then(available) {
                self.complete_episode(&mut media, series_id);
            }
        }

        Ok(Some(media))
    }

    fn get_episode_listing(
        &self,
        series_id: &str,
    ) -> Result<Vec<SeasonListing>, MetadataRetrievalError> {
        let Some(series) = self.fetch_title(series_id)? else {
            return Ok(Vec::new());
        };

        let total_seasons = parse_number(series.total_seasons.as_deref()).unwrap_or(0);
        let mut listings = Vec::new();
        for season in 1..=total_seasons {
            if let Some(listing) = self.fetch_season(series_id, season)? {
                listings.push(listing);
            }
        }

        Ok(listings)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<Option<T>, MetadataRetrievalError> {
    let status: OmdbStatus =
        serde_json::from_str(body).map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

    if !status.is_success() {
        let message = status.error.unwrap_or_default();
        return if is_miss(&message) {
            debug!(message = %message, "OMDb returned no result");
            Ok(None)
        } else if message.to_lowercase().contains("api key") {
            Err(MetadataRetrievalError::AuthenticationFailed(message))
        } else {
            Err(MetadataRetrievalError::RequestError(message))
        };
    }

    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
}

/// OMDb error messages that just mean "nothing matched".
fn is_miss(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found")
        || message.contains("too many results")
        || message.contains("incorrect imdb id")
        || message.contains("error getting data")
}

/// `None` for OMDb's `N/A` placeholder and empty strings.
fn available(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(value)
    }
}

fn parse_number(value: Option<&str>) -> Option<u32> {
    value.and_then(available)?.parse().ok()
}

fn parse_year(value: Option<&str>) -> Option<String> {
    value
        .and_then(available)
        .and_then(|year| year.get(..4))
        .map(str::to_string)
}

/// `"57 min"` → 3420 seconds.
fn parse_runtime(value: Option<&str>) -> Option<u64> {
    let minutes: u64 = value
        .and_then(available)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(minutes * 60)
}

fn title_type(kind: &str) -> TitleType {
    match kind {
        "movie" => TitleType::Movie,
        "series" => TitleType::TvSeries,
        "episode" => TitleType::TvEpisode,
        _ => TitleType::Other,
    }
}

fn convert_search_item(item: OmdbSearchItem) -> TitleSearchResult {
    TitleSearchResult {
        id: item.imdb_id,
        title: item.title,
        title_type: title_type(&item.kind),
        year: parse_year(item.year.as_deref()),
    }
}

/// Converts a detail response; parent and next episode are filled in later.
fn convert_title(title: OmdbTitle) -> ResolvedMedia {
    let title_type = title_type(&title.kind);
    let (season, episode) = if title_type == TitleType::TvEpisode {
        (
            parse_number(title.season.as_deref()),
            parse_number(title.episode.as_deref()),
        )
    } else {
        (None, None)
    };

    ResolvedMedia {
        id: title.imdb_id,
        title_type,
        title: title.title,
        year: parse_year(title.year.as_deref()),
        season,
        episode,
        parent_title: None,
        parent_id: None,
        runtime_seconds: parse_runtime(title.runtime.as_deref()),
        next_episode: None,
    }
}

fn convert_season(season: OmdbSeason) -> Option<SeasonListing> {
    let number = parse_number(Some(season.season.as_str()))?;
    let episodes = season
        .episodes
        .into_iter()
        .filter_map(|episode| {
            Some(EpisodeListingEntry {
                episode: parse_number(Some(episode.episode.as_str()))?,
                id: episode.imdb_id,
                title: episode.title,
            })
        })
        .collect();

    Some(SeasonListing {
        season: number,
        episodes,
    })
}

/// Smallest episode number greater than `episode`.
fn next_in_season(listing: &SeasonListing, episode: u32) -> Option<&EpisodeListingEntry> {
    listing
        .episodes
        .iter()
        .filter(|entry| entry.episode > episode)
        .min_by_key(|entry| entry.episode)
}

fn first_in_season(listing: &SeasonListing) -> Option<&EpisodeListingEntry> {
    listing.episodes.iter().min_by_key(|entry| entry.episode)
}
