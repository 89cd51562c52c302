//! In-memory providers for resolver and pipeline tests.

use super::{
    DirectoryEpisode, DirectorySeries, EpisodeDirectoryService, EpisodeListingEntry,
    HashCandidate, HashLookupService, HashSubmission, InsertHashResponse, MetadataRetrievalError,
    ResolvedMedia, SeasonListing, TitleSearchResult, TitleSearchService, TitleType,
};
use crate::filename_parser::MediaKind;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) fn movie(
    id: &str,
    title: &str,
    year: &str,
    runtime_seconds: Option<u64>,
) -> ResolvedMedia {
    ResolvedMedia {
        id: id.to_string(),
        title_type: TitleType::Movie,
        title: title.to_string(),
        year: Some(year.to_string()),
        season: None,
        episode: None,
        parent_title: None,
        parent_id: None,
        runtime_seconds,
        next_episode: None,
    }
}

pub(crate) fn episode(
    id: &str,
    show: &str,
    season: u32,
    number: u32,
    title: &str,
    next_episode: Option<&str>,
) -> ResolvedMedia {
    ResolvedMedia {
        id: id.to_string(),
        title_type: TitleType::TvEpisode,
        title: title.to_string(),
        year: Some("2008".to_string()),
        season: Some(season),
        episode: Some(number),
        parent_title: Some(show.to_string()),
        parent_id: Some("tt0903747".to_string()),
        runtime_seconds: Some(2880),
        next_episode: next_episode.map(str::to_string),
    }
}

pub(crate) fn search_hit(
    id: &str,
    title: &str,
    title_type: TitleType,
    year: &str,
) -> TitleSearchResult {
    TitleSearchResult {
        id: id.to_string(),
        title: title.to_string(),
        title_type,
        year: Some(year.to_string()),
    }
}

pub(crate) fn movie_candidate(title: &str, imdb_id: &str) -> HashCandidate {
    HashCandidate {
        kind: MediaKind::Movie,
        title: title.to_string(),
        season: None,
        episode: None,
        imdb_id: imdb_id.to_string(),
        year: None,
    }
}

pub(crate) fn episode_candidate(
    title: &str,
    season: u32,
    number: u32,
    imdb_id: &str,
) -> HashCandidate {
    HashCandidate {
        kind: MediaKind::Episode,
        title: title.to_string(),
        season: Some(season),
        episode: Some(number),
        imdb_id: imdb_id.to_string(),
        year: None,
    }
}

/// Hash lookup answering from a fixed table and recording submissions.
#[derive(Default)]
pub(crate) struct FakeHashLookup {
    candidates: HashMap<String, Vec<HashCandidate>>,
    failing: bool,
    rejecting: bool,
    submissions: Rc<RefCell<Vec<HashSubmission>>>,
}

impl FakeHashLookup {
    pub fn with(mut self, hash: &str, candidates: Vec<HashCandidate>) -> Self {
        self.candidates.insert(hash.to_string(), candidates);
        self
    }

    /// Every call fails as if the service were unreachable.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Submissions are answered with a non-OK status.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    pub fn submissions(&self) -> Rc<RefCell<Vec<HashSubmission>>> {
        Rc::clone(&self.submissions)
    }

    fn unavailable() -> MetadataRetrievalError {
        MetadataRetrievalError::RequestError("connection refused".to_string())
    }
}

impl HashLookupService for FakeHashLookup {
    fn check_hash(&self, hash: &str) -> Result<Vec<HashCandidate>, MetadataRetrievalError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        Ok(self.candidates.get(hash).cloned().unwrap_or_default())
    }

    fn insert_hash(
        &self,
        submission: &HashSubmission,
    ) -> Result<InsertHashResponse, MetadataRetrievalError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        self.submissions.borrow_mut().push(submission.clone());

        if self.rejecting {
            return Ok(InsertHashResponse {
                status: "414 Unknown User Agent".to_string(),
                accepted_hashes: Vec::new(),
            });
        }
        Ok(InsertHashResponse {
            status: "200 OK".to_string(),
            accepted_hashes: vec![submission.hash.clone()],
        })
    }
}

/// Title search answering from fixed tables and recording detail lookups.
#[derive(Default)]
pub(crate) struct FakeTitleSearch {
    results: HashMap<String, Vec<TitleSearchResult>>,
    details: HashMap<String, ResolvedMedia>,
    listings: HashMap<String, Vec<SeasonListing>>,
    failing: bool,
    detail_requests: Rc<RefCell<Vec<String>>>,
}

impl FakeTitleSearch {
    pub fn with_results(mut self, text: &str, results: Vec<TitleSearchResult>) -> Self {
        self.results.insert(text.to_string(), results);
        self
    }

    pub fn with_detail(mut self, media: ResolvedMedia) -> Self {
        self.details.insert(media.id.clone(), media);
        self
    }

    /// Registers a one-season listing for a series.
    pub fn with_listing(mut self, series_id: &str, season: u32, episodes: &[(u32, &str)]) -> Self {
        let listing = SeasonListing {
            season,
            episodes: episodes
                .iter()
                .map(|(episode, id)| EpisodeListingEntry {
                    episode: *episode,
                    id: id.to_string(),
                    title: format!("Episode {}", episode),
                })
                .collect(),
        };
        self.listings
            .entry(series_id.to_string())
            .or_default()
            .push(listing);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn detail_requests(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.detail_requests)
    }
}

impl TitleSearchService for FakeTitleSearch {
    fn search_title(&self, text: &str) -> Result<Vec<TitleSearchResult>, MetadataRetrievalError> {
        if self.failing {
            return Err(MetadataRetrievalError::MissingApiKey("OMDb"));
        }
        Ok(self.results.get(text).cloned().unwrap_or_default())
    }

    fn get_detail(&self, id: &str) -> Result<Option<ResolvedMedia>, MetadataRetrievalError> {
        if self.failing {
            return Err(MetadataRetrievalError::MissingApiKey("OMDb"));
        }
        self.detail_requests.borrow_mut().push(id.to_string());
        Ok(self.details.get(id).cloned())
    }

    fn get_episode_listing(
        &self,
        series_id: &str,
    ) -> Result<Vec<SeasonListing>, MetadataRetrievalError> {
        if self.failing {
            return Err(MetadataRetrievalError::MissingApiKey("OMDb"));
        }
        Ok(self.listings.get(series_id).cloned().unwrap_or_default())
    }
}

/// Episode directory with a fixed set of shows and episodes.
#[derive(Default)]
pub(crate) struct FakeEpisodeDirectory {
    shows: HashMap<String, DirectorySeries>,
    episodes: Vec<(u64, u32, u32, DirectoryEpisode)>,
}

impl FakeEpisodeDirectory {
    pub fn with_show(mut self, query: &str, series: DirectorySeries) -> Self {
        self.shows.insert(query.to_string(), series);
        self
    }

    pub fn with_episode(mut self, series_id: u64, season: u32, number: u32) -> Self {
        self.episodes.push((
            series_id,
            season,
            number,
            DirectoryEpisode {
                id: series_id * 1000 + u64::from(season) * 100 + u64::from(number),
                name: None,
            },
        ));
        self
    }
}

impl EpisodeDirectoryService for FakeEpisodeDirectory {
    fn search_show(&self, name: &str) -> Result<Option<DirectorySeries>, MetadataRetrievalError> {
        Ok(self.shows.get(name).cloned())
    }

    fn get_episode(
        &self,
        series: &DirectorySeries,
        season: u32,
        number: u32,
    ) -> Result<Option<DirectoryEpisode>, MetadataRetrievalError> {
        Ok(self
            .episodes
            .iter()
            .find(|(series_id, s, n, _)| *series_id == series.id && *s == season && *n == number)
            .map(|(_, _, _, episode)| episode.clone()))
    }
}
