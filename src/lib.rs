//! MediaDetective - Identify the movie or episode behind a media file
//!
//! This library takes whatever is known about a media file (its name, and
//! optionally its content hash, size and duration) and works out which movie
//! or TV episode it is, returning canonical metadata records.
//!
//! The filename is parsed into a structured hint first. The content hash is
//! then looked up; if that does not settle the case, the parsed names are
//! searched for in title databases and the candidates are ranked by fuzzy
//! similarity and runtime. Files identified by name teach the hash service
//! their hash, and multi-episode files are expanded into every episode they
//! contain.

mod config;
mod filename_parser;
mod fingerprint;
mod hash_submission;
mod metadata_retrieval;
mod request;
mod resolver;

use hash_submission::submit_hash;
use metadata_retrieval::{
    EpisodeDirectoryService, HashLookupService, OmdbProvider, OpenSubtitlesProvider,
    TitleSearchService, TvMazeProvider,
};
use resolver::{HashResolver, MediaHints, MediaResolver, Resolution, TextResolver};
use thiserror::Error;
use tracing::{info, warn};

pub use config::{Config, ConfigError};
pub use filename_parser::{
    EpisodeDescriptor, MediaDescriptor, MediaKind, MovieDescriptor, parse_filename,
    parse_filename_bytes,
};
pub use fingerprint::{FingerprintError, MediaFingerprint, fingerprint_file};
pub use hash_submission::{SkipReason, SubmissionOutcome};
pub use metadata_retrieval::{MetadataRetrievalError, ResolvedMedia, TitleType, XmlRpcError};
pub use request::{RequestError, ResolveRequest};
pub use resolver::{ResolveError, Strategy};

/// Progress event emitted during identification
///
/// These events allow library users to follow the pipeline and report on
/// it, or to ignore it completely.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Identification started
    Started { filename: String },

    /// The filename matched no known naming scheme
    Unrecognized { filename: String },

    /// The filename was parsed into a descriptor
    Parsed { descriptor: MediaDescriptor },

    /// A resolution strategy is about to run
    Resolving { strategy: Strategy },

    /// A strategy was aborted because a provider was unavailable
    StrategyFailed { strategy: Strategy, error: String },

    /// A canonical record was found
    Resolved {
        id: String,
        title: String,
        strategy: Strategy,
    },

    /// The hash submission step finished
    HashSubmission { outcome: SubmissionOutcome },

    /// Fewer episodes than requested could be followed
    ExpansionTruncated { requested: usize, resolved: usize },

    /// Identification complete
    Complete { count: usize },
}

/// Top-level error type for MediaDetective operations
#[derive(Debug, Error)]
pub enum MediaDetectiveError {
    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error in the request metadata
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Error while fingerprinting a local file
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// The HTTP client could not be set up
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The results could not be serialized
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// The identification pipeline with its metadata providers
pub struct MediaDetective {
    hashes: Box<dyn HashLookupService>,
    titles: Box<dyn TitleSearchService>,
    directory: Box<dyn EpisodeDirectoryService>,
}

impl MediaDetective {
    /// Creates the pipeline backed by OpenSubtitles, OMDb and TVMaze.
    ///
    /// No network request is made until the first identification.
    pub fn from_config(config: &Config) -> Result<Self, MediaDetectiveError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("media_detective/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_providers(
            Box::new(OpenSubtitlesProvider::new(
                client.clone(),
                config.opensubtitles_url.clone(),
                config.opensubtitles_user_agent.clone(),
            )),
            Box::new(OmdbProvider::new(
                client.clone(),
                config.omdb_url.clone(),
                config.omdb_api_key.clone(),
            )),
            Box::new(TvMazeProvider::new(client, config.tvmaze_url.clone())),
        ))
    }

    pub(crate) fn with_providers(
        hashes: Box<dyn HashLookupService>,
        titles: Box<dyn TitleSearchService>,
        directory: Box<dyn EpisodeDirectoryService>,
    ) -> Self {
        Self {
            hashes,
            titles,
            directory,
        }
    }

    /// Identifies the media described by a request
    ///
    /// Runs the hash lookup, then the text search if needed, submits the
    /// hash for files identified by name, and expands multi-episode files.
    /// Provider failures are logged and only abort the stage they happen in,
    /// so this never fails: an empty vector means the media was not
    /// identified.
    ///
    /// # Arguments
    ///
    /// * `request` - Filename and optional hash, size and duration
    /// * `progress_callback` - Closure called with progress events (can be empty for silent
    ///   operation)
    ///
    /// # Returns
    ///
    /// The canonical records, one per episode for multi-episode files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_detective::{Config, MediaDetective, ResolveRequest};
    ///
    /// let detective = MediaDetective::from_config(&Config::default()).unwrap();
    /// let request = ResolveRequest::new("Breaking.Bad.S01E01E02.720p.mkv");
    ///
    /// for media in detective.identify(&request, |_| {}) {
    ///     println!("{}", media.display_title());
    /// }
    /// ```
    pub fn identify<F>(
        &self,
        request: &ResolveRequest,
        mut progress_callback: F,
    ) -> Vec<ResolvedMedia>
    where
        F: FnMut(ProgressEvent),
    {
        progress_callback(ProgressEvent::Started {
            filename: request.filename.clone(),
        });

        let Some(descriptor) = parse_filename(&request.filename) else {
            info!(filename = %request.filename, "Filename not recognized");
            progress_callback(ProgressEvent::Unrecognized {
                filename: request.filename.clone(),
            });
            progress_callback(ProgressEvent::Complete { count: 0 });
            return Vec::new();
        };

        progress_callback(ProgressEvent::Parsed {
            descriptor: descriptor.clone(),
        });

        let hints = request.hints();
        let Some(resolution) = self.resolve(&descriptor, &hints, &mut progress_callback) else {
            info!(filename = %request.filename, "Media not identified");
            progress_callback(ProgressEvent::Complete { count: 0 });
            return Vec::new();
        };

        progress_callback(ProgressEvent::Resolved {
            id: resolution.media.id.clone(),
            title: resolution.media.display_title(),
            strategy: resolution.strategy,
        });

        if resolution.strategy == Strategy::Text {
            let outcome = submit_hash(self.hashes.as_ref(), request, &resolution);
            progress_callback(ProgressEvent::HashSubmission { outcome });
        }

        let requested = descriptor.requested_count();
        let results = self.expand_episodes(resolution.media, requested);
        if results[0].is_episode() && results.len() < requested {
            progress_callback(ProgressEvent::ExpansionTruncated {
                requested,
                resolved: results.len(),
            });
        }

        progress_callback(ProgressEvent::Complete {
            count: results.len(),
        });

        results
    }

    /// Runs the strategies in order until one identifies the media.
    fn resolve<F>(
        &self,
        descriptor: &MediaDescriptor,
        hints: &MediaHints,
        progress_callback: &mut F,
    ) -> Option<Resolution>
    where
        F: FnMut(ProgressEvent),
    {
        let resolvers: [(Strategy, Box<dyn MediaResolver + '_>); 2] = [
            (
                Strategy::Hash,
                Box::new(HashResolver::new(self.hashes.as_ref(), self.titles.as_ref())),
            ),
            (
                Strategy::Text,
                Box::new(TextResolver::new(self.titles.as_ref(), self.directory.as_ref())),
            ),
        ];

        for (strategy, resolver) in resolvers {
            if strategy == Strategy::Hash && hints.content_hash.is_none() {
                continue;
            }

            progress_callback(ProgressEvent::Resolving { strategy });
            match resolver.resolve(descriptor, hints) {
                Ok(Some(resolution)) => return Some(resolution),
                Ok(None) => {}
                Err(e) => {
                    warn!(strategy = resolver.name(), error = %e, "Resolution strategy failed");
                    progress_callback(ProgressEvent::StrategyFailed {
                        strategy,
                        error: e.to_string(),
                    });
                }
            }
        }

        None
    }

    /// Follows next-episode references until `requested` episodes are known.
    ///
    /// A broken chain truncates the result; whatever was resolved is kept.
    fn expand_episodes(&self, first: ResolvedMedia, requested: usize) -> Vec<ResolvedMedia> {
        let mut results = vec![first];
        if !results[0].is_episode() {
            return results;
        }

        while results.len() < requested {
            let Some(next_id) = results.last().and_then(|media| media.next_episode.clone()) else {
                warn!(
                    requested,
                    resolved = results.len(),
                    "Episode has no next episode, truncating"
                );
                break;
            };

            match self.titles.get_detail(&next_id) {
                Ok(Some(media)) => results.push(media),
                Ok(None) => {
                    warn!(id = %next_id, "Next episode not found, truncating");
                    break;
                }
                Err(e) => {
                    warn!(id = %next_id, error = %e, "Failed to fetch next episode, truncating");
                    break;
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::fakes::{
        FakeEpisodeDirectory, FakeHashLookup, FakeTitleSearch, episode, episode_candidate, movie,
        search_hit,
    };
    use crate::metadata_retrieval::DirectorySeries;

    const HASH: &str = "8e245d9679d31e12";

    fn titles() -> FakeTitleSearch {
        FakeTitleSearch::default()
            .with_results(
                "Heat",
                vec![
                    search_hit("tt0113277", "Heat", TitleType::Movie, "1995"),
                    search_hit("tt2095649", "Heat", TitleType::Movie, "2013"),
                ],
            )
            .with_results(
                "Breaking Bad",
                vec![search_hit("tt0903747", "Breaking Bad", TitleType::TvSeries, "2008")],
            )
            .with_listing("tt0903747", 1, &[(1, "tt0959621"), (2, "tt1054724"), (3, "tt1054725")])
            .with_detail(movie("tt0113277", "Heat", "1995", Some(10200)))
            .with_detail(movie("tt2095649", "Heat", "2013", Some(5400)))
            .with_detail(episode("tt0959621", "Breaking Bad", 1, 1, "Pilot", Some("tt1054724")))
            .with_detail(episode(
                "tt1054724",
                "Breaking Bad",
                1,
                2,
                "Cat's in the Bag...",
                Some("tt1054725"),
            ))
            .with_detail(episode(
                "tt1054725",
                "Breaking Bad",
                1,
                3,
                "...And the Bag's in the River",
                None,
            ))
    }

    fn directory() -> FakeEpisodeDirectory {
        FakeEpisodeDirectory::default()
            .with_show(
                "Breaking Bad",
                DirectorySeries {
                    id: 169,
                    name: "Breaking Bad".to_string(),
                    aliases: vec![],
                    first_aired: Some("2008-01-20".to_string()),
                },
            )
            .with_episode(169, 1, 1)
            .with_episode(169, 1, 2)
            .with_episode(169, 1, 3)
            .with_episode(169, 1, 4)
    }

    fn detective(hashes: FakeHashLookup, titles: FakeTitleSearch) -> MediaDetective {
        MediaDetective::with_providers(Box::new(hashes), Box::new(titles), Box::new(directory()))
    }

    fn request(filename: &str) -> ResolveRequest {
        ResolveRequest {
            filename: filename.to_string(),
            content_hash: Some(HASH.to_string()),
            size_bytes: Some(734003200),
            duration_seconds: Some(5500.0),
        }
    }

    fn ids(results: &[ResolvedMedia]) -> Vec<&str> {
        results.iter().map(|media| media.id.as_str()).collect()
    }

    #[test]
    fn test_hash_resolution_is_not_submitted() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![episode_candidate("\"Breaking Bad\" Pilot", 1, 1, "tt0959621")],
        );
        let submissions = hashes.submissions();
        let detective = detective(hashes, titles());

        let mut events = Vec::new();
        let results = detective.identify(&request("Breaking.Bad.S01E01.mkv"), |e| events.push(e));

        assert_eq!(ids(&results), vec!["tt0959621"]);
        assert!(submissions.borrow().is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::Resolved { strategy: Strategy::Hash, .. }
        )));
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::HashSubmission { .. })));
    }

    #[test]
    fn test_text_resolution_submits_hash() {
        let hashes = FakeHashLookup::default();
        let submissions = hashes.submissions();
        let detective = detective(hashes, titles());

        let mut events = Vec::new();
        let results = detective.identify(&request("Heat.mkv"), |e| events.push(e));

        assert_eq!(ids(&results), vec!["tt2095649"]);
        assert_eq!(submissions.borrow().len(), 1);
        assert_eq!(submissions.borrow()[0].imdb_id, "2095649");
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::HashSubmission {
                outcome: SubmissionOutcome::Accepted
            }
        )));
    }

    #[test]
    fn test_hash_failure_falls_through_to_text() {
        let detective = detective(FakeHashLookup::default().failing(), titles());

        let mut events = Vec::new();
        let results = detective.identify(&request("Heat.mkv"), |e| events.push(e));

        assert_eq!(ids(&results), vec!["tt2095649"]);
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::StrategyFailed { strategy: Strategy::Hash, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::HashSubmission {
                outcome: SubmissionOutcome::Failed(_)
            }
        )));
    }

    #[test]
    fn test_without_hash_the_lookup_is_skipped() {
        let detective = detective(FakeHashLookup::default().failing(), titles());
        let request = ResolveRequest::new("Heat.mkv");

        let mut events = Vec::new();
        let results = detective.identify(&request, |e| events.push(e));

        assert_eq!(ids(&results), vec!["tt0113277"]);
        assert!(!events.iter().any(|e| matches!(
            e,
            ProgressEvent::Resolving { strategy: Strategy::Hash }
        )));
    }

    #[test]
    fn test_multi_episode_expansion() {
        let detective = detective(FakeHashLookup::default(), titles());
        let results = detective.identify(&request("Breaking.Bad.S01E01-E03.mkv"), |_| {});
        assert_eq!(ids(&results), vec!["tt0959621", "tt1054724", "tt1054725"]);
    }

    #[test]
    fn test_multi_episode_expansion_truncates_on_broken_chain() {
        let detective = detective(FakeHashLookup::default(), titles());

        let mut events = Vec::new();
        let results = detective.identify(&request("Breaking.Bad.S01E02E03E04.mkv"), |e| {
            events.push(e)
        });

        assert_eq!(ids(&results), vec!["tt1054724", "tt1054725"]);
        assert!(events.iter().any(|e| matches!(
            e,
            ProgressEvent::ExpansionTruncated {
                requested: 3,
                resolved: 2
            }
        )));
    }

    #[test]
    fn test_unresolved_media_is_empty() {
        let detective = detective(FakeHashLookup::default(), titles());

        let mut events = Vec::new();
        let results = detective.identify(&request("Unknown.Movie.1999.mkv"), |e| events.push(e));

        assert!(results.is_empty());
        assert!(matches!(events.last(), Some(ProgressEvent::Complete { count: 0 })));
    }

    #[test]
    fn test_unrecognized_filename() {
        let detective = detective(FakeHashLookup::default(), titles());

        let mut events = Vec::new();
        let results = detective.identify(&ResolveRequest::new(""), |e| events.push(e));

        assert!(results.is_empty());
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::Unrecognized { .. })));
    }
}
