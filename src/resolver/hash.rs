//! Resolution through a content-hash lookup.

use super::scoring::{first_max_by, similarity};
use super::{MediaHints, MediaResolver, Resolution, ResolveError, Strategy};
use crate::filename_parser::{EpisodeDescriptor, MediaDescriptor, MediaKind, MovieDescriptor};
use crate::metadata_retrieval::{HashCandidate, HashLookupService, TitleSearchService};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Minimum similarity for a fuzzily matched show name
const SHOW_NAME_THRESHOLD: f64 = 80.0;

/// `"Show Name" Episode Title` → `Show Name`
static QUOTED_SHOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]*)" .*$"#).expect("valid quoted show regex"));

/// Looks the content hash up and verifies the candidates against the filename.
pub(crate) struct HashResolver<'a> {
    hashes: &'a dyn HashLookupService,
    titles: &'a dyn TitleSearchService,
}

impl<'a> HashResolver<'a> {
    pub fn new(hashes: &'a dyn HashLookupService, titles: &'a dyn TitleSearchService) -> Self {
        Self { hashes, titles }
    }
}

impl MediaResolver for HashResolver<'_> {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn resolve(
        &self,
        descriptor: &MediaDescriptor,
        hints: &MediaHints,
    ) -> Result<Option<Resolution>, ResolveError> {
        let Some(hash) = hints.content_hash.as_deref() else {
            return Ok(None);
        };

        info!(hash, "Searching media using hash lookup");
        let candidates = self.hashes.check_hash(hash)?;
        debug!(count = candidates.len(), "Hash lookup returned candidates");

        let Some(candidate) = select_candidate(descriptor, candidates) else {
            return Ok(None);
        };

        debug!(
            imdb_id = %candidate.imdb_id,
            title = %candidate.title,
            year = ?candidate.year,
            "Hash candidate selected"
        );
        let media = self.titles.get_detail(&candidate.imdb_id)?;

        Ok(media.map(|media| Resolution {
            media,
            strategy: Strategy::Hash,
            score: None,
        }))
    }
}

/// Picks the candidate agreeing with the filename, if any.
fn select_candidate(
    descriptor: &MediaDescriptor,
    mut candidates: Vec<HashCandidate>,
) -> Option<HashCandidate> {
    if candidates.len() == 1 {
        let candidate = candidates.remove(0);
        return (candidate.kind == descriptor.kind()).then_some(candidate);
    }

    match descriptor {
        MediaDescriptor::Episode(episode) => select_episode(episode, candidates),
        MediaDescriptor::Movie(movie) => select_movie(movie, candidates),
    }
}

fn select_episode(
    descriptor: &EpisodeDescriptor,
    candidates: Vec<HashCandidate>,
) -> Option<HashCandidate> {
    let same_episode: Vec<HashCandidate> = candidates
        .into_iter()
        .filter(|candidate| {
            candidate.kind == MediaKind::Episode
                && candidate.season == Some(descriptor.season)
                && candidate.episode == Some(descriptor.first_episode())
        })
        .collect();

    let prefix = format!("\"{}\"", descriptor.show.to_lowercase());
    if let Some(exact) = same_episode
        .iter()
        .find(|candidate| candidate.title.to_lowercase().starts_with(&prefix))
    {
        return Some(exact.clone());
    }

    // The filename may carry a typo in the show name
    let score = |candidate: &HashCandidate| {
        similarity(&descriptor.show, &show_name_of(&candidate.title))
    };
    let closest = first_max_by(same_episode, score)?;
    let closest_score = score(&closest);
    debug!(title = %closest.title, score = closest_score, "Closest show name");

    (closest_score >= SHOW_NAME_THRESHOLD).then_some(closest)
}

fn select_movie(
    descriptor: &MovieDescriptor,
    candidates: Vec<HashCandidate>,
) -> Option<HashCandidate> {
    first_max_by(candidates, |candidate| {
        similarity(&descriptor.title, &candidate.title)
    })
}

fn show_name_of(title: &str) -> String {
    QUOTED_SHOW.replace(title, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_retrieval::fakes::{
        FakeHashLookup, FakeTitleSearch, episode, episode_candidate, movie, movie_candidate,
    };
    use crate::parse_filename;

    const HASH: &str = "8e245d9679d31e12";

    fn hints() -> MediaHints {
        MediaHints {
            content_hash: Some(HASH.to_string()),
            duration_seconds: None,
        }
    }

    fn titles() -> FakeTitleSearch {
        FakeTitleSearch::default()
            .with_detail(episode("tt0959621", "Breaking Bad", 1, 1, "Pilot", None))
            .with_detail(episode("tt1000001", "Breaking Point", 1, 1, "Pilot", None))
            .with_detail(movie("tt0113277", "Heat", "1995", Some(10200)))
            .with_detail(movie("tt0104412", "Hot Shots!", "1991", Some(5040)))
    }

    fn resolve(
        filename: &str,
        hashes: &FakeHashLookup,
        titles: &FakeTitleSearch,
        hints: &MediaHints,
    ) -> Option<Resolution> {
        let descriptor = parse_filename(filename).unwrap();
        HashResolver::new(hashes, titles)
            .resolve(&descriptor, hints)
            .unwrap()
    }

    #[test]
    fn test_no_hash_means_no_lookup() {
        let hashes = FakeHashLookup::default().failing();
        let resolution = resolve("Heat.1995.mkv", &hashes, &titles(), &MediaHints::default());
        assert!(resolution.is_none());
    }

    #[test]
    fn test_unknown_hash() {
        let resolution = resolve("Heat.1995.mkv", &FakeHashLookup::default(), &titles(), &hints());
        assert!(resolution.is_none());
    }

    #[test]
    fn test_single_candidate_of_other_kind_is_rejected() {
        let hashes =
            FakeHashLookup::default().with(HASH, vec![movie_candidate("Heat", "tt0113277")]);
        let resolution = resolve("Breaking.Bad.S01E01.mkv", &hashes, &titles(), &hints());
        assert!(resolution.is_none());
    }

    #[test]
    fn test_single_candidate_of_same_kind_is_accepted() {
        let hashes =
            FakeHashLookup::default().with(HASH, vec![movie_candidate("Heat", "tt0113277")]);
        let resolution = resolve("Some.Other.Name.2001.mkv", &hashes, &titles(), &hints()).unwrap();
        assert_eq!(resolution.media.id, "tt0113277");
        assert_eq!(resolution.strategy, Strategy::Hash);
        assert_eq!(resolution.score, None);
    }

    #[test]
    fn test_episode_quoted_prefix_match() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![
                episode_candidate("\"Breaking Point\" Pilot", 1, 1, "tt1000001"),
                episode_candidate("\"Breaking Bad\" Cat's in the Bag...", 1, 2, "tt1054724"),
                episode_candidate("\"Breaking Bad\" Pilot", 1, 1, "tt0959621"),
            ],
        );
        let resolution =
            resolve("breaking.bad.s01e01.720p.mkv", &hashes, &titles(), &hints()).unwrap();
        assert_eq!(resolution.media.id, "tt0959621");
    }

    #[test]
    fn test_episode_fuzzy_show_name() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![
                movie_candidate("Heat", "tt0113277"),
                episode_candidate("\"Breaking Bad\" Pilot", 1, 1, "tt0959621"),
            ],
        );
        let resolution = resolve("Braking.Bad.S01E01.mkv", &hashes, &titles(), &hints()).unwrap();
        assert_eq!(resolution.media.id, "tt0959621");
    }

    #[test]
    fn test_episode_fuzzy_below_threshold() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![
                episode_candidate("\"Some Other Show\" Pilot", 1, 1, "tt0959621"),
                episode_candidate("\"Another One\" Pilot", 1, 1, "tt1000001"),
            ],
        );
        assert!(resolve("Breaking.Bad.S01E01.mkv", &hashes, &titles(), &hints()).is_none());
    }

    #[test]
    fn test_episode_without_matching_numbers() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![
                episode_candidate("\"Breaking Bad\" Pilot", 1, 1, "tt0959621"),
                episode_candidate("\"Breaking Bad\" Pilot", 1, 1, "tt0959621"),
            ],
        );
        assert!(resolve("Breaking.Bad.S02E05.mkv", &hashes, &titles(), &hints()).is_none());
    }

    #[test]
    fn test_movie_best_similarity_wins() {
        let hashes = FakeHashLookup::default().with(
            HASH,
            vec![
                movie_candidate("Hot Shots!", "tt0104412"),
                movie_candidate("Heat", "tt0113277"),
            ],
        );
        let resolution =
            resolve("Heat.1995.DVDRip.XviD.avi", &hashes, &titles(), &hints()).unwrap();
        assert_eq!(resolution.media.id, "tt0113277");
    }

    #[test]
    fn test_provider_failure_is_an_error() {
        let descriptor = parse_filename("Heat.1995.mkv").unwrap();
        let hashes = FakeHashLookup::default().failing();
        let titles = titles();
        let result = HashResolver::new(&hashes, &titles).resolve(&descriptor, &hints());
        assert!(matches!(result, Err(ResolveError::ProviderUnavailable(_))));
    }

    #[test]
    fn test_show_name_of() {
        assert_eq!(show_name_of("\"Breaking Bad\" Pilot"), "Breaking Bad");
        assert_eq!(show_name_of("Heat"), "Heat");
    }
}
