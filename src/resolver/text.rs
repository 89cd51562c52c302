//! Resolution through free-text searches on the parsed names.

use super::scoring::{Scored, above_one_std_dev, closest_runtime, keep_top_scored, similarity};
use super::{MediaHints, MediaResolver, Resolution, ResolveError, Strategy};
use crate::filename_parser::{EpisodeDescriptor, MediaDescriptor, MovieDescriptor};
use crate::metadata_retrieval::{
    DirectorySeries, EpisodeDirectoryService, TitleSearchResult, TitleSearchService, TitleType,
};
use std::iter;
use tracing::{debug, info};

/// Searches the episode directory and the title database by name.
pub(crate) struct TextResolver<'a> {
    titles: &'a dyn TitleSearchService,
    directory: &'a dyn EpisodeDirectoryService,
}

impl<'a> TextResolver<'a> {
    pub fn new(
        titles: &'a dyn TitleSearchService,
        directory: &'a dyn EpisodeDirectoryService,
    ) -> Self {
        Self { titles, directory }
    }

    fn resolve_episode(
        &self,
        descriptor: &EpisodeDescriptor,
    ) -> Result<Option<Resolution>, ResolveError> {
        info!(show = %descriptor.show, "Searching media using text search on episode");

        let Some(series) = self.directory.search_show(&descriptor.show)? else {
            debug!(show = %descriptor.show, "Episode directory does not know the show");
            return Ok(None);
        };

        let episode_number = descriptor.first_episode();
        let Some(directory_episode) = self
            .directory
            .get_episode(&series, descriptor.season, episode_number)?
        else {
            debug!(
                series = %series.name,
                season = descriptor.season,
                episode = episode_number,
                "Episode directory does not know the episode"
            );
            return Ok(None);
        };
        debug!(
            id = directory_episode.id,
            name = ?directory_episode.name,
            "Episode found in directory"
        );

        let Some(series_id) = self.find_series_id(&series)? else {
            debug!(series = %series.name, "No title record for the series");
            return Ok(None);
        };

        let listings = self.titles.get_episode_listing(&series_id)?;
        let Some(entry) = listings
            .iter()
            .filter(|listing| listing.season == descriptor.season)
            .flat_map(|listing| listing.episodes.iter())
            .find(|entry| entry.episode == episode_number)
        else {
            return Ok(None);
        };
        debug!(id = %entry.id, title = %entry.title, "Episode found in listing");

        let media = self.titles.get_detail(&entry.id)?;
        Ok(media.map(|media| Resolution {
            media,
            strategy: Strategy::Text,
            score: None,
        }))
    }

    /// Title record id of the series, trying its name and then every alias.
    fn find_series_id(&self, series: &DirectorySeries) -> Result<Option<String>, ResolveError> {
        for name in iter::once(&series.name).chain(series.aliases.iter()) {
            let mut matches: Vec<TitleSearchResult> = self
                .titles
                .search_title(name)?
                .into_iter()
                .filter(|result| result.title_type == TitleType::TvSeries && result.title == *name)
                .collect();

            if matches.len() > 1 {
                let first_aired = series.first_aired_year();
                matches.retain(|result| result.year.as_deref() == first_aired);
            }

            if let Some(found) = matches.into_iter().next() {
                debug!(name = %name, id = %found.id, "Series found in title search");
                return Ok(Some(found.id));
            }
        }

        Ok(None)
    }

    fn resolve_movie(
        &self,
        descriptor: &MovieDescriptor,
        duration_seconds: Option<f64>,
    ) -> Result<Option<Resolution>, ResolveError> {
        info!(title = %descriptor.title, "Searching media using text search on movie");

        let mut scored: Vec<Scored<TitleSearchResult>> = self
            .titles
            .search_title(&descriptor.title)?
            .into_iter()
            .filter(|result| result.title_type != TitleType::TvEpisode)
            .map(|result| {
                let score = similarity(&descriptor.title, &result.title);
                Scored::new(result, score)
            })
            .collect();

        if scored.is_empty() {
            return Ok(None);
        }

        if let Some(year) = descriptor.year.as_deref() {
            if scored.iter().any(|s| s.item.year.as_deref() == Some(year)) {
                scored.retain(|s| s.item.year.as_deref() == Some(year));
            }
        }

        for s in &scored {
            debug!(title = %s.item.title, year = ?s.item.year, score = s.score, "Movie candidate");
        }

        let Some(duration) = duration_seconds else {
            // Without a duration only the name can decide
            let Some(best) = keep_top_scored(scored).into_iter().next() else {
                return Ok(None);
            };
            let media = self.titles.get_detail(&best.item.id)?;
            return Ok(media.map(|media| Resolution {
                media,
                strategy: Strategy::Text,
                score: None,
            }));
        };

        let mut survivors = Vec::new();
        for candidate in above_one_std_dev(scored) {
            if let Some(media) = self.titles.get_detail(&candidate.item.id)? {
                survivors.push(Scored::new(media, candidate.score));
            }
        }

        Ok(
            closest_runtime(survivors, duration, |s| s.item.runtime_seconds).map(|s| Resolution {
                media: s.item,
                strategy: Strategy::Text,
                score: Some(s.score),
            }),
        )
    }
}

impl MediaResolver for TextResolver<'_> {
    fn name(&self) -> &'static str {
        "text"
    }

    fn resolve(
        &self,
        descriptor: &MediaDescriptor,
        hints: &MediaHints,
    ) -> Result<Option<Resolution>, ResolveError> {
        match descriptor {
            MediaDescriptor::Episode(episode) => self.resolve_episode(episode),
            MediaDescriptor::Movie(movie) => self.resolve_movie(movie, hints.duration_seconds),
        }
    }
}
