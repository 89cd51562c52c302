//! Filename parser module
//!
//! This module turns an unstructured media filename into a structured
//! [`MediaDescriptor`]: either an episode hint (show, season, episode numbers)
//! or a movie hint (title, optional year). It is the first clue in every
//! identification.
//!
//! Parsing works through an ordered cascade of typed pattern matchers, most
//! specific first. The first matcher that structurally matches wins. Movie
//! patterns are only consulted when no episode pattern matched.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Widest episode range a single filename may request
const MAX_EPISODES_PER_FILE: u32 = 100;

/// The two kinds of media a descriptor can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Episode,
    Movie,
}

/// Episode hint extracted from a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDescriptor {
    /// Cleaned show name
    pub show: String,
    /// Season number (1 when the filename only carries absolute numbering)
    pub season: u32,
    /// Requested episodes, ascending, never empty
    pub episodes: Vec<u32>,
}

impl EpisodeDescriptor {
    /// The first requested episode number
    pub fn first_episode(&self) -> u32 {
        self.episodes[0]
    }
}

/// Movie hint extracted from a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieDescriptor {
    /// Cleaned movie title
    pub title: String,
    /// Raw 4-digit year as captured from the filename
    pub year: Option<String>,
}

/// Structured hint parsed from a media filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDescriptor {
    Episode(EpisodeDescriptor),
    Movie(MovieDescriptor),
}

impl MediaDescriptor {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaDescriptor::Episode(_) => MediaKind::Episode,
            MediaDescriptor::Movie(_) => MediaKind::Movie,
        }
    }

    /// Number of episodes requested, 1 for movies
    pub fn requested_count(&self) -> usize {
        match self {
            MediaDescriptor::Episode(episode) => episode.episodes.len(),
            MediaDescriptor::Movie(_) => 1,
        }
    }
}

/// Capture fields an episode pattern provides
///
/// Every pattern provides `seriesname`. Range patterns provide
/// `episodenumberstart` and optionally `episodenumberend`, single patterns
/// provide `episodenumber`. Absolute patterns carry no season.
#[derive(Debug, Clone, Copy)]
enum EpisodeFields {
    SeasonRange,
    SeasonSingle,
    AbsoluteRange,
    AbsoluteSingle,
}

struct EpisodePattern {
    fields: EpisodeFields,
    /// Bare digit patterns must not read a release year as season+episode
    reject_year_like: bool,
    regex: Regex,
}

impl EpisodePattern {
    fn new(fields: EpisodeFields, source: &str) -> Self {
        Self {
            fields,
            reject_year_like: false,
            regex: Regex::new(&format!("(?i){source}")).expect("Invalid episode pattern"),
        }
    }

    fn rejecting_years(mut self) -> Self {
        self.reject_year_like = true;
        self
    }

    fn extract(&self, filename: &str) -> Option<EpisodeDescriptor> {
        let caps = self.regex.captures(filename)?;

        let show = clean_name(caps.name("seriesname").map_or("", |m| m.as_str()));

        let season = match self.fields {
            EpisodeFields::SeasonRange | EpisodeFields::SeasonSingle => {
                capture_number(&caps, "seasonnumber")?
            }
            EpisodeFields::AbsoluteRange | EpisodeFields::AbsoluteSingle => 1,
        };

        // Stands in for a backreference: every repeated season must match
        if let Some(repeat) = caps.name("seasonrepeat") {
            if repeat.as_str().parse::<u32>().ok()? != season {
                return None;
            }
        }

        let episodes = match self.fields {
            EpisodeFields::SeasonRange | EpisodeFields::AbsoluteRange => {
                let start = capture_number(&caps, "episodenumberstart")?;
                match capture_number(&caps, "episodenumberend") {
                    Some(end) => episode_range(start, end)?,
                    None => vec![start],
                }
            }
            EpisodeFields::SeasonSingle | EpisodeFields::AbsoluteSingle => {
                vec![capture_number(&caps, "episodenumber")?]
            }
        };

        if self.reject_year_like {
            let digits = format!(
                "{}{}",
                caps.name("seasonnumber").map_or("", |m| m.as_str()),
                caps.name("episodenumber").map_or("", |m| m.as_str())
            );
            if looks_like_year(&digits) {
                return None;
            }
        }

        Some(EpisodeDescriptor {
            show,
            season,
            episodes,
        })
    }
}

static EPISODE_PATTERNS: LazyLock<Vec<EpisodePattern>> = LazyLock::new(|| {
    use EpisodeFields::*;

    vec![
        // [group] Show - 01-02 [crc]
        EpisodePattern::new(
            AbsoluteRange,
            r"^\[(?P<group>.+?)\][ ]?(?P<seriesname>.*?)[ ]?[-_][ ]?(?P<episodenumberstart>[0-9]+)([-_][0-9]+)*[-_](?P<episodenumberend>[0-9]+)[^/]*$",
        ),
        // [group] Show - 01 [crc]
        EpisodePattern::new(
            AbsoluteSingle,
            r"^\[(?P<group>.+?)\][ ]?(?P<seriesname>.*)[ ]?[-_][ ]?(?P<episodenumber>[0-9]+)[^/]*$",
        ),
        // foo s01e23 s01e24 s01e25
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?[Ss](?P<seasonnumber>[0-9]+)[\.\- ]?[Ee](?P<episodenumberstart>[0-9]+)([\.\- ]+[Ss][0-9]+[\.\- ]?[Ee][0-9]+)*([\.\- ]+[Ss](?P<seasonrepeat>[0-9]+)[\.\- ]?[Ee](?P<episodenumberend>[0-9]+))[^/]*$",
        ),
        // foo.s01e23e24
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?[Ss](?P<seasonnumber>[0-9]+)[\.\- ]?[Ee](?P<episodenumberstart>[0-9]+)([\.\- ]?[Ee][0-9]+)*[\.\- ]?[Ee](?P<episodenumberend>[0-9]+)[^/]*$",
        ),
        // foo.1x23 1x24 1x25
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?(?P<seasonnumber>[0-9]+)[xX](?P<episodenumberstart>[0-9]+)([ \._\-]+[0-9]+[xX][0-9]+)*([ \._\-]+(?P<seasonrepeat>[0-9]+)[xX](?P<episodenumberend>[0-9]+))[^/]*$",
        ),
        // foo.1x23x24
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?(?P<seasonnumber>[0-9]+)[xX](?P<episodenumberstart>[0-9]+)([xX][0-9]+)*[xX](?P<episodenumberend>[0-9]+)[^/]*$",
        ),
        // foo.s01e23-24
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?[Ss](?P<seasonnumber>[0-9]+)[\.\- ]?[Ee](?P<episodenumberstart>[0-9]+)([\-][Ee]?[0-9]+)*[\-][Ee]?(?P<episodenumberend>[0-9]+)[\.\- ][^/]*$",
        ),
        // foo.1x23-24
        EpisodePattern::new(
            SeasonRange,
            r"^((?P<seriesname>.+?)[ \._\-])?(?P<seasonnumber>[0-9]+)[xX](?P<episodenumberstart>[0-9]+)([\-+][0-9]+)*[\-+](?P<episodenumberend>[0-9]+)([\.\-+ ].*|$)",
        ),
        // foo.[1x09-11]
        EpisodePattern::new(
            SeasonRange,
            r"^(?P<seriesname>.+?)[ \._\-]\[?(?P<seasonnumber>[0-9]+)[xX](?P<episodenumberstart>[0-9]+)([\-+][0-9]+)*[\-+](?P<episodenumberend>[0-9]+)\][^/]*$",
        ),
        // foo - [012]
        EpisodePattern::new(
            AbsoluteSingle,
            r"^((?P<seriesname>.+?)[ \._\-])?\[(?P<episodenumber>[0-9]+)\][^/]*$",
        ),
        // foo.s0101, foo.0201
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+?)[ \._\-][Ss](?P<seasonnumber>[0-9]{2})[\.\- ]?(?P<episodenumber>[0-9]{2})[^0-9]*$",
        ),
        // foo.1x09
        EpisodePattern::new(
            SeasonSingle,
            r"^((?P<seriesname>.+?)[ \._\-])?\[?(?P<seasonnumber>[0-9]+)[xX](?P<episodenumber>[0-9]+)\]?[^/]*$",
        ),
        // foo.s01.e01, foo.s01_e01, "foo.s01 - e01"
        EpisodePattern::new(
            SeasonSingle,
            r"^((?P<seriesname>.+?)[ \._\-])?\[?[Ss](?P<seasonnumber>[0-9]+)[ ]?[\._\- ]?[ ]?[Ee]?(?P<episodenumber>[0-9]+)\]?[^/]*$",
        ),
        // foo - [01.09]
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+?)[ \._\-]?\[(?P<seasonnumber>[0-9]+?)[.](?P<episodenumber>[0-9]+?)\][ \._\-]?[^/]*$",
        ),
        // Foo - S2 E 02 - etc
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+?)[ ]?[ \._\-][ ]?[Ss](?P<seasonnumber>[0-9]+)[\.\- ]?[Ee]?[ ]?(?P<episodenumber>[0-9]+)[^/]*$",
        ),
        // Show - Episode 9999 [S 12 - Ep 131] - etc
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+)[ ]-[ ][Ee]pisode[ ][0-9]+[ ]\[[sS][ ]?(?P<seasonnumber>[0-9]+)([ ]|[ ]-[ ]|-)([eE]|[eE]p)[ ]?(?P<episodenumber>[0-9]+)\].*$",
        ),
        // show name 2 of 6 - blah
        EpisodePattern::new(
            AbsoluteSingle,
            r"^(?P<seriesname>.+?)[ \._\-](?P<episodenumber>[0-9]+)[ \._\-]?of[ \._\-]?[0-9]+([\._ -]|$|[^/]*$)",
        ),
        // Show.Name.Part.1.and.Part.2
        EpisodePattern::new(
            AbsoluteRange,
            r"^(?P<seriesname>.+?)[ \._\-](?:part|pt)?[\._ -](?P<episodenumberstart>[0-9]+)(?:[ \._-](?:and|&|to)[ \._-](?:part|pt)?[ \._-](?:[0-9]+))*[ \._-](?:and|&|to)[ \._-]?(?:part|pt)?[ \._-](?P<episodenumberend>[0-9]+)[\._ -][^/]*$",
        ),
        // Show.Name.Part 1
        EpisodePattern::new(
            AbsoluteSingle,
            r"^(?P<seriesname>.+?)[ \._\-][Pp]art[ ](?P<episodenumber>[0-9]+)[\._ -][^/]*$",
        ),
        // show name Season 01 Episode 20
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+?)[ ]?[Ss]eason[ ]?(?P<seasonnumber>[0-9]+)[ ]?[Ee]pisode[ ]?(?P<episodenumber>[0-9]+)[^/]*$",
        ),
        // foo.103
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+)[ \._\-](?P<seasonnumber>[0-9]{1})(?P<episodenumber>[0-9]{2})[\._ -][^/]*$",
        )
        .rejecting_years(),
        // foo.0103
        EpisodePattern::new(
            SeasonSingle,
            r"^(?P<seriesname>.+)[ \._\-](?P<seasonnumber>[0-9]{2})(?P<episodenumber>[0-9]{2,3})[\._ -][^/]*$",
        )
        .rejecting_years(),
        // show.name.e123.abc
        EpisodePattern::new(
            AbsoluteSingle,
            r"^(?P<seriesname>.+?)[ \._\-][Ee](?P<episodenumber>[0-9]+)[\._ -][^/]*$",
        ),
    ]
});

static MOVIE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Title followed by a release tag or a year
        r"^(\(.*?\)|\[.*?\])?(-)?[ ]*?(?P<moviename>.*?)(dvdrip|xvid|cd[0-9]|dvdscr|brrip|divx|[\{\(\[]?(?P<year>[0-9]{4})).*$",
        // Anything, with an optional year and extension
        r"^(\(.*?\)|\[.*?\])?(-)?[ ]*?(?P<moviename>.+?)[ ]*?(?:[\[(]?(?P<year>[0-9]{4})[\])]?.*)?(?:\.[a-zA-Z0-9]{2,4})?$",
    ]
    .iter()
    .map(|source| Regex::new(&format!("(?i){source}")).expect("Invalid movie pattern"))
    .collect()
});

/// Parses a filename into a media descriptor
///
/// Episode patterns are tried first, in order of specificity; the first one
/// that matches decides the result. Only if no episode pattern matches are
/// the movie patterns tried.
///
/// # Returns
///
/// `Some(MediaDescriptor)` if any pattern matched, `None` if the filename
/// could not be recognized at all.
///
/// # Examples
///
/// ```
/// use media_detective::{parse_filename, MediaDescriptor};
///
/// match parse_filename("Show.Name.S01E02.Group.mkv") {
///     Some(MediaDescriptor::Episode(episode)) => {
///         assert_eq!(episode.show, "Show Name");
///         assert_eq!(episode.season, 1);
///         assert_eq!(episode.episodes, vec![2]);
///     }
///     other => panic!("unexpected descriptor: {:?}", other),
/// }
/// ```
pub fn parse_filename(filename: &str) -> Option<MediaDescriptor> {
    if let Some(episode) = EPISODE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.extract(filename))
    {
        return Some(MediaDescriptor::Episode(episode));
    }

    MOVIE_PATTERNS
        .iter()
        .find_map(|regex| extract_movie(regex, filename))
        .map(MediaDescriptor::Movie)
}

/// Parses a filename given as raw bytes (decoded lossily as UTF-8)
pub fn parse_filename_bytes(filename: &[u8]) -> Option<MediaDescriptor> {
    parse_filename(&String::from_utf8_lossy(filename))
}

fn extract_movie(regex: &Regex, filename: &str) -> Option<MovieDescriptor> {
    let caps = regex.captures(filename)?;
    let title = clean_name(caps.name("moviename")?.as_str());
    if title.is_empty() {
        return None;
    }

    Some(MovieDescriptor {
        title,
        year: caps.name("year").map(|m| m.as_str().to_string()),
    })
}

fn capture_number(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

/// Builds the ascending, inclusive episode range between two bounds
///
/// Ranges wider than [`MAX_EPISODES_PER_FILE`] are not a match.
fn episode_range(start: u32, end: u32) -> Option<Vec<u32>> {
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    if end - start >= MAX_EPISODES_PER_FILE {
        return None;
    }
    Some((start..=end).collect())
}

fn looks_like_year(digits: &str) -> bool {
    digits.len() == 4
        && digits
            .parse::<u32>()
            .is_ok_and(|year| (1900..=2099).contains(&year))
}

/// Turns a raw captured name into a readable one
///
/// Dots become spaces, except a dot that is followed by a single character
/// and then another dot or the end (abbreviations like `S.H.I.E.L.D`).
/// A dot still following two regular characters after that is replaced too.
/// Underscores become spaces; leading and trailing dashes and spaces go.
fn clean_name(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let len = chars.len();

    let first_pass: Vec<char> = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c != '.' {
                return c;
            }
            let abbreviation =
                i + 1 < len && chars[i + 1] != '\n' && (i + 2 == len || chars[i + 2] == '.');
            if abbreviation { '.' } else { ' ' }
        })
        .collect();

    let is_word_char = |c: char| c != '.' && c != ' ';
    let second_pass: String = first_pass
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let after_two_word_chars =
                i >= 2 && is_word_char(first_pass[i - 1]) && is_word_char(first_pass[i - 2]);
            if c == '.' && after_two_word_chars {
                ' '
            } else {
                c
            }
        })
        .collect();

    second_pass
        .replace('_', " ")
        .trim_matches(|c: char| c == '-' || c == ' ')
        .to_string()
}
