//! Resolution strategies turning a parsed descriptor into a canonical record.
//!
//! Every strategy answers `Ok(None)` when it could not identify the media and
//! `Err` only when a provider it depends on was unusable. Neither outcome is
//! fatal to the pipeline: the next strategy simply gets its turn.

mod hash;
pub(crate) mod scoring;
mod text;

pub(crate) use hash::HashResolver;
pub(crate) use text::TextResolver;

use crate::filename_parser::MediaDescriptor;
use crate::metadata_retrieval::{MetadataRetrievalError, ResolvedMedia};
use thiserror::Error;

/// Errors that abort a single resolution strategy
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A metadata provider could not be reached or answered garbage
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(#[from] MetadataRetrievalError),
}

/// Which strategy produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Hash,
    Text,
}

/// A canonical record together with how it was found
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub media: ResolvedMedia,
    pub strategy: Strategy,
    /// Title similarity of the chosen movie, when the text search scored it
    pub score: Option<f64>,
}

/// Optional facts about the media file beyond its name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaHints {
    /// OpenSubtitles hash of the file content
    pub content_hash: Option<String>,
    /// Playback duration in seconds; always positive when present
    pub duration_seconds: Option<f64>,
}

/// Trait for a single resolution strategy
pub(crate) trait MediaResolver {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        descriptor: &MediaDescriptor,
        hints: &MediaHints,
    ) -> Result<Option<Resolution>, ResolveError>;
}
