//! The identification request handed over by the playback client.

use crate::resolver::MediaHints;
use serde::Deserialize;
use thiserror::Error;

/// Errors in the request metadata
#[derive(Debug, Error)]
pub enum RequestError {
    /// The metadata is not valid JSON or lacks required fields
    #[error("Invalid media metadata: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The metadata names no file
    #[error("Media metadata carries an empty filename")]
    EmptyFilename,
}

/// Everything known about the media file being identified
///
/// Deserialized from a JSON object such as
/// `{"filename": "Show.S01E02.mkv", "durationSeconds": 2640.5}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// Original filename of the media
    pub filename: String,
    /// OpenSubtitles hash of the file content
    pub content_hash: Option<String>,
    pub size_bytes: Option<u64>,
    /// Playback duration as reported by the player
    pub duration_seconds: Option<f64>,
}

impl ResolveRequest {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Parses the JSON metadata object.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let request: ResolveRequest = serde_json::from_str(json)?;
        if request.filename.trim().is_empty() {
            return Err(RequestError::EmptyFilename);
        }
        Ok(request)
    }

    /// Replaces fields with explicitly given values; `None` keeps the current one.
    pub fn with_overrides(
        mut self,
        content_hash: Option<String>,
        size_bytes: Option<u64>,
        duration_seconds: Option<f64>,
    ) -> Self {
        if content_hash.is_some() {
            self.content_hash = content_hash;
        }
        if size_bytes.is_some() {
            self.size_bytes = size_bytes;
        }
        if duration_seconds.is_some() {
            self.duration_seconds = duration_seconds;
        }
        self
    }

    /// The content hash, ignoring blank values.
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash
            .as_deref()
            .map(str::trim)
            .filter(|hash| !hash.is_empty())
    }

    /// The duration, if it is a usable positive number of seconds.
    pub fn duration(&self) -> Option<f64> {
        self.duration_seconds
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
    }

    pub(crate) fn hints(&self) -> MediaHints {
        MediaHints {
            content_hash: self.content_hash().map(str::to_string),
            duration_seconds: self.duration(),
        }
    }
}
