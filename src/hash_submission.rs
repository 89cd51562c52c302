//! Teaches the hash lookup service about files identified by name.
//!
//! When the content hash did not identify a file but the text search did,
//! the hash is submitted with the resolved IMDb id so the next lookup of the
//! same file succeeds directly.

use crate::metadata_retrieval::{HashLookupService, HashSubmission};
use crate::request::ResolveRequest;
use crate::resolver::{Resolution, Strategy};
use tracing::{debug, info, warn};

/// Minimum title similarity for submitting a movie
const MOVIE_SCORE_THRESHOLD: f64 = 70.0;

const STATUS_OK: &str = "200 OK";

/// Why a submission was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The hash itself identified the media
    HashResolved,
    NoHash,
    /// The movie matched its title too loosely to be trusted
    LowScore,
    UnknownSize,
    UnknownDuration,
}

/// Result of a submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Skipped(SkipReason),
    /// Submitted and listed as accepted
    Accepted,
    /// Submitted with an OK status, but the hash was not accepted
    NotAccepted,
    /// The service answered with a non-OK status
    Rejected(String),
    /// The service could not be reached
    Failed(String),
}

/// Submits the request's hash for a text resolution, when it qualifies.
///
/// Never fails: every problem is logged and reported in the outcome.
pub(crate) fn submit_hash(
    hashes: &dyn HashLookupService,
    request: &ResolveRequest,
    resolution: &Resolution,
) -> SubmissionOutcome {
    let submission = match build_submission(request, resolution) {
        Ok(submission) => submission,
        Err(reason) => {
            debug!(reason = ?reason, "Hash submission skipped");
            return SubmissionOutcome::Skipped(reason);
        }
    };

    info!(
        hash = %submission.hash,
        imdb_id = %submission.imdb_id,
        "Sending hash information to the hash lookup service"
    );

    let response = match hashes.insert_hash(&submission) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Failed to submit hash");
            return SubmissionOutcome::Failed(e.to_string());
        }
    };

    if response.status != STATUS_OK {
        info!(
            title = %resolution.media.display_title(),
            status = %response.status,
            "Unable to submit hash"
        );
        SubmissionOutcome::Rejected(response.status)
    } else if response.accepted_hashes.contains(&submission.hash) {
        info!("New hash submitted and accepted");
        SubmissionOutcome::Accepted
    } else {
        info!("New hash submitted but not accepted");
        SubmissionOutcome::NotAccepted
    }
}

fn build_submission(
    request: &ResolveRequest,
    resolution: &Resolution,
) -> Result<HashSubmission, SkipReason> {
    if resolution.strategy == Strategy::Hash {
        return Err(SkipReason::HashResolved);
    }

    let hash = request.content_hash().ok_or(SkipReason::NoHash)?;

    let media = &resolution.media;
    if !media.is_episode() && resolution.score.unwrap_or(0.0) < MOVIE_SCORE_THRESHOLD {
        return Err(SkipReason::LowScore);
    }

    let size_bytes = request.size_bytes.ok_or(SkipReason::UnknownSize)?;

    let duration_ms = request
        .duration()
        .map(|seconds| (seconds * 1000.0).round() as u64)
        .or_else(|| media.runtime_seconds.map(|seconds| seconds * 1000))
        .ok_or(SkipReason::UnknownDuration)?;

    Ok(HashSubmission {
        hash: hash.to_string(),
        size_bytes,
        imdb_id: media.imdb_digits().to_string(),
        duration_ms,
        filename: request.filename.clone(),
    })
}
