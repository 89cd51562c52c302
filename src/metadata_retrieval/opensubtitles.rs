//! OpenSubtitles hash lookup over XML-RPC.
use super::xmlrpc::{self, Value};
use super::{
    HashCandidate, HashLookupService, HashSubmission, InsertHashResponse, MetadataRetrievalError,
    ensure_success,
};
use crate::filename_parser::MediaKind;
use once_cell::unsync::OnceCell;
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use tracing::debug;

const STATUS_OK: &str = "200 OK";

/// Hash lookup service backed by the OpenSubtitles XML-RPC endpoint.
///
/// The anonymous session is opened on first use and reused for every later
/// call made through the same provider.
pub(crate) struct OpenSubtitlesProvider {
    client: Client,
    endpoint: String,
    user_agent: String,
    token: OnceCell<String>,
}

impl OpenSubtitlesProvider {
    pub fn new(client: Client, endpoint: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
            token: OnceCell::new(),
        }
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, MetadataRetrievalError> {
        debug!(method, "Calling OpenSubtitles");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .body(xmlrpc::encode_call(method, params))
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        let response = ensure_success(response)?;
        let body = response
            .text()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        Ok(xmlrpc::decode_response(&body)?)
    }

    /// Returns the session token, logging in on first use.
    fn token(&self) -> Result<&str, MetadataRetrievalError> {
        self.token
            .get_or_try_init(|| {
                let response = self.call(
                    "LogIn",
                    &["".into(), "".into(), "en".into(), self.user_agent.as_str().into()],
                )?;
                session_token(&response)
            })
            .map(String::as_str)
    }
}

impl HashLookupService for OpenSubtitlesProvider {
    fn check_hash(&self, hash: &str) -> Result<Vec<HashCandidate>, MetadataRetrievalError> {
        let token = self.token()?;
        let response = self.call(
            "CheckMovieHash2",
            &[token.into(), Value::Array(vec![hash.into()])],
        )?;

        ensure_ok(&response, "CheckMovieHash2")?;
        Ok(hash_candidates(&response, hash))
    }

    fn insert_hash(
        &self,
        submission: &HashSubmission,
    ) -> Result<InsertHashResponse, MetadataRetrievalError> {
        let token = self.token()?;

        let mut entry = BTreeMap::new();
        entry.insert("moviehash".to_string(), Value::from(submission.hash.as_str()));
        entry.insert(
            "moviebytesize".to_string(),
            Value::from(submission.size_bytes.to_string()),
        );
        entry.insert("imdbid".to_string(), Value::from(submission.imdb_id.as_str()));
        entry.insert(
            "movietimems".to_string(),
            Value::from(submission.duration_ms.to_string()),
        );
        entry.insert(
            "moviefilename".to_string(),
            Value::from(submission.filename.as_str()),
        );

        let response = self.call(
            "InsertMovieHash",
            &[token.into(), Value::Array(vec![Value::Struct(entry)])],
        )?;

        Ok(insert_response(&response))
    }
}

fn status_of(response: &Value) -> String {
    response
        .get("status")
        .and_then(Value::to_text)
        .unwrap_or_default()
}

fn ensure_ok(response: &Value, method: &str) -> Result<(), MetadataRetrievalError> {
    let status = status_of(response);
    if status == STATUS_OK {
        Ok(())
    } else {
        Err(MetadataRetrievalError::RequestError(format!(
            "{} returned status '{}'",
            method, status
        )))
    }
}

fn session_token(response: &Value) -> Result<String, MetadataRetrievalError> {
    let status = status_of(response);
    if status != STATUS_OK {
        return Err(MetadataRetrievalError::AuthenticationFailed(status));
    }

    response
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            MetadataRetrievalError::AuthenticationFailed("no token in LogIn response".into())
        })
}

/// Extracts the movie and episode candidates for `hash`.
///
/// OpenSubtitles answers with an empty array instead of a struct when it
/// knows none of the hashes, which reads as "no candidates".
fn hash_candidates(response: &Value, hash: &str) -> Vec<HashCandidate> {
    let Some(entries) = response
        .get("data")
        .and_then(|data| data.get(hash))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries.iter().filter_map(convert_candidate).collect()
}

fn convert_candidate(entry: &Value) -> Option<HashCandidate> {
    let kind = match entry.get("MovieKind").and_then(Value::as_str)? {
        "episode" => MediaKind::Episode,
        "movie" => MediaKind::Movie,
        _ => return None,
    };

    let imdb = entry.get("MovieImdbID").and_then(Value::to_text)?;
    let imdb = imdb.trim().trim_start_matches("tt");
    if imdb.is_empty() {
        return None;
    }

    Some(HashCandidate {
        kind,
        title: entry
            .get("MovieName")
            .and_then(Value::to_text)
            .unwrap_or_default(),
        season: entry.get("SeriesSeason").and_then(Value::as_u32),
        episode: entry.get("SeriesEpisode").and_then(Value::as_u32),
        imdb_id: format!("tt{:0>7}", imdb),
        year: entry
            .get("MovieYear")
            .and_then(Value::to_text)
            .filter(|year| !year.is_empty()),
    })
}

fn insert_response(response: &Value) -> InsertHashResponse {
    let accepted_hashes = response
        .get("data")
        .and_then(|data| data.get("accepted_moviehashes"))
        .and_then(Value::as_array)
        .map(|hashes| hashes.iter().filter_map(Value::to_text).collect())
        .unwrap_or_default();

    InsertHashResponse {
        status: status_of(response),
        accepted_hashes,
    }
}
