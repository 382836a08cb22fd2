/// Replacement of `URL:` placeholders with fetched content.
use std::fmt;

use base64::{Engine, engine::general_purpose};
use serde::Deserialize;

use super::fetcher::{ContentFetcher, FetchError};
use crate::db::Database;
use crate::models::ResolutionSummary;
use crate::notes::{self, PendingContent};

/// Media type used to request the Binary resource itself.
pub const FHIR_JSON: &str = "application/fhir+json";

/// Content type assumed when the Binary resource does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Media types tried in order when negotiation fails.
pub const PROBE_CONTENT_TYPES: [&str; 7] = [
    "application/pdf",
    "text/plain",
    "text/html",
    "image/jpeg",
    "image/png",
    "application/xml",
    "application/octet-stream",
];

/// Lifecycle of one placeholder version during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Pending,
    Resolving,
    Resolved { content_type: String },
    /// Left as a placeholder; a later run retries it.
    Failed,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Resolving => f.write_str("resolving"),
            Self::Resolved { content_type } => write!(f, "resolved ({content_type})"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Payload obtained for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinaryMetadata {
    content_type: Option<String>,
}

/// Fetches remote content for placeholder versions and stores it.
///
/// Only the stored `note_text` and `content_type` of the existing version
/// change; no version is added.
pub struct ContentResolver<'a, F> {
    db: &'a Database,
    fetcher: F,
}

impl<'a, F: ContentFetcher> ContentResolver<'a, F> {
    pub fn new(db: &'a Database, fetcher: F) -> Self {
        Self { db, fetcher }
    }

    /// Asks for the Binary resource, then for its payload in the declared type.
    pub fn negotiate(&self, url: &str) -> Result<ResolvedContent, FetchError> {
        let metadata = self.fetcher.fetch(url, FHIR_JSON)?;
        let metadata: BinaryMetadata =
            serde_json::from_slice(&metadata).map_err(FetchError::Metadata)?;
        let content_type = metadata
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bytes = self.fetch_payload(url, &content_type)?;
        Ok(ResolvedContent {
            bytes,
            content_type,
        })
    }

    /// Tries each of [`PROBE_CONTENT_TYPES`] and keeps the first success.
    pub fn probe(&self, url: &str) -> Option<ResolvedContent> {
        PROBE_CONTENT_TYPES.iter().find_map(|&content_type| {
            match self.fetch_payload(url, content_type) {
                Ok(bytes) => Some(ResolvedContent {
                    bytes,
                    content_type: content_type.to_string(),
                }),
                Err(e) => {
                    tracing::debug!(url, content_type, error = %e, "probe failed");
                    None
                }
            }
        })
    }

    /// Negotiates, then falls back to probing.
    pub fn fetch_content(&self, url: &str) -> Option<ResolvedContent> {
        match self.negotiate(url) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::warn!(url, error = %e, "content negotiation failed, probing media types");
                self.probe(url)
            }
        }
    }

    /// Fetches a payload; an empty body is a failure.
    fn fetch_payload(&self, url: &str, accept: &str) -> Result<Vec<u8>, FetchError> {
        let bytes = self.fetcher.fetch(url, accept)?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(bytes)
    }

    /// Resolves one placeholder version and stores the result.
    pub fn resolve_version(&self, pending: &PendingContent) -> ResolutionState {
        tracing::debug!(
            note = %pending.note_id,
            version = %pending.version_id,
            state = %ResolutionState::Resolving,
            url = %pending.url,
            "resolving content"
        );

        let Some(content) = self.fetch_content(&pending.url) else {
            tracing::error!(url = %pending.url, "failed to fetch content with any media type");
            return ResolutionState::Failed;
        };

        let encoded = general_purpose::STANDARD.encode(&content.bytes);
        let stored = self.db.with_transaction(|conn| {
            notes::update_version_content(conn, pending.version_id, &encoded, &content.content_type)
        });

        match stored {
            Ok(true) => ResolutionState::Resolved {
                content_type: content.content_type,
            },
            Ok(false) => {
                tracing::error!(version = %pending.version_id, "version disappeared before update");
                ResolutionState::Failed
            }
            Err(e) => {
                tracing::error!(version = %pending.version_id, error = %e, "failed to store content");
                ResolutionState::Failed
            }
        }
    }

    /// Resolves every version whose text is still a `URL:` placeholder.
    ///
    /// Failures are counted and left pending, so rerunning retries only them.
    pub fn resolve_pending(&self) -> rusqlite::Result<ResolutionSummary> {
        let pending = notes::pending_content(self.db.connection())?;
        tracing::info!(count = pending.len(), "found notes with URL references");

        let mut summary = ResolutionSummary {
            pending: pending.len(),
            ..Default::default()
        };

        for item in &pending {
            tracing::info!(note = %item.note_id, version = %item.version_id, url = %item.url, "processing URL reference");

            match self.resolve_version(item) {
                ResolutionState::Resolved { content_type } => {
                    tracing::debug!(version = %item.version_id, %content_type, "resolved");
                    summary.resolved += 1;
                }
                state => {
                    tracing::debug!(version = %item.version_id, %state, "not resolved");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            resolved = summary.resolved,
            failed = summary.failed,
            "completed processing URL references"
        );
        Ok(summary)
    }
}
