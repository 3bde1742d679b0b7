//! Failure kinds of a single resolve-and-install attempt.
//!
//! Every variant is terminal: the resolver never retries internally. Callers
//! that want a retry policy use [`ResolveError::is_retryable`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Unknown version {requested} (this release table describes {available})")]
    UnknownVersion {
        requested: String,
        available: String,
    },

    #[error("Download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    #[error("Failed to install into {}: {source}", path.display())]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Verification failed for {}: {reason}", path.display())]
    Verification { path: PathBuf, reason: String },

    #[error("Invalid release manifest: {0}")]
    Manifest(String),
}

impl ResolveError {
    /// Whether a caller may reasonably try the same operation again.
    ///
    /// Only transport failures qualify; a checksum mismatch must be treated
    /// as fatal until the table or artifact changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Download { .. })
    }

    /// Short machine-friendly name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UnsupportedPlatform { .. } => "unsupported-platform",
            ResolveError::UnknownVersion { .. } => "unknown-version",
            ResolveError::Download { .. } => "download",
            ResolveError::Integrity { .. } => "integrity",
            ResolveError::ArchiveFormat(_) => "archive-format",
            ResolveError::Install { .. } => "install",
            ResolveError::Verification { .. } => "verification",
            ResolveError::Manifest(_) => "manifest",
        }
    }

    pub fn download(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ResolveError::Download {
            url: url.into(),
            source: source.into(),
        }
    }

    pub(crate) fn install(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolveError::Install {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
