//! Artifact download with progress tracking
//!
//! The resolver only needs "give me the bytes behind this URL", expressed by
//! the [`Fetcher`] trait. [`HttpFetcher`] is the real implementation; tests
//! substitute an in-memory one.

use crate::error::{ResolveError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Default overall timeout for one artifact download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest artifact accepted; release tarballs are a few megabytes.
pub const MAX_ARTIFACT_BYTES: u64 = 512 * 1024 * 1024;

// Upper bound on the buffer reserved up front from Content-Length.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Source of artifact bytes.
///
/// Implementations must report every transport problem (DNS, timeout,
/// non-2xx status, truncated body) as [`ResolveError::Download`].
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP(S) fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shelp-install/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::download("<client>", e))?;
        Ok(Self {
            client,
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr while downloading.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, url: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .ok()?
            .progress_chars("#>-");
        pb.set_style(style);
        let name = url.rsplit('/').next().unwrap_or(url);
        pb.set_message(format!("⬇ {}", name));
        Some(pb)
    }
}

impl HttpFetcher {
    async fn download(&self, url: &str, pb: Option<&ProgressBar>) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolveError::download(url, e))?;

        let expected = response.content_length();
        if let Some(total) = expected {
            if total > MAX_ARTIFACT_BYTES {
                return Err(ResolveError::download(
                    url,
                    format!(
                        "artifact is {} bytes, limit is {}",
                        total, MAX_ARTIFACT_BYTES
                    ),
                ));
            }
            if let Some(pb) = pb {
                pb.set_length(total);
            }
        }

        let mut body = Vec::with_capacity(expected.unwrap_or(0).min(MAX_PREALLOC) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ResolveError::download(url, e))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > MAX_ARTIFACT_BYTES {
                return Err(ResolveError::download(
                    url,
                    format!("artifact exceeds {} bytes", MAX_ARTIFACT_BYTES),
                ));
            }
            if let Some(pb) = pb {
                pb.set_position(body.len() as u64);
            }
        }

        if let Some(total) = expected {
            if body.len() as u64 != total {
                return Err(ResolveError::download(
                    url,
                    format!("connection closed after {} of {} bytes", body.len(), total),
                ));
            }
        }

        Ok(body)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading artifact");
        let pb = self.progress_bar(url);
        let result = self.download(url, pb.as_ref()).await;

        // Clear the bar whether or not the transfer finished
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        let body = result?;
        debug!(url, bytes = body.len(), "download complete");
        Ok(body)
    }
}
