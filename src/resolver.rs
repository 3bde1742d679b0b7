//! The resolve-and-install pipeline.
//!
//! One call to [`Resolver::install`] runs these steps in order and stops at
//! the first failure:
//!
//! 1. **Resolve**: look up the artifact for the platform and version. No
//!    network access happens if this fails.
//! 2. **Fetch** the archive bytes.
//! 3. **Verify** their SHA-256 against the table. Mismatching bytes are
//!    dropped without touching the bin directory.
//! 4. **Extract** the executable member.
//! 5. **Stage** it as a hidden executable file inside the bin directory.
//! 6. **Self-check** the staged file with `--version`.
//! 7. **Commit** by renaming it over `<bin_dir>/<tool>`.
//!
//! Because the self-check runs before the rename, a failing binary never
//! replaces an existing install, and the staged file is removed on every
//! error path. The resolver never retries; see
//! [`ResolveError::is_retryable`](crate::error::ResolveError::is_retryable).
//!
//! # Examples
//!
//! ```no_run
//! use shelp_install::config::InstallConfig;
//! use shelp_install::download::{HttpFetcher, DEFAULT_TIMEOUT};
//! use shelp_install::platform::PlatformKey;
//! use shelp_install::release::{ReleaseTable, Version};
//! use shelp_install::resolver::Resolver;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let table = ReleaseTable::load("release.json".as_ref())?;
//!     let resolver = Resolver::new(table, HttpFetcher::new(DEFAULT_TIMEOUT)?);
//!     let config = InstallConfig::new(PlatformKey::detect()?, Version::latest(), "/usr/local/bin");
//!
//!     let report = resolver.install(&config).await?;
//!     println!("Installed {}", report.path.display());
//!     Ok(())
//! }
//! ```

use crate::checksum::{self, Sha256Digest};
use crate::config::{CheckSettings, InstallConfig};
use crate::download::Fetcher;
use crate::error::{ResolveError, Result};
use crate::platform::PlatformKey;
use crate::release::{ArtifactEntry, ReleaseTable, Version};
use crate::{extract, install, verify};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub platform: PlatformKey,
    pub version: Version,
    pub url: String,
    pub sha256: Sha256Digest,
    /// Final location of the executable.
    pub path: PathBuf,
    /// Size of the installed executable.
    pub bytes: u64,
}

pub struct Resolver<F> {
    table: ReleaseTable,
    fetcher: F,
}

impl<F: Fetcher> Resolver<F> {
    pub fn new(table: ReleaseTable, fetcher: F) -> Self {
        Self { table, fetcher }
    }

    pub fn table(&self) -> &ReleaseTable {
        &self.table
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Select the artifact for a platform and version without any I/O.
    pub fn resolve(&self, platform: PlatformKey, version: &Version) -> Result<&ArtifactEntry> {
        resolve(&self.table, platform, version)
    }

    /// Run the full pipeline described in the module docs.
    pub async fn install(&self, config: &InstallConfig) -> Result<InstallReport> {
        let entry = self.resolve(config.platform, &config.version)?;
        let tool = self.table.tool();

        install::ensure_bin_dir(&config.bin_dir)?;

        info!(url = %entry.url, "fetching {} {}", tool, config.version);
        let archive = self.fetcher.fetch(&entry.url).await?;

        checksum::verify(&archive, &entry.sha256, &entry.url)?;
        debug!(sha256 = %entry.sha256, "checksum verified");

        let executable = extract::extract_executable(&archive, tool)?;
        drop(archive);

        let staged = install::stage(&config.bin_dir, tool, &executable)?;
        verify::check_version(staged.path(), &config.version, config.check_timeout).await?;
        let path = staged.commit()?;

        info!(path = %path.display(), "installed {} {}", tool, config.version);
        Ok(InstallReport {
            platform: config.platform,
            version: config.version.clone(),
            url: entry.url.clone(),
            sha256: entry.sha256,
            path,
            bytes: executable.len() as u64,
        })
    }
}

/// Select the artifact for a platform and version from a table.
pub fn resolve<'a>(
    table: &'a ReleaseTable,
    platform: PlatformKey,
    version: &Version,
) -> Result<&'a ArtifactEntry> {
    if version != table.version() {
        return Err(ResolveError::UnknownVersion {
            requested: version.to_string(),
            available: table.version().to_string(),
        });
    }

    let entry = table.lookup(platform)?;
    if entry.sha256.is_placeholder() {
        warn!(
            %platform,
            "release table has no published checksum for this platform; the download will fail verification"
        );
    }
    debug!(%platform, url = %entry.url, "resolved artifact");
    Ok(entry)
}

/// Self-check the binary already installed in `settings.bin_dir`.
pub async fn check_installed(settings: &CheckSettings) -> Result<PathBuf> {
    let path = settings.bin_dir.join(settings.table.tool());
    verify::check_version(&path, &settings.version, settings.check_timeout).await?;
    Ok(path)
}
