//! Release tables: which archive to download for each platform.
//!
//! A [`ReleaseTable`] is an immutable snapshot of one release. It maps every
//! supported [`PlatformKey`] to exactly one [`ArtifactEntry`] and is either
//! built from the upstream URL template ([`ReleaseTable::builtin`]) or loaded
//! from a JSON manifest:
//!
//! ```text
//! {
//!   "tool": "shelp",
//!   "version": "0.1.0-alpha",
//!   "artifacts": {
//!     "darwin-amd64": { "url": "https://…/v0.1.0-alpha/shelp-darwin-amd64.tar.gz", "sha256": "…" },
//!     "darwin-arm64": { … },
//!     "linux-amd64":  { … },
//!     "linux-arm64":  { … }
//!   }
//! }
//! ```
//!
//! Construction validates the table, so a `ReleaseTable` value is always
//! complete and consistent with its version.

use crate::checksum::Sha256Digest;
use crate::error::{ResolveError, Result};
use crate::platform::PlatformKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Name of the executable shipped in every artifact.
pub const TOOL_NAME: &str = "shelp";

/// Latest release known to this installer.
pub const LATEST_VERSION: &str = "0.1.0-alpha";

const RELEASE_BASE_URL: &str = "https://github.com/xqsit94/shelp/releases/download";

/// A release version such as `0.1.0-alpha`.
///
/// Stored without the `v` prefix used by release tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if bare.is_empty() {
            return Err(ResolveError::Manifest("version must not be empty".into()));
        }
        if bare.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ResolveError::Manifest(format!(
                "version {:?} contains whitespace or '/'",
                s
            )));
        }
        Ok(Self(bare.to_string()))
    }

    pub fn latest() -> Self {
        Self(LATEST_VERSION.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Release tag for this version, e.g. `v0.1.0-alpha`.
    pub fn tag(&self) -> String {
        format!("v{}", self.0)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = ResolveError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.0
    }
}

/// Download location and expected digest of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub url: String,
    pub sha256: Sha256Digest,
}

/// On-disk manifest shape; validated into a [`ReleaseTable`].
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    #[serde(default = "default_tool")]
    tool: String,
    version: Version,
    artifacts: BTreeMap<String, ArtifactEntry>,
}

fn default_tool() -> String {
    TOOL_NAME.to_string()
}

/// Immutable mapping from platform to artifact for a single release.
#[derive(Debug, Clone)]
pub struct ReleaseTable {
    tool: String,
    version: Version,
    entries: HashMap<PlatformKey, ArtifactEntry>,
}

impl ReleaseTable {
    /// Build and validate a table.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Manifest`] if a supported platform has no
    /// entry, or an entry's URL does not carry the release tag and the
    /// platform's OS and architecture tokens.
    pub fn new(
        tool: impl Into<String>,
        version: Version,
        entries: HashMap<PlatformKey, ArtifactEntry>,
    ) -> Result<Self> {
        let tool = tool.into();
        if tool.is_empty() || tool.contains(['/', '\\']) || tool.starts_with('.') {
            return Err(ResolveError::Manifest(format!(
                "tool name {:?} is not a plain file name",
                tool
            )));
        }

        for key in PlatformKey::supported() {
            let entry = entries
                .get(&key)
                .ok_or_else(|| ResolveError::Manifest(format!("no artifact for {}", key)))?;
            validate_url(&entry.url, &version, key)?;
        }

        Ok(Self {
            tool,
            version,
            entries,
        })
    }

    /// The table shipped with this installer, mirroring the upstream formula.
    ///
    /// Upstream has not published digests for this release yet, so every
    /// entry carries [`Sha256Digest::PLACEHOLDER`]; installing from it fails
    /// the integrity check until a manifest with real digests is supplied.
    pub fn builtin() -> Self {
        let version = Version::latest();
        let entries = PlatformKey::supported()
            .map(|key| {
                let entry = ArtifactEntry {
                    url: artifact_url(TOOL_NAME, &version, key),
                    sha256: Sha256Digest::PLACEHOLDER,
                };
                (key, entry)
            })
            .collect();
        Self {
            tool: TOOL_NAME.to_string(),
            version,
            entries,
        }
    }

    /// Parse a JSON manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| ResolveError::Manifest(e.to_string()))?;

        let mut entries = HashMap::with_capacity(manifest.artifacts.len());
        for (slug, entry) in manifest.artifacts {
            let key: PlatformKey = slug.parse().map_err(|_| {
                ResolveError::Manifest(format!("unknown platform {:?} in manifest", slug))
            })?;
            if entries.insert(key, entry).is_some() {
                return Err(ResolveError::Manifest(format!(
                    "platform {} listed more than once",
                    key
                )));
            }
        }

        Self::new(manifest.tool, manifest.version, entries)
    }

    /// Read and parse a JSON manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ResolveError::Manifest(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Serialize back to the manifest format.
    pub fn to_json(&self) -> Result<String> {
        let manifest = Manifest {
            tool: self.tool.clone(),
            version: self.version.clone(),
            artifacts: self
                .entries
                .iter()
                .map(|(key, entry)| (key.slug(), entry.clone()))
                .collect(),
        };
        serde_json::to_string_pretty(&manifest).map_err(|e| ResolveError::Manifest(e.to_string()))
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Look up the artifact for a platform.
    pub fn lookup(&self, key: PlatformKey) -> Result<&ArtifactEntry> {
        self.entries
            .get(&key)
            .ok_or_else(|| ResolveError::UnsupportedPlatform {
                os: key.os.token().to_string(),
                arch: key.arch.token().to_string(),
            })
    }

    /// All entries, ordered by platform.
    pub fn entries(&self) -> Vec<(PlatformKey, &ArtifactEntry)> {
        let mut all: Vec<_> = self.entries.iter().map(|(k, e)| (*k, e)).collect();
        all.sort_by_key(|(k, _)| *k);
        all
    }
}

/// Upstream download URL for one platform.
pub fn artifact_url(tool: &str, version: &Version, key: PlatformKey) -> String {
    format!(
        "{}/{}/{}-{}-{}.tar.gz",
        RELEASE_BASE_URL,
        version.tag(),
        tool,
        key.os.token(),
        key.arch.token()
    )
}

fn validate_url(url: &str, version: &Version, key: PlatformKey) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ResolveError::Manifest(format!(
            "{}: url {} is not http(s)",
            key, url
        )));
    }
    let tag = version.tag();
    if !url.split('/').any(|segment| segment == tag) {
        return Err(ResolveError::Manifest(format!(
            "{}: url {} does not reference release {}",
            key,
            url,
            tag
        )));
    }
    let file_name = url.rsplit('/').next().unwrap_or_default();
    if !file_name.contains(key.os.token()) || !file_name.contains(key.arch.token()) {
        return Err(ResolveError::Manifest(format!(
            "{}: file name {} does not match the platform",
            key, file_name
        )));
    }
    Ok(())
}
