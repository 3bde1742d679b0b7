// Test helpers for isolated testing
// Provides a throwaway bin directory, fake release archives and an
// in-memory fetcher so the install pipeline runs without network access.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use shelp_install::checksum::Sha256Digest;
use shelp_install::config::{CheckSettings, InstallConfig};
use shelp_install::verify::DEFAULT_CHECK_TIMEOUT;
use shelp_install::download::Fetcher;
use shelp_install::platform::PlatformKey;
use shelp_install::release::{ArtifactEntry, ReleaseTable, Version};
use shelp_install::{ResolveError, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEST_VERSION: &str = "0.1.0-alpha";

/// Isolated install target, removed when dropped
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub bin: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let bin = temp_dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        Self { temp_dir, bin }
    }

    pub fn config(&self, platform: PlatformKey) -> InstallConfig {
        InstallConfig::new(platform, Version::parse(TEST_VERSION).unwrap(), &self.bin)
    }

    pub fn check_settings(&self, table: &ReleaseTable) -> CheckSettings {
        CheckSettings {
            table: table.clone(),
            version: Version::parse(TEST_VERSION).unwrap(),
            bin_dir: self.bin.clone(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Sorted file names in the bin directory, hidden files included
    pub fn bin_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.bin)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn installed(&self) -> PathBuf {
        self.bin.join("shelp")
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// A shell script that answers `--version` like the real tool
pub fn fake_binary(reported_version: &str) -> Vec<u8> {
    format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo \"shelp version {}\"\n  exit 0\nfi\nexit 1\n",
        reported_version
    )
    .into_bytes()
}

/// Gzip-tar archive with the given members
pub fn tarball(members: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Release archive shaped like the upstream ones
pub fn release_archive(reported_version: &str) -> Vec<u8> {
    let binary = fake_binary(reported_version);
    tarball(&[("shelp", binary.as_slice()), ("LICENSE", b"MIT".as_slice())])
}

pub fn artifact_url(key: PlatformKey) -> String {
    format!(
        "https://releases.example.com/shelp/v{}/shelp-{}.tar.gz",
        TEST_VERSION,
        key.slug()
    )
}

/// Release table whose every entry expects `digest`
pub fn table_with_digest(digest: Sha256Digest) -> ReleaseTable {
    let entries: HashMap<PlatformKey, ArtifactEntry> = PlatformKey::supported()
        .map(|key| {
            (
                key,
                ArtifactEntry {
                    url: artifact_url(key),
                    sha256: digest,
                },
            )
        })
        .collect();
    ReleaseTable::new("shelp", Version::parse(TEST_VERSION).unwrap(), entries).unwrap()
}

/// Release table matching `archive` on every platform
pub fn table_for(archive: &[u8]) -> ReleaseTable {
    table_with_digest(Sha256Digest::compute(archive))
}

/// Fetcher serving canned responses and recording every request
#[derive(Default)]
pub struct MemoryFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for every supported platform URL
    pub fn serving_all(body: &[u8]) -> Self {
        let mut fetcher = Self::new();
        for key in PlatformKey::supported() {
            fetcher.responses.insert(artifact_url(key), body.to_vec());
        }
        fetcher
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::download(url, "HTTP status 404 Not Found"))
    }
}

pub fn assert_unchanged(path: &Path, contents: &[u8]) {
    assert_eq!(
        std::fs::read(path).expect("previous binary should still be readable"),
        contents
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_bin_dir() {
        let env = TestEnvironment::new();
        assert!(env.bin.is_dir());
        assert!(env.bin_entries().is_empty());
    }

    #[test]
    fn test_environment_cleanup() {
        let bin = {
            let env = TestEnvironment::new();
            env.bin.clone()
        };
        assert!(!bin.exists());
    }

    #[test]
    fn test_table_for_archive_digest() {
        let archive = release_archive(TEST_VERSION);
        let table = table_for(&archive);
        for (_, entry) in table.entries() {
            assert_eq!(entry.sha256, Sha256Digest::compute(&archive));
        }
    }
}
