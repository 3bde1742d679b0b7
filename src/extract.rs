//! Pulling the executable out of a release archive.
//!
//! Release artifacts are gzip-compressed tarballs. Only one member matters:
//! the regular file named after the tool. Its location inside the archive is
//! not fixed, so any depth is accepted:
//!
//! ```text
//! shelp-linux-amd64.tar.gz
//!   shelp                      <- matched
//!   README.md
//!
//! shelp-darwin-arm64.tar.gz
//!   shelp-darwin-arm64/
//!     shelp                    <- matched
//!     LICENSE
//! ```
//!
//! Nothing is written to disk here; the member is returned as bytes so the
//! installer decides where and how it lands.

use crate::error::{ResolveError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tar::{Archive, EntryType};
use tracing::debug;

/// Largest executable accepted from an archive.
pub const MAX_MEMBER_BYTES: u64 = 512 * 1024 * 1024;

/// Extract the member named `tool` from a `.tar.gz` archive held in memory.
///
/// # Errors
///
/// Returns [`ResolveError::ArchiveFormat`] if the data is not a gzip-tar
/// stream, if no regular file called `tool` is present, if the archive holds
/// more than one such file, or if its header claims more than
/// [`MAX_MEMBER_BYTES`].
pub fn extract_executable(archive_bytes: &[u8], tool: &str) -> Result<Vec<u8>> {
    let decoder = GzDecoder::new(archive_bytes);
    let mut archive = Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| ResolveError::ArchiveFormat(format!("cannot read archive: {}", e)))?;

    let mut found: Option<Vec<u8>> = None;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| ResolveError::ArchiveFormat(format!("corrupt entry: {}", e)))?;

        let entry_type = entry.header().entry_type();
        if !matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| ResolveError::ArchiveFormat(format!("invalid member path: {}", e)))?
            .into_owned();
        if path.file_name().and_then(|n| n.to_str()) != Some(tool) {
            continue;
        }

        if found.is_some() {
            return Err(ResolveError::ArchiveFormat(format!(
                "more than one '{}' member in archive",
                tool
            )));
        }

        let claimed = entry.size();
        if claimed > MAX_MEMBER_BYTES {
            return Err(ResolveError::ArchiveFormat(format!(
                "member {} claims {} bytes, limit is {}",
                path.display(),
                claimed,
                MAX_MEMBER_BYTES
            )));
        }

        // The header size is untrusted; let the buffer grow with the data
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(|e| {
            ResolveError::ArchiveFormat(format!("truncated member {}: {}", path.display(), e))
        })?;
        debug!(member = %path.display(), bytes = contents.len(), "found executable in archive");
        found = Some(contents);
    }

    found.ok_or_else(|| ResolveError::ArchiveFormat(format!("no '{}' member in archive", tool)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn tarball(members: &[(&str, &[u8])]) -> Vec<u8> {
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

    #[test]
    fn test_extracts_top_level_member() {
        let archive = tarball(&[("README.md", b"docs"), ("shelp", b"binary")]);
        assert_eq!(extract_executable(&archive, "shelp").unwrap(), b"binary");
    }

    #[test]
    fn test_extracts_nested_member() {
        let archive = tarball(&[("shelp-linux-arm64/shelp", b"nested")]);
        assert_eq!(extract_executable(&archive, "shelp").unwrap(), b"nested");
    }

    #[test]
    fn test_similar_names_do_not_match() {
        let archive = tarball(&[("shelp.sig", b"sig"), ("bin/shelpd", b"other")]);
        let err = extract_executable(&archive, "shelp").unwrap_err();
        assert!(matches!(err, ResolveError::ArchiveFormat(_)));
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let archive = tarball(&[("a/shelp", b"one"), ("b/shelp", b"two")]);
        assert!(matches!(
            extract_executable(&archive, "shelp"),
            Err(ResolveError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_garbage_is_archive_error() {
        assert!(matches!(
            extract_executable(b"definitely not gzip", "shelp"),
            Err(ResolveError::ArchiveFormat(_))
        ));
        assert!(matches!(
            extract_executable(&[], "shelp"),
            Err(ResolveError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_truncated_archive_is_archive_error() {
        let archive = tarball(&[("shelp", &[7u8; 4096])]);
        let cut = &archive[..archive.len() / 2];
        assert!(matches!(
            extract_executable(cut, "shelp"),
            Err(ResolveError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_oversized_header_is_archive_error() {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(1 << 50);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "shelp", [0u8; 1024].as_slice())
            .unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        match extract_executable(&archive, "shelp") {
            Err(ResolveError::ArchiveFormat(msg)) => assert!(msg.contains("limit"), "{}", msg),
            other => panic!("expected archive error, got {:?}", other.map(|v| v.len())),
        }
    }
}
