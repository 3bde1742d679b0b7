//! Atomic placement of the executable into the bin directory.
//!
//! Installation is split in two steps so the caller can inspect the file
//! before it becomes visible under its final name:
//!
//! 1. [`stage`] writes the bytes to a hidden temporary file *in the target
//!    directory* (`.shelp.XXXXXX.tmp`), flushes it to disk and marks it
//!    executable.
//! 2. [`StagedExecutable::commit`] renames it over `<bin_dir>/<tool>`.
//!
//! Because the rename happens within one directory it is atomic: anyone
//! executing `<bin_dir>/<tool>` sees either the previous binary or the new
//! one, never a partial write. Dropping a [`StagedExecutable`] without
//! committing deletes the temporary file; if the process dies between the two
//! steps only the hidden temporary is left behind.

use crate::error::{ResolveError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Permission bits of an installed executable.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// An executable written to a temporary path next to its final location.
#[derive(Debug)]
pub struct StagedExecutable {
    temp: TempPath,
    target: PathBuf,
}

/// Make sure `bin_dir` exists and is a directory.
pub fn ensure_bin_dir(bin_dir: &Path) -> Result<()> {
    let metadata = fs::metadata(bin_dir).map_err(|e| ResolveError::install(bin_dir, e))?;
    if !metadata.is_dir() {
        return Err(ResolveError::install(
            bin_dir,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }
    Ok(())
}

/// Write `contents` to a temporary executable inside `bin_dir`.
pub fn stage(bin_dir: &Path, tool: &str, contents: &[u8]) -> Result<StagedExecutable> {
    ensure_bin_dir(bin_dir)?;

    let prefix = format!(".{}.", tool);
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(bin_dir)
        .map_err(|e| ResolveError::install(bin_dir, e))?;

    let staged_path = file.path().to_path_buf();
    file.write_all(contents)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| ResolveError::install(&staged_path, e))?;
    set_executable(file.as_file()).map_err(|e| ResolveError::install(&staged_path, e))?;

    // Close the write handle; executing a file that is still open for
    // writing fails with ETXTBSY on Linux
    let temp = file.into_temp_path();
    debug!(path = %staged_path.display(), bytes = contents.len(), "staged executable");

    Ok(StagedExecutable {
        temp,
        target: bin_dir.join(tool),
    })
}

impl StagedExecutable {
    /// Current (temporary) location of the staged file.
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Final location the file will be renamed to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically rename the staged file into place.
    pub fn commit(self) -> Result<PathBuf> {
        let StagedExecutable { temp, target } = self;
        temp.persist(&target)
            .map_err(|e| ResolveError::install(&target, e.error))?;

        if let Some(dir) = target.parent() {
            sync_dir(dir);
        }
        debug!(path = %target.display(), "installed executable");
        Ok(target)
    }
}

#[cfg(unix)]
fn set_executable(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn set_executable(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Persist the rename itself. Failure only weakens crash durability, the
/// rename has already happened.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "failed to sync bin directory");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
