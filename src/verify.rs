//! Post-install self-check: ask the binary for its version.

use crate::error::{ResolveError, Result};
use crate::release::Version;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// How long the binary gets to answer `--version`.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

const TEXT_BUSY_RETRIES: u64 = 5;

/// Run `<executable> --version` and require exit status 0 and output that
/// names `version`.
pub async fn check_version(executable: &Path, version: &Version, timeout: Duration) -> Result<()> {
    let fail = |reason: String| ResolveError::Verification {
        path: executable.to_path_buf(),
        reason,
    };

    let output = tokio::time::timeout(timeout, run_version_flag(executable))
        .await
        .map_err(|_| fail(format!("--version did not exit within {:?}", timeout)))?
        .map_err(|e| fail(format!("failed to run: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(path = %executable.display(), stdout = %stdout.trim(), "version check");

    if !output.status.success() {
        return Err(fail(format!(
            "--version exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    if !reports_version(&stdout, version) && !reports_version(&stderr, version) {
        let reported = stdout.trim();
        return Err(fail(format!(
            "expected version {}, binary reported {:?}",
            version,
            if reported.is_empty() { stderr.trim() } else { reported }
        )));
    }

    Ok(())
}

async fn run_version_flag(executable: &Path) -> std::io::Result<Output> {
    let mut attempts = 0;
    loop {
        let result = Command::new(executable)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await;
        match result {
            // A child forked elsewhere in this process may still hold the
            // freshly written file open; ETXTBSY clears once it execs
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempts < TEXT_BUSY_RETRIES => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(20 * attempts)).await;
            }
            other => return other,
        }
    }
}

/// Whether `output` mentions `version` as a whole token.
///
/// `0.1.0` is not considered reported by `0.1.0-alpha` or `10.1.0`.
pub fn reports_version(output: &str, version: &Version) -> bool {
    let needle = version.as_str();
    let is_version_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');

    output.match_indices(needle).any(|(start, _)| {
        let before = output[..start].chars().next_back();
        let after = output[start + needle.len()..].chars().next();
        // a leading 'v' as in "v0.1.0-alpha" is part of the tag, not the version
        let before_ok = match before {
            None => true,
            Some('v') => output[..start]
                .chars()
                .rev()
                .nth(1)
                .is_none_or(|c| !is_version_char(c)),
            Some(c) => !is_version_char(c),
        };
        // a trailing '.' is sentence punctuation only if nothing version-like follows
        let after_ok = match after {
            None => true,
            Some('.') => output[start + needle.len() + 1..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_ascii_alphanumeric()),
            Some(c) => !is_version_char(c),
        };
        before_ok && after_ok
    })
}
