//! Installer configuration.
//!
//! An [`InstallConfig`] is built once, from command-line values falling back
//! to environment variables and then to defaults, and passed by reference
//! into the resolver. Nothing reads the environment after that.
//!
//! | Setting   | Flag          | Environment              | Default                         |
//! |-----------|---------------|--------------------------|---------------------------------|
//! | bin dir   | `--bin-dir`   | `SHELP_INSTALL_DIR`      | `$HOMEBREW_PREFIX/bin`, else `<arch prefix>/bin` |
//! | version   | `--release`   | `SHELP_VERSION`          | latest known release            |
//! | manifest  | `--manifest`  | `SHELP_INSTALL_MANIFEST` | builtin release table           |
//! | platform  | `--platform`  |                          | detected                        |

use crate::error::{ResolveError, Result};
use crate::platform::PlatformKey;
use crate::release::{ReleaseTable, Version};
use crate::verify::DEFAULT_CHECK_TIMEOUT;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BIN_DIR: &str = "SHELP_INSTALL_DIR";
pub const ENV_VERSION: &str = "SHELP_VERSION";
pub const ENV_MANIFEST: &str = "SHELP_INSTALL_MANIFEST";

/// Everything one install run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub platform: PlatformKey,
    pub version: Version,
    pub bin_dir: PathBuf,
    /// Limit for the post-install `--version` run.
    pub check_timeout: Duration,
}

impl InstallConfig {
    pub fn new(platform: PlatformKey, version: Version, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            version,
            bin_dir: bin_dir.into(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }
}

/// Values supplied explicitly (usually from the command line).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub platform: Option<PlatformKey>,
    pub version: Option<String>,
    pub bin_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Resolved configuration sources.
#[derive(Debug)]
pub struct Settings {
    pub table: ReleaseTable,
    pub config: InstallConfig,
}

impl Settings {
    /// Resolve settings against the process environment.
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings against an arbitrary variable lookup.
    ///
    /// Empty environment values are treated as unset.
    pub fn resolve<E>(overrides: Overrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let platform = overrides.platform;
        let check = CheckSettings::resolve(overrides, env)?;
        let platform = match platform {
            Some(p) => p,
            None => PlatformKey::detect()?,
        };

        Ok(Self {
            config: InstallConfig {
                platform,
                version: check.version,
                bin_dir: check.bin_dir,
                check_timeout: check.check_timeout,
            },
            table: check.table,
        })
    }
}

/// Settings for checking an existing install.
///
/// Unlike [`Settings`] this never detects the platform: running the
/// installed binary works on any host.
#[derive(Debug)]
pub struct CheckSettings {
    pub table: ReleaseTable,
    pub version: Version,
    pub bin_dir: PathBuf,
    pub check_timeout: Duration,
}

impl CheckSettings {
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve everything except the platform; `overrides.platform` is ignored.
    pub fn resolve<E>(overrides: Overrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let table = release_table(overrides.manifest, &env)?;

        let version = match overrides.version.or_else(|| env(ENV_VERSION)) {
            Some(v) => Version::parse(&v).map_err(|_| ResolveError::UnknownVersion {
                requested: v.clone(),
                available: table.version().to_string(),
            })?,
            None => table.version().clone(),
        };

        let bin_dir = overrides
            .bin_dir
            .or_else(|| env(ENV_BIN_DIR).map(PathBuf::from))
            .unwrap_or_else(|| default_bin_dir(env("HOMEBREW_PREFIX").as_deref()));

        Ok(Self {
            table,
            version,
            bin_dir,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        })
    }
}

/// Load the release table named by `manifest`, or by the manifest
/// environment variable, falling back to the builtin table.
pub fn release_table<E>(manifest: Option<PathBuf>, env: E) -> Result<ReleaseTable>
where
    E: Fn(&str) -> Option<String>,
{
    let manifest = manifest.or_else(|| {
        env(ENV_MANIFEST)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    match manifest {
        Some(path) => ReleaseTable::load(&path),
        None => Ok(ReleaseTable::builtin()),
    }
}

/// Default bin directory: the package-manager prefix when one is
/// configured, otherwise the conventional prefix for this architecture.
pub fn default_bin_dir(homebrew_prefix: Option<&str>) -> PathBuf {
    if let Some(prefix) = homebrew_prefix {
        return Path::new(prefix).join("bin");
    }

    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    {
        PathBuf::from("/opt/homebrew/bin")
    }
    #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
    {
        PathBuf::from("/usr/local/bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, OsFamily};
    use std::collections::HashMap;

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn linux_arm() -> Overrides {
        Overrides {
            platform: Some(PlatformKey::new(OsFamily::Linux, Arch::Arm64)),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_use_builtin_table() {
        let settings = Settings::resolve(linux_arm(), env_from(&[])).unwrap();
        assert_eq!(settings.config.version.as_str(), "0.1.0-alpha");
        assert_eq!(settings.table.version().as_str(), "0.1.0-alpha");
        assert_eq!(settings.config.bin_dir, default_bin_dir(None));
        assert_eq!(settings.config.check_timeout, DEFAULT_CHECK_TIMEOUT);
    }

    #[test]
    fn test_environment_fills_gaps() {
        let env = env_from(&[
            (ENV_BIN_DIR, "/tmp/shelp-bin"),
            (ENV_VERSION, "v0.1.0-alpha"),
        ]);
        let settings = Settings::resolve(linux_arm(), env).unwrap();
        assert_eq!(settings.config.bin_dir, PathBuf::from("/tmp/shelp-bin"));
        assert_eq!(settings.config.version.as_str(), "0.1.0-alpha");
    }

    #[test]
    fn test_flags_beat_environment() {
        let env = env_from(&[(ENV_BIN_DIR, "/from/env"), (ENV_VERSION, "9.9.9")]);
        let overrides = Overrides {
            bin_dir: Some(PathBuf::from("/from/flag")),
            version: Some("1.0.0".into()),
            ..linux_arm()
        };
        let settings = Settings::resolve(overrides, env).unwrap();
        assert_eq!(settings.config.bin_dir, PathBuf::from("/from/flag"));
        assert_eq!(settings.config.version.as_str(), "1.0.0");
    }

    #[test]
    fn test_homebrew_prefix_and_empty_values() {
        let env = env_from(&[(ENV_BIN_DIR, "  "), ("HOMEBREW_PREFIX", "/home/linuxbrew/.linuxbrew")]);
        let settings = Settings::resolve(linux_arm(), env).unwrap();
        assert_eq!(
            settings.config.bin_dir,
            PathBuf::from("/home/linuxbrew/.linuxbrew/bin")
        );
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let env = env_from(&[(ENV_MANIFEST, "/definitely/not/here.json")]);
        let err = Settings::resolve(linux_arm(), env).unwrap_err();
        assert_eq!(err.kind(), "manifest");
    }

    #[test]
    fn test_release_table_without_platform_detection() {
        let table = release_table(None, env_from(&[])).unwrap();
        assert_eq!(table.version().as_str(), "0.1.0-alpha");
        assert!(release_table(Some(PathBuf::from("/no/such/manifest.json")), env_from(&[])).is_err());
    }

    #[test]
    fn test_invalid_version_is_error() {
        let overrides = Overrides {
            version: Some("1.0 final".into()),
            ..linux_arm()
        };
        let err = Settings::resolve(overrides, env_from(&[])).unwrap_err();
        assert_eq!(err.kind(), "unknown-version");
    }

    #[test]
    fn test_check_settings_skip_platform_detection() {
        let env = env_from(&[(ENV_BIN_DIR, "/opt/shelp/bin")]);
        let check = CheckSettings::resolve(Overrides::default(), env).unwrap();
        assert_eq!(check.bin_dir, PathBuf::from("/opt/shelp/bin"));
        assert_eq!(check.version.as_str(), "0.1.0-alpha");
        assert_eq!(check.check_timeout, DEFAULT_CHECK_TIMEOUT);
    }
}
