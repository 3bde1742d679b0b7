//! Platform detection for selecting the correct release artifact.
//!
//! Releases are published once per (OS family, CPU architecture) pair and the
//! archive names carry the pair as `<os>-<arch>` tokens:
//! - **OS families**: `darwin` (macOS), `linux`
//! - **Architectures**: `amd64` (x86_64), `arm64` (aarch64)
//!
//! Anything outside those four combinations has no artifact and is rejected
//! before the network is touched.
//!
//! # Examples
//!
//! ```no_run
//! use shelp_install::platform::PlatformKey;
//!
//! fn main() -> anyhow::Result<()> {
//!     let key = PlatformKey::detect()?;
//!     println!("This system needs: {}", key);
//!     // Output: "darwin-arm64" on an Apple Silicon Mac
//!     // Output: "linux-amd64" on an x86_64 Linux host
//!
//!     Ok(())
//! }
//! ```

use crate::error::{ResolveError, Result};
use std::fmt;
use std::str::FromStr;

/// Operating system family an artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsFamily {
    MacOs,
    Linux,
}

impl OsFamily {
    pub const ALL: [OsFamily; 2] = [OsFamily::MacOs, OsFamily::Linux];

    /// Token used in release file names.
    pub fn token(self) -> &'static str {
        match self {
            OsFamily::MacOs => "darwin",
            OsFamily::Linux => "linux",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "osx" => Some(OsFamily::MacOs),
            "linux" => Some(OsFamily::Linux),
            _ => None,
        }
    }
}

/// CPU architecture an artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::Amd64, Arch::Arm64];

    /// Token used in release file names.
    pub fn token(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        // Release names use Go-style arch names, Rust reports the LLVM ones
        match name.to_ascii_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Arch::Amd64),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

/// Lookup key for one artifact in a release table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformKey {
    pub os: OsFamily,
    pub arch: Arch,
}

impl PlatformKey {
    pub fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Every platform a release is expected to ship an artifact for.
    pub fn supported() -> impl Iterator<Item = PlatformKey> {
        OsFamily::ALL
            .into_iter()
            .flat_map(|os| Arch::ALL.into_iter().map(move |arch| PlatformKey::new(os, arch)))
    }

    /// Detect the platform of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedPlatform`] on anything other than
    /// macOS or Linux on x86_64 or aarch64.
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a key from free-form OS and architecture names.
    ///
    /// Accepts both release tokens (`darwin`, `amd64`) and the names Rust
    /// uses (`macos`, `x86_64`, `aarch64`).
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        match (OsFamily::from_name(os), Arch::from_name(arch)) {
            (Some(os), Some(arch)) => Ok(Self::new(os, arch)),
            _ => Err(ResolveError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Token pair as it appears in release file names, e.g. `linux-arm64`.
    pub fn slug(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.token(), self.arch.token())
    }
}

impl FromStr for PlatformKey {
    type Err = ResolveError;

    /// Parse `<os>-<arch>` (also accepts `<os>/<arch>`).
    fn from_str(s: &str) -> Result<Self> {
        let (os, arch) = s
            .split_once(['-', '/'])
            .ok_or_else(|| ResolveError::UnsupportedPlatform {
                os: s.to_string(),
                arch: String::new(),
            })?;
        Self::from_parts(os, arch)
    }
}
