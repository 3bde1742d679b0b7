//! Library interface for shelp-install
//!
//! Selects, downloads, verifies and atomically installs the prebuilt `shelp`
//! release binary for the running platform.

pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod install;
pub mod platform;
pub mod release;
pub mod resolver;
pub mod ui;
pub mod verify;

// Re-export commonly used types
pub use error::{ResolveError, Result};
pub use platform::PlatformKey;
pub use release::{ArtifactEntry, ReleaseTable, Version};
pub use resolver::{InstallReport, Resolver};
