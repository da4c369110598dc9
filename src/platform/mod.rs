//! Platform detection
//!
//! This module turns host facts (OS, architecture and, on Linux, the C
//! library) into the canonical [`PlatformKey`] used to pick a bundled binary,
//! and holds the [`SupportedPlatformTable`] of keys the package ships.

mod libc;
mod table;

use anyhow::{Context, Result, bail};
use log::debug;
use std::fmt;
use std::str::FromStr;

use crate::runtime::Runtime;

pub use libc::detect_libc;
pub use table::SupportedPlatformTable;

/// C library flavour of a Linux host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Libc {
    Gnu,
    Musl,
}

impl Libc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Libc::Gnu => "gnu",
            Libc::Musl => "musl",
        }
    }
}

impl fmt::Display for Libc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Libc {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gnu" | "glibc" => Ok(Libc::Gnu),
            "musl" => Ok(Libc::Musl),
            other => bail!("Unknown libc variant '{}'. Expected 'gnu' or 'musl'.", other),
        }
    }
}

/// Canonical `<os>-<arch>[-<libc>]` identifier, e.g. `linux-x64-musl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    pub os: String,
    pub arch: String,
    /// Only set for Linux.
    pub libc: Option<Libc>,
}

impl PlatformKey {
    pub fn new(os: impl Into<String>, arch: impl Into<String>, libc: Option<Libc>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            libc,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "win32"
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)?;
        if let Some(libc) = self.libc {
            write!(f, "-{}", libc)?;
        }
        Ok(())
    }
}

impl FromStr for PlatformKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => {
                Ok(PlatformKey::new(*os, *arch, None))
            }
            [os, arch, libc] if !os.is_empty() && !arch.is_empty() => {
                let libc = libc
                    .parse()
                    .with_context(|| format!("Invalid platform key '{}'", s))?;
                Ok(PlatformKey::new(*os, *arch, Some(libc)))
            }
            _ => bail!(
                "Invalid platform key '{}'. Expected format: <os>-<arch>[-<libc>]",
                s
            ),
        }
    }
}

/// Map a Rust target OS name onto the package naming convention.
pub fn normalize_os(os: &str) -> String {
    match os {
        "macos" | "darwin" => "darwin".to_string(),
        "windows" | "win32" => "win32".to_string(),
        other => other.to_string(),
    }
}

/// Map a Rust target architecture name onto the package naming convention.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" | "amd64" | "x64" => "x64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        "x86" | "i686" | "i386" | "ia32" => "ia32".to_string(),
        other => other.to_string(),
    }
}

/// Detect the platform key of the host.
///
/// Never fails: unknown OS or architecture names are passed through verbatim
/// and left for the supported table to reject. `libc_override` replaces the
/// Linux C library probes when set.
#[tracing::instrument(skip(runtime))]
pub fn detect<R: Runtime>(runtime: &R, libc_override: Option<Libc>) -> PlatformKey {
    let os = normalize_os(&runtime.os());
    let arch = normalize_arch(&runtime.arch());

    let libc = if os == "linux" {
        Some(libc_override.unwrap_or_else(|| detect_libc(runtime)))
    } else {
        None
    };

    let key = PlatformKey::new(os, arch, libc);
    debug!("Detected platform: {}", key);
    key
}
