//! Failures that end an invocation before or while starting the wrapped binary.
//!
//! Pipeline functions return `anyhow::Result`; these variants are raised into it
//! so the entry point can print them as-is and tests can recover them with
//! `downcast_ref::<ShimError>()`.

use std::io;
use std::path::PathBuf;

/// Why the operating system refused to start the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnFailure {
    /// The executable vanished between validation and launch.
    Missing,
    /// The file exists but is not executable by this user.
    PermissionDenied,
    /// The OS rejected the file and it did not look like a native executable.
    UnrecognizedFormat,
    Other,
}

impl SpawnFailure {
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => SpawnFailure::Missing,
            io::ErrorKind::PermissionDenied => SpawnFailure::PermissionDenied,
            _ => SpawnFailure::Other,
        }
    }
}

#[derive(Debug)]
pub enum ShimError {
    /// The detected platform has no entry in the supported platform table.
    UnsupportedPlatform {
        platform: String,
        supported: Vec<String>,
    },
    /// The platform is supported but its binary is not on disk.
    BinaryNotFound { platform: String, path: PathBuf },
    /// The binary was found but could not be started.
    Spawn {
        path: PathBuf,
        failure: SpawnFailure,
        source: io::Error,
    },
}

impl std::fmt::Display for ShimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShimError::UnsupportedPlatform {
                platform,
                supported,
            } => {
                write!(
                    f,
                    "Unsupported platform: {}. Supported platforms: {}",
                    platform,
                    supported.join(", ")
                )
            }
            ShimError::BinaryNotFound { platform, path } => {
                write!(
                    f,
                    "No binary found for platform {} at {}. \
                     The platform-specific binary was not installed; reinstall the package \
                     without --ignore-scripts or --no-optional, or download the {} binary \
                     manually from the project's releases page and place it at that path.",
                    platform,
                    path.display(),
                    platform
                )
            }
            ShimError::Spawn {
                path,
                failure,
                source,
            } => match failure {
                SpawnFailure::Missing => write!(
                    f,
                    "Binary disappeared before it could be started: {}. \
                     Reinstall the package to restore it.",
                    path.display()
                ),
                SpawnFailure::PermissionDenied => write!(
                    f,
                    "Permission denied when starting {}. Mark it executable with: chmod +x {}",
                    path.display(),
                    path.display()
                ),
                SpawnFailure::UnrecognizedFormat => write!(
                    f,
                    "Failed to start {}: {}. The file is not a recognized executable \
                     for this platform; it may be corrupt or built for another platform. \
                     Reinstall the package to restore it.",
                    path.display(),
                    source
                ),
                SpawnFailure::Other => {
                    write!(f, "Failed to start {}: {}", path.display(), source)
                }
            },
        }
    }
}

impl std::error::Error for ShimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShimError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
