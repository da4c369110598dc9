//! Confirms a located binary is actually present on disk.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::ShimError;
use crate::platform::PlatformKey;
use crate::runtime::Runtime;

/// Bytes goblin needs to recognize an object format.
const HEADER_LEN: usize = 16;

/// Executable format recognized from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Elf,
    MachO,
    Pe,
    /// A `#!` interpreter script.
    Script,
    Unknown,
}

/// A binary that exists on disk and is ready to launch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBinary {
    pub path: PathBuf,
    pub platform: PlatformKey,
    pub file_name: String,
    pub format: BinaryFormat,
}

/// Check that `candidate` exists. Execute permission is left for the launcher to discover.
#[tracing::instrument(skip(runtime))]
pub fn validate<R: Runtime>(
    runtime: &R,
    platform: &PlatformKey,
    candidate: PathBuf,
) -> Result<ResolvedBinary> {
    if !runtime.exists(&candidate) {
        return Err(ShimError::BinaryNotFound {
            platform: platform.to_string(),
            path: candidate,
        }
        .into());
    }

    // Kept off the default log level; only surfaced if the launch fails.
    let format = sniff_format(runtime, &candidate);
    debug!("{} is {:?}", candidate.display(), format);

    let file_name = candidate
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ResolvedBinary {
        path: candidate,
        platform: platform.clone(),
        file_name,
        format,
    })
}

fn sniff_format<R: Runtime>(runtime: &R, path: &Path) -> BinaryFormat {
    let header = match runtime.read_prefix(path, HEADER_LEN) {
        Ok(header) => header,
        Err(e) => {
            debug!("Could not read header of {}: {:#}", path.display(), e);
            return BinaryFormat::Unknown;
        }
    };
    format_from_header(&header)
}

pub fn format_from_header(header: &[u8]) -> BinaryFormat {
    if header.starts_with(b"#!") {
        return BinaryFormat::Script;
    }

    let Ok(bytes) = <&[u8; HEADER_LEN]>::try_from(header) else {
        return BinaryFormat::Unknown;
    };

    match goblin::peek_bytes(bytes) {
        Ok(goblin::Hint::Elf(_)) => BinaryFormat::Elf,
        Ok(goblin::Hint::Mach(_)) | Ok(goblin::Hint::MachFat(_)) => BinaryFormat::MachO,
        Ok(goblin::Hint::PE) => BinaryFormat::Pe,
        _ => BinaryFormat::Unknown,
    }
}
