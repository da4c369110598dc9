//! Maps a platform key to where its binary is expected inside the package tree.
//!
//! Layout: `<install-root>/bin/<platform-dir>/<binary-name>[.exe]`

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::error::ShimError;
use crate::platform::{PlatformKey, SupportedPlatformTable};

/// Directory under the install root holding one subdirectory per platform.
pub const BIN_DIR: &str = "bin";

/// File name of the binary for a platform, with the Windows executable suffix where needed.
pub fn binary_file_name(base: &str, platform: &PlatformKey) -> String {
    if platform.is_windows() {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

pub struct BinaryLocator<'a> {
    install_root: PathBuf,
    binary_name: String,
    table: &'a SupportedPlatformTable,
}

impl<'a> BinaryLocator<'a> {
    pub fn new(
        install_root: impl Into<PathBuf>,
        binary_name: impl Into<String>,
        table: &'a SupportedPlatformTable,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            binary_name: binary_name.into(),
            table,
        }
    }

    /// Candidate path of the binary for `platform`. Does not touch the file system.
    #[tracing::instrument(skip(self))]
    pub fn locate(&self, platform: &PlatformKey) -> Result<PathBuf> {
        let dir = self.table.lookup(platform).ok_or_else(|| {
            ShimError::UnsupportedPlatform {
                platform: platform.to_string(),
                supported: self.table.keys(),
            }
        })?;

        let path = self
            .install_root
            .join(BIN_DIR)
            .join(dir)
            .join(binary_file_name(&self.binary_name, platform));
        debug!("Candidate binary for {}: {}", platform, path.display());
        Ok(path)
    }
}
