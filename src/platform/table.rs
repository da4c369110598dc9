//! The set of platforms the package ships a binary for.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::PlatformKey;

/// Manifest shared with the packaging pipeline; one entry per published binary.
const BUILTIN_MANIFEST: &str = include_str!("../../platforms.json");

static BUILTIN: OnceLock<SupportedPlatformTable> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct Manifest {
    platforms: BTreeMap<String, String>,
}

/// Immutable mapping from platform key to its `bin/` subdirectory.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedPlatformTable {
    platforms: BTreeMap<String, String>,
}

impl SupportedPlatformTable {
    /// The table embedded at build time, parsed on first use.
    pub fn builtin() -> Result<&'static Self> {
        if let Some(table) = BUILTIN.get() {
            return Ok(table);
        }
        let table =
            Self::from_json(BUILTIN_MANIFEST).context("Embedded platforms.json is invalid")?;
        Ok(BUILTIN.get_or_init(|| table))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(json).context("Failed to parse platform manifest")?;

        for (key, dir) in &manifest.platforms {
            key.parse::<PlatformKey>()?;
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
                bail!("Invalid binary directory '{}' for platform {}", dir, key);
            }
        }

        Ok(Self {
            platforms: manifest.platforms,
        })
    }

    /// Subdirectory holding the binary for `key`, if the platform is supported.
    pub fn lookup(&self, key: &PlatformKey) -> Option<&str> {
        self.platforms.get(&key.to_string()).map(String::as_str)
    }

    /// Supported keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.platforms.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Libc;

    #[test]
    fn test_builtin_table_parses() {
        let table = SupportedPlatformTable::builtin().unwrap();
        let keys = table.keys();
        assert_eq!(
            keys,
            vec![
                "darwin-arm64",
                "darwin-x64",
                "linux-arm64-gnu",
                "linux-arm64-musl",
                "linux-x64-gnu",
                "linux-x64-musl",
                "win32-arm64",
                "win32-x64",
            ]
        );
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = SupportedPlatformTable::builtin().unwrap();
        let b = SupportedPlatformTable::builtin().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_lookup() {
        let table = SupportedPlatformTable::builtin().unwrap();
        let musl = PlatformKey::new("linux", "x64", Some(Libc::Musl));
        assert_eq!(table.lookup(&musl), Some("linux-x64-musl"));

        // Linux keys always carry a libc component
        let bare_linux = PlatformKey::new("linux", "x64", None);
        assert_eq!(table.lookup(&bare_linux), None);

        let unknown = PlatformKey::new("freebsd", "x64", None);
        assert_eq!(table.lookup(&unknown), None);
    }

    #[test]
    fn test_every_builtin_key_parses_back() {
        let table = SupportedPlatformTable::builtin().unwrap();
        for key in table.keys() {
            let parsed: PlatformKey = key.parse().unwrap();
            assert_eq!(parsed.to_string(), key);
            assert_eq!(parsed.libc.is_some(), parsed.os == "linux", "{}", key);
            assert_eq!(table.lookup(&parsed), Some(key.as_str()));
        }
    }

    #[test]
    fn test_from_json_rejects_bad_entries() {
        assert!(SupportedPlatformTable::from_json("not json").is_err());
        assert!(SupportedPlatformTable::from_json(r#"{"platforms": {"linux": "x"}}"#).is_err());
        assert!(
            SupportedPlatformTable::from_json(r#"{"platforms": {"darwin-x64": "../escape"}}"#)
                .is_err()
        );
        assert!(
            SupportedPlatformTable::from_json(r#"{"platforms": {"darwin-x64": ""}}"#).is_err()
        );
    }

    #[test]
    fn test_from_json_custom_directory() {
        let table =
            SupportedPlatformTable::from_json(r#"{"platforms": {"darwin-arm64": "macos-universal"}}"#)
                .unwrap();
        let key = PlatformKey::new("darwin", "arm64", None);
        assert_eq!(table.lookup(&key), Some("macos-universal"));
    }
}
