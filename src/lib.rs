//! Resolve and run the pre-built binary bundled for the current host.
//!
//! A package ships one native binary per platform under
//! `<root>/bin/<platform-key>/`. The shim detects the host platform, locates
//! and validates the matching binary, then runs it with the caller's arguments
//! and stdio, handing back the child's exit status.

pub mod config;
pub mod error;
pub mod launcher;
pub mod locator;
pub mod platform;
pub mod runtime;
pub mod validator;

use anyhow::Result;
use log::info;
use std::ffi::OsString;

pub use config::ShimConfig;
pub use error::{ShimError, SpawnFailure};
pub use launcher::{LaunchResult, launch};
pub use locator::BinaryLocator;
pub use platform::{Libc, PlatformKey, SupportedPlatformTable, detect};
pub use runtime::{RealRuntime, Runtime};
pub use validator::{BinaryFormat, ResolvedBinary, validate};

/// Detect, locate and validate the binary for this host.
#[tracing::instrument(skip(runtime))]
pub fn resolve<R: Runtime>(runtime: &R, config: &ShimConfig) -> Result<ResolvedBinary> {
    let table = SupportedPlatformTable::builtin()?;

    let platform = match &config.platform_override {
        Some(platform) => {
            info!("Using platform override {}", platform);
            platform.clone()
        }
        None => detect(runtime, config.libc_override),
    };

    let locator = BinaryLocator::new(&config.install_root, &config.binary_name, table);
    let candidate = locator.locate(&platform)?;
    validate(runtime, &platform, candidate)
}

/// Resolve the binary and run it to completion with `args`.
///
/// Returns the child's [`LaunchResult`] rather than exiting, so callers keep
/// control of the process.
pub fn run<R: Runtime>(runtime: &R, args: &[OsString]) -> Result<LaunchResult> {
    let config = ShimConfig::from_runtime(runtime)?;
    let binary = resolve(runtime, &config)?;
    launch_resolved(&binary, args)
}

/// Launch a validated binary. A spawn failure on a file whose format was not
/// recognized during validation is reported as such.
pub fn launch_resolved(binary: &ResolvedBinary, args: &[OsString]) -> Result<LaunchResult> {
    launch(&binary.path, args).map_err(|err| annotate_spawn_error(err, binary.format))
}

fn annotate_spawn_error(err: anyhow::Error, format: BinaryFormat) -> anyhow::Error {
    match err.downcast::<ShimError>() {
        Ok(ShimError::Spawn {
            path,
            failure: SpawnFailure::Other,
            source,
        }) if format == BinaryFormat::Unknown => ShimError::Spawn {
            path,
            failure: SpawnFailure::UnrecognizedFormat,
            source,
        }
        .into(),
        Ok(shim_error) => shim_error.into(),
        Err(err) => err,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn config(root: PathBuf) -> ShimConfig {
        ShimConfig {
            install_root: root,
            binary_name: "tool".to_string(),
            platform_override: None,
            libc_override: None,
        }
    }

    fn mock_host(os: &'static str, arch: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_os().returning(move || os.to_string());
        runtime.expect_arch().returning(move || arch.to_string());
        runtime.expect_exists().returning(|p| p.exists());
        runtime
            .expect_read_prefix()
            .returning(|_, _| Ok(b"#!/bin/sh\n".to_vec()));
        runtime
    }

    #[test]
    fn test_resolve_for_simulated_musl_host() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("bin").join("linux-arm64-musl");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("tool"), "#!/bin/sh\n").unwrap();

        let mut runtime = mock_host("linux", "aarch64");
        runtime
            .expect_command_output()
            .returning(|_, _| Ok("musl libc (aarch64)\n".to_string()));

        let resolved = resolve(&runtime, &config(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved.path, bin_dir.join("tool"));
        assert_eq!(resolved.platform.to_string(), "linux-arm64-musl");
        assert_eq!(resolved.format, BinaryFormat::Script);

        // Resolving again yields the same answer
        let again = resolve(&runtime, &config(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved, again);
    }

    #[test]
    fn test_resolve_windows_binary_name() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("bin").join("win32-x64");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("tool.exe"), "MZ").unwrap();

        let runtime = mock_host("windows", "x86_64");
        let resolved = resolve(&runtime, &config(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved.file_name, "tool.exe");
    }

    #[test]
    fn test_resolve_missing_binary() {
        let dir = tempdir().unwrap();
        let runtime = mock_host("macos", "x86_64");

        let err = resolve(&runtime, &config(dir.path().to_path_buf())).unwrap_err();
        match err.downcast_ref::<ShimError>() {
            Some(ShimError::BinaryNotFound { platform, path }) => {
                assert_eq!(platform, "darwin-x64");
                assert_eq!(path, &dir.path().join("bin").join("darwin-x64").join("tool"));
            }
            other => panic!("Expected BinaryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unsupported_host() {
        let dir = tempdir().unwrap();
        let mut runtime = mock_host("linux", "riscv64");
        runtime
            .expect_command_output()
            .returning(|_, _| Ok("ldd (GNU libc) 2.39\n".to_string()));
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("ID=debian\n".to_string()));
        runtime.expect_read_dir().returning(|_| Ok(vec![]));

        let err = resolve(&runtime, &config(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShimError>(),
            Some(ShimError::UnsupportedPlatform { .. })
        ));
        assert!(err.to_string().contains("linux-riscv64-gnu"));
    }

    #[test]
    fn test_platform_override_skips_detection() {
        let dir = tempdir().unwrap();
        let bin_dir = dir.path().join("bin").join("darwin-arm64");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::write(bin_dir.join("tool"), "#!/bin/sh\n").unwrap();

        // No os/arch expectations: detection must not run
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|p| p.exists());
        runtime
            .expect_read_prefix()
            .returning(|_, _| Ok(b"#!/bin/sh\n".to_vec()));

        let mut config = config(dir.path().to_path_buf());
        config.platform_override = Some(PlatformKey::new("darwin", "arm64", None));

        let resolved = resolve(&runtime, &config).unwrap();
        assert_eq!(resolved.path, bin_dir.join("tool"));
    }

    fn spawn_error(failure: SpawnFailure) -> anyhow::Error {
        ShimError::Spawn {
            path: PathBuf::from("/pkg/bin/linux-x64-gnu/tool"),
            failure,
            source: std::io::Error::other("exec format error"),
        }
        .into()
    }

    fn failure_of(err: &anyhow::Error) -> Option<SpawnFailure> {
        match err.downcast_ref::<ShimError>() {
            Some(ShimError::Spawn { failure, .. }) => Some(*failure),
            _ => None,
        }
    }

    #[test]
    fn test_spawn_failure_on_unknown_format_is_explained() {
        let err = annotate_spawn_error(spawn_error(SpawnFailure::Other), BinaryFormat::Unknown);
        assert_eq!(failure_of(&err), Some(SpawnFailure::UnrecognizedFormat));
        assert!(err.to_string().contains("not a recognized executable"));
    }

    #[test]
    fn test_spawn_failure_on_known_format_is_untouched() {
        let err = annotate_spawn_error(spawn_error(SpawnFailure::Other), BinaryFormat::Elf);
        assert_eq!(failure_of(&err), Some(SpawnFailure::Other));

        let err = annotate_spawn_error(
            spawn_error(SpawnFailure::PermissionDenied),
            BinaryFormat::Unknown,
        );
        assert_eq!(failure_of(&err), Some(SpawnFailure::PermissionDenied));

        let err = annotate_spawn_error(anyhow::anyhow!("unrelated"), BinaryFormat::Unknown);
        assert_eq!(failure_of(&err), None);
        assert_eq!(err.to_string(), "unrelated");
    }

    #[test]
    fn test_launch_resolved_missing_file() {
        let dir = tempdir().unwrap();
        let binary = ResolvedBinary {
            path: dir.path().join("tool"),
            platform: PlatformKey::new("darwin", "arm64", None),
            file_name: "tool".to_string(),
            format: BinaryFormat::Unknown,
        };

        let err = launch_resolved(&binary, &[]).unwrap_err();
        assert_eq!(failure_of(&err), Some(SpawnFailure::Missing));
    }
}
