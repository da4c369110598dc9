use anyhow::{Context, Result, bail};
use log::debug;
use std::env::VarError;
use std::path::{Path, PathBuf};

use crate::platform::{Libc, PlatformKey};
use crate::runtime::Runtime;

/// Package root override.
pub const ENV_ROOT: &str = "BINSHIM_ROOT";
/// Base name of the wrapped binary.
pub const ENV_BINARY_NAME: &str = "BINSHIM_BINARY_NAME";
/// Full platform key override, bypassing detection.
pub const ENV_PLATFORM: &str = "BINSHIM_PLATFORM";
/// Linux C library override, bypassing the libc probes.
pub const ENV_LIBC: &str = "BINSHIM_LIBC";

/// Binary name baked in at build time, if the package build set one.
const BUILTIN_BINARY_NAME: Option<&str> = option_env!("BINSHIM_BINARY_NAME");

/// Settings for one invocation, read from the environment since every
/// command-line argument belongs to the wrapped binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ShimConfig {
    pub install_root: PathBuf,
    pub binary_name: String,
    pub platform_override: Option<PlatformKey>,
    pub libc_override: Option<Libc>,
}

impl ShimConfig {
    #[tracing::instrument(skip(runtime))]
    pub fn from_runtime<R: Runtime>(runtime: &R) -> Result<Self> {
        // Only looked up when a default needs it; overrides work without it.
        let mut exe = None;

        let install_root = match non_empty_var(runtime, ENV_ROOT)? {
            Some(root) => PathBuf::from(root),
            None => default_install_root(shim_exe(runtime, &mut exe)?)?,
        };

        let binary_name = match non_empty_var(runtime, ENV_BINARY_NAME)? {
            Some(name) => name,
            None => match BUILTIN_BINARY_NAME.filter(|name| !name.is_empty()) {
                Some(name) => name.to_string(),
                None => binary_name_from_exe(shim_exe(runtime, &mut exe)?)?,
            },
        };

        let platform_override = non_empty_var(runtime, ENV_PLATFORM)?
            .map(|key| key.parse::<PlatformKey>())
            .transpose()
            .with_context(|| format!("Invalid {}", ENV_PLATFORM))?;

        let libc_override = non_empty_var(runtime, ENV_LIBC)?
            .map(|libc| libc.parse::<Libc>())
            .transpose()
            .with_context(|| format!("Invalid {}", ENV_LIBC))?;

        let config = Self {
            install_root,
            binary_name,
            platform_override,
            libc_override,
        };
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

/// Trimmed value of `key`; unset and blank both mean "not configured".
fn non_empty_var<R: Runtime>(runtime: &R, key: &str) -> Result<Option<String>> {
    match runtime.env_var(key) {
        Ok(value) => {
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => bail!("{} is set but is not valid UTF-8", key),
    }
}

/// Canonical path of the running shim, resolved on first use.
fn shim_exe<'a, R: Runtime>(runtime: &R, cached: &'a mut Option<PathBuf>) -> Result<&'a Path> {
    let exe = match cached.take() {
        Some(exe) => exe,
        None => {
            let exe = runtime.current_exe().with_context(|| {
                format!("Set {} and {} to run without it", ENV_ROOT, ENV_BINARY_NAME)
            })?;
            runtime.canonicalize(&exe).unwrap_or_else(|e| {
                debug!("Using uncanonicalized executable path {}: {:#}", exe.display(), e);
                exe
            })
        }
    };
    Ok(cached.insert(exe))
}

/// The shim lives at `<root>/bin/<shim>`, so the package root is two levels up.
fn default_install_root(exe: &Path) -> Result<PathBuf> {
    match exe.parent().and_then(Path::parent) {
        Some(root) => Ok(root.to_path_buf()),
        None => bail!(
            "Cannot determine the package root from {}; set {}",
            exe.display(),
            ENV_ROOT
        ),
    }
}

fn binary_name_from_exe(exe: &Path) -> Result<String> {
    exe.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .with_context(|| {
            format!(
                "Cannot derive the binary name from {}; set {}",
                exe.display(),
                ENV_BINARY_NAME
            )
        })
}
