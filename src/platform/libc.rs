//! Best-effort musl detection on Linux hosts.
//!
//! Probes run in order and the first positive answer wins. A probe that
//! errors counts as "not detected"; when nothing reports musl the host is
//! assumed to use glibc.

use anyhow::Result;
use log::debug;
use std::path::Path;

use super::Libc;
use crate::runtime::Runtime;

const OS_RELEASE: &str = "/etc/os-release";
const LIB_DIR: &str = "/lib";
const MUSL_LOADER_PREFIX: &str = "ld-musl-";

type Probe<R> = fn(&R) -> Result<bool>;

fn probes<R: Runtime>() -> [(&'static str, Probe<R>); 3] {
    [
        ("ldd", probe_ldd::<R>),
        ("os-release", probe_os_release::<R>),
        ("loader", probe_loader::<R>),
    ]
}

/// Detect the C library of a Linux host.
#[tracing::instrument(skip(runtime))]
pub fn detect_libc<R: Runtime>(runtime: &R) -> Libc {
    for (name, probe) in probes::<R>() {
        match probe(runtime) {
            Ok(true) => {
                debug!("musl detected by {} probe", name);
                return Libc::Musl;
            }
            Ok(false) => debug!("{} probe: musl not detected", name),
            Err(e) => debug!("{} probe failed, skipping: {:#}", name, e),
        }
    }
    Libc::Gnu
}

/// musl's `ldd` prints its banner on stderr and exits non-zero.
fn probe_ldd<R: Runtime>(runtime: &R) -> Result<bool> {
    let output = runtime.command_output("ldd", &["--version".to_string()])?;
    Ok(output.to_lowercase().contains("musl"))
}

fn probe_os_release<R: Runtime>(runtime: &R) -> Result<bool> {
    let content = runtime.read_to_string(Path::new(OS_RELEASE))?;
    Ok(is_alpine(&content))
}

fn probe_loader<R: Runtime>(runtime: &R) -> Result<bool> {
    let entries = runtime.read_dir(Path::new(LIB_DIR))?;
    Ok(entries.iter().any(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(MUSL_LOADER_PREFIX))
    }))
}

fn is_alpine(os_release: &str) -> bool {
    os_release.lines().any(|line| {
        let Some((key, value)) = line.split_once('=') else {
            return false;
        };
        matches!(key.trim(), "ID" | "ID_LIKE")
            && value
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .any(|id| id.eq_ignore_ascii_case("alpine"))
    })
}
