//! Runtime abstraction for host interaction.
//!
//! Every question the shim asks the host (which OS, which CPU, does this file
//! exist, what does `ldd` say) goes through the [`Runtime`] trait so the
//! resolution pipeline can be driven against simulated hosts in tests.
//!
//! # Structure
//!
//! - `env` - Environment variables and host facts (OS, architecture, executable)
//! - `fs` - Read-only file system queries
//! - `process` - Running short-lived probe commands

mod env;
mod fs;
mod process;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    /// Operating system name as reported by the Rust target (e.g. `linux`, `macos`).
    fn os(&self) -> String;

    /// CPU architecture as reported by the Rust target (e.g. `x86_64`, `aarch64`).
    fn arch(&self) -> String;

    fn current_exe(&self) -> Result<PathBuf>;

    // File System
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Read at most `len` bytes from the start of a file.
    fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>>;

    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    // Processes
    /// Run a command to completion and return its stdout and stderr joined.
    /// The exit status is deliberately ignored; callers only inspect the text.
    fn command_output(&self, program: &str, args: &[String]) -> Result<String>;
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn os(&self) -> String {
        self.os_impl()
    }

    fn arch(&self) -> String {
        self.arch_impl()
    }

    fn current_exe(&self) -> Result<PathBuf> {
        self.current_exe_impl()
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn read_prefix(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        self.read_prefix_impl(path, len)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.canonicalize_impl(path)
    }

    fn command_output(&self, program: &str, args: &[String]) -> Result<String> {
        self.command_output_impl(program, args)
    }
}
