//! Environment variables and host information.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    pub(crate) fn os_impl(&self) -> String {
        env::consts::OS.to_string()
    }

    pub(crate) fn arch_impl(&self) -> String {
        env::consts::ARCH.to_string()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn current_exe_impl(&self) -> Result<PathBuf> {
        env::current_exe().context("Failed to determine the path of the running executable")
    }
}
