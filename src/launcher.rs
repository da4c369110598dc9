//! Runs the resolved binary in the foreground and reports how it ended.

use anyhow::Result;
use log::debug;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{ShimError, SpawnFailure};

/// Exit code used when the child's own code is unavailable or the shim itself failed.
pub const FALLBACK_EXIT_CODE: i32 = 1;

/// How the child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchResult {
    /// Exit code, absent when the child was killed by a signal.
    pub code: Option<i32>,
    /// Terminating signal number (Unix only).
    pub signal: Option<i32>,
}

impl LaunchResult {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// The exit code the shim should end with: the child's own code, or the
    /// shell convention `128 + signal` when it was killed by a signal.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => FALLBACK_EXIT_CODE,
        }
    }
}

/// Spawn `path` with `args` passed verbatim, sharing this process's stdio,
/// and block until it exits. There is no timeout.
///
/// On Unix, terminal interrupts (SIGINT, SIGQUIT) are ignored by this process
/// while the child runs; the child still receives them from the process group
/// and decides how to react, and its status is reported once it exits.
#[tracing::instrument(skip(args))]
pub fn launch(path: &Path, args: &[OsString]) -> Result<LaunchResult> {
    debug!("Launching {} with {} argument(s)", path.display(), args.len());

    let mut command = Command::new(path);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    #[cfg(unix)]
    let interrupts = interrupt::IgnoreInterrupts::acquire();
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let child_actions = interrupts.child_actions();
        // SAFETY: the hook only calls sigaction(2), which is async-signal-safe.
        unsafe {
            command.pre_exec(move || interrupt::restore_in_child(child_actions));
        }
    }

    let status = command.status().map_err(|source| ShimError::Spawn {
        path: path.to_path_buf(),
        failure: SpawnFailure::from_io(&source),
        source,
    })?;

    let result = LaunchResult::from_status(status);
    match result.signal {
        Some(signal) => debug!(
            "{} was terminated by {}",
            path.display(),
            signal_name(signal)
        ),
        None => debug!("{} exited with {:?}", path.display(), result.code),
    }
    Ok(result)
}

#[cfg(unix)]
mod interrupt {
    use log::debug;
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction, signal};
    use std::io;
    use std::sync::Mutex;

    const INTERRUPTS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

    /// Number of live guards and the actions they replaced.
    struct Saved {
        depth: usize,
        previous: Option<[SigAction; 2]>,
    }

    static SAVED: Mutex<Saved> = Mutex::new(Saved {
        depth: 0,
        previous: None,
    });

    fn action(handler: SigHandler) -> SigAction {
        SigAction::new(handler, SaFlags::empty(), SigSet::empty())
    }

    /// Keeps SIGINT and SIGQUIT ignored in this process until dropped.
    /// Nested guards share one saved state; the last one out restores it.
    pub(super) struct IgnoreInterrupts {
        child_actions: [(Signal, SigHandler); 2],
    }

    impl IgnoreInterrupts {
        pub(super) fn acquire() -> Self {
            let mut saved = SAVED.lock().unwrap_or_else(|e| e.into_inner());
            if saved.depth == 0 {
                let ignore = action(SigHandler::SigIgn);
                let mut previous = [ignore; 2];
                for (slot, sig) in previous.iter_mut().zip(INTERRUPTS) {
                    // SAFETY: SIG_IGN runs no handler code.
                    match unsafe { sigaction(sig, &ignore) } {
                        Ok(prev) => *slot = prev,
                        Err(e) => {
                            debug!("Could not ignore {}: {}", sig, e);
                            *slot = action(SigHandler::SigDfl);
                        }
                    }
                }
                saved.previous = Some(previous);
            }
            saved.depth += 1;

            // A child inherits "ignored" across exec; anything else starts at the default.
            let previous = saved
                .previous
                .unwrap_or([action(SigHandler::SigDfl); 2]);
            let mut child_actions = [(Signal::SIGINT, SigHandler::SigDfl); 2];
            for ((slot, sig), prev) in child_actions.iter_mut().zip(INTERRUPTS).zip(previous) {
                let handler = match prev.handler() {
                    SigHandler::SigIgn => SigHandler::SigIgn,
                    _ => SigHandler::SigDfl,
                };
                *slot = (sig, handler);
            }

            Self { child_actions }
        }

        pub(super) fn child_actions(&self) -> [(Signal, SigHandler); 2] {
            self.child_actions
        }
    }

    impl Drop for IgnoreInterrupts {
        fn drop(&mut self) {
            let mut saved = SAVED.lock().unwrap_or_else(|e| e.into_inner());
            saved.depth = saved.depth.saturating_sub(1);
            if saved.depth > 0 {
                return;
            }
            if let Some(previous) = saved.previous.take() {
                for (sig, prev) in INTERRUPTS.into_iter().zip(previous) {
                    // SAFETY: reinstates the action that was in place before acquire().
                    if let Err(e) = unsafe { sigaction(sig, &prev) } {
                        debug!("Could not restore {}: {}", sig, e);
                    }
                }
            }
        }
    }

    /// Runs in the forked child before exec.
    pub(super) fn restore_in_child(actions: [(Signal, SigHandler); 2]) -> io::Result<()> {
        for (sig, handler) in actions {
            // SAFETY: only SIG_DFL or SIG_IGN are installed.
            unsafe { signal(sig, handler) }.map_err(io::Error::from)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn signal_name(signal: i32) -> String {
    match nix::sys::signal::Signal::try_from(signal) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => format!("signal {}", signal),
    }
}

#[cfg(not(unix))]
fn signal_name(signal: i32) -> String {
    format!("signal {}", signal)
}
