//! OS specific functionalities.
//!
//! Child processes are started through [`ProcessLauncher`] so that callers
//! choose explicitly between a detached launch and one that blocks until
//! the child exits.
use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{Command, Stdio},
};

use crate::error::{AddContext, CoordinatorError, CoordinatorErrorKind};

/// OS specific error wrapper.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OsError {
    /// Standard IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The child process was terminated without an exit code.
    #[error("process terminated by signal")]
    Signaled,

    /// The child process exited unsuccessfully.
    #[error("process exited with code {0}")]
    ExitCode(i32),
}

impl From<OsError> for CoordinatorError {
    fn from(value: OsError) -> Self {
        CoordinatorError::new(CoordinatorErrorKind::ProcessLaunch).with_source(value)
    }
}

/// Starts child processes.
pub trait ProcessLauncher {
    /// Starts a process without waiting for it.
    ///
    /// The child may outlive the current process.
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<(), CoordinatorError>;

    /// Starts a process and blocks until it exits.
    ///
    /// Returns the exit code. A non-zero code is not an error.
    fn spawn_and_wait(&self, program: &Path, args: &[OsString]) -> Result<i32, CoordinatorError>;

    /// Runs a process to completion and returns its standard output.
    ///
    /// A non-zero exit code is an error.
    fn output(&self, program: &Path, args: &[OsString]) -> Result<String, CoordinatorError>;
}

/// Launches real processes with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn_detached(&self, program: &Path, args: &[OsString]) -> Result<(), CoordinatorError> {
        tracing::debug!(?program, ?args, "spawn detached");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        set_detached(&mut command);

        command
            .spawn()
            .with_contextc(|_error| format!("failed to start {program:?}"))?;

        Ok(())
    }

    fn spawn_and_wait(&self, program: &Path, args: &[OsString]) -> Result<i32, CoordinatorError> {
        tracing::debug!(?program, ?args, "spawn and wait");

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .with_contextc(|_error| format!("failed to run {program:?}"))?;

        let code = status.code().ok_or(OsError::Signaled)?;
        tracing::debug!(?program, code, "process exited");

        Ok(code)
    }

    fn output(&self, program: &Path, args: &[OsString]) -> Result<String, CoordinatorError> {
        tracing::debug!(?program, ?args, "capture output");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_contextc(|_error| format!("failed to run {program:?}"))?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(code) => Err(OsError::ExitCode(code).into()),
            None => Err(OsError::Signaled.into()),
        }
    }
}

#[cfg(windows)]
fn set_detached(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    // https://learn.microsoft.com/en-us/windows/win32/procthread/process-creation-flags
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(unix)]
fn set_detached(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(any(windows, unix)))]
fn set_detached(_command: &mut Command) {}

/// Answers whether a path exists.
pub trait PathProbe {
    /// Returns whether something exists at the path.
    fn exists(&self, path: &Path) -> bool;
}

/// Checks the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        tracing::trace!(?path, "path exists");
        path.exists()
    }
}

/// Returns the file name portion of a path as an owned string.
pub(crate) fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .unwrap_or(OsStr::new(""))
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_spawn_and_wait_exit_code() {
        let code = SystemLauncher
            .spawn_and_wait(Path::new("sh"), &["-c".into(), "exit 3".into()])
            .unwrap();

        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_output() {
        let text = SystemLauncher
            .output(Path::new("sh"), &["-c".into(), "echo Version=1.2.3.4".into()])
            .unwrap();

        assert_eq!(text.trim(), "Version=1.2.3.4");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_failure() {
        let error = SystemLauncher
            .output(Path::new("sh"), &["-c".into(), "exit 1".into()])
            .unwrap_err();

        assert!(matches!(error.kind(), CoordinatorErrorKind::ProcessLaunch));
    }

    #[test]
    fn test_missing_program() {
        let error = SystemLauncher
            .spawn_detached(Path::new("/nonexistent/braveDefaults.exe"), &[])
            .unwrap_err();

        assert!(error.kind().is_io());
    }

    #[test]
    fn test_file_name_lossy() {
        assert_eq!(file_name_lossy(Path::new("/a/b/brave.exe")), "brave.exe");
        assert_eq!(file_name_lossy(Path::new("/")), "");
    }
}
