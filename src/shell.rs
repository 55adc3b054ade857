//! The application shell the coordinator hands control back to.
use std::{ffi::OsString, path::PathBuf, process::Command};

use crate::{
    error::{AddContext, CoordinatorError, CoordinatorErrorKind},
    invocation::Environment,
};

/// Arguments and environment for a replacement process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchRequest {
    /// Arguments after the program name.
    pub args: Vec<OsString>,
    /// Full environment of the new process.
    pub env: Environment,
}

/// Process level operations of the application shell.
pub trait AppShell {
    /// Registers the application user model ID to apply when the shell
    /// finishes launching.
    fn register_app_user_model_id(&mut self, id: &str);

    /// Starts a new instance of the application.
    fn relaunch(&mut self, request: &RelaunchRequest) -> Result<(), CoordinatorError>;

    /// Terminates the current process.
    ///
    /// Real shells do not return from this call.
    fn exit(&mut self, code: i32);
}

/// Shell backed by the current process.
///
/// Relaunching starts the current executable again. The app user model ID
/// is recorded for the host to apply during its own startup.
#[derive(Debug, Default)]
pub struct ProcessShell {
    exe_path: Option<PathBuf>,
    app_user_model_id: Option<String>,
}

impl ProcessShell {
    /// Create a shell relaunching [`std::env::current_exe()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shell relaunching the given executable.
    pub fn with_exe_path<P: Into<PathBuf>>(mut self, exe_path: P) -> Self {
        self.exe_path = Some(exe_path.into());
        self
    }

    /// Returns the registered application user model ID.
    pub fn app_user_model_id(&self) -> Option<&str> {
        self.app_user_model_id.as_deref()
    }

    fn relaunch_exe_path(&self) -> Result<PathBuf, CoordinatorError> {
        match &self.exe_path {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().map_err(|error| {
                CoordinatorError::new(CoordinatorErrorKind::UnknownExecutablePath)
                    .with_source(error)
            }),
        }
    }
}

impl AppShell for ProcessShell {
    fn register_app_user_model_id(&mut self, id: &str) {
        tracing::debug!(id, "registering app user model id");
        self.app_user_model_id = Some(id.to_string());
    }

    fn relaunch(&mut self, request: &RelaunchRequest) -> Result<(), CoordinatorError> {
        let exe_path = self.relaunch_exe_path()?;

        tracing::info!(?exe_path, args = ?request.args, "relaunching");

        Command::new(&exe_path)
            .args(&request.args)
            .env_clear()
            .envs(request.env.iter())
            .spawn()
            .with_contextc(|_error| format!("failed to relaunch {exe_path:?}"))
            .map_err(|error| {
                CoordinatorError::new(CoordinatorErrorKind::Relaunch).with_source(error)
            })?;

        Ok(())
    }

    fn exit(&mut self, code: i32) {
        tracing::info!(code, "exiting");
        std::process::exit(code);
    }
}
