//! Deciding whether the process only exists to handle an updater event.
//!
//! The decision is delegated to an [`ExitGate`]. [`SquirrelShortcutGate`]
//! follows the usual Squirrel startup handling: it manages the Start menu
//! and desktop shortcuts through `Update.exe` and asks the process to exit
//! whenever the first argument is an updater event.
use std::ffi::OsString;

use crate::{
    channel::Channel,
    classify::{SQUIRREL_INSTALL, SQUIRREL_OBSOLETE, SQUIRREL_UNINSTALL, SQUIRREL_UPDATED},
    error::format_error,
    invocation::Invocation,
    os::{file_name_lossy, ProcessLauncher},
    path::PathResolver,
};

/// Decides whether the current process should exit right away.
pub trait ExitGate {
    /// Returns `true` when the invocation has nothing left to do.
    fn should_exit(
        &self,
        channel: Channel,
        invocation: &Invocation,
        paths: &PathResolver,
        launcher: &dyn ProcessLauncher,
    ) -> bool;
}

/// Never requests an exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExit;

impl ExitGate for NeverExit {
    fn should_exit(
        &self,
        _: Channel,
        _: &Invocation,
        _: &PathResolver,
        _: &dyn ProcessLauncher,
    ) -> bool {
        false
    }
}

/// Creates or removes shortcuts with `Update.exe` and exits on updater events.
///
/// Only the first argument after the program name is inspected, which is
/// where the updater puts the event flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquirrelShortcutGate;

impl SquirrelShortcutGate {
    fn run_update_exe(&self, paths: &PathResolver, launcher: &dyn ProcessLauncher, arg: String) {
        let update_exe = paths.update_exe_path();

        tracing::info!(?update_exe, %arg, "running updater shortcut command");

        match launcher.spawn_and_wait(&update_exe, &[OsString::from(arg)]) {
            Ok(0) => {}
            Ok(code) => tracing::warn!(code, "updater shortcut command failed"),
            Err(error) => {
                tracing::warn!(error = %format_error(&error), "could not run updater")
            }
        }
    }
}

impl ExitGate for SquirrelShortcutGate {
    fn should_exit(
        &self,
        channel: Channel,
        invocation: &Invocation,
        paths: &PathResolver,
        launcher: &dyn ProcessLauncher,
    ) -> bool {
        let Some(event) = invocation.args.first_user_arg() else {
            return false;
        };
        let target = file_name_lossy(invocation.exe_path());

        tracing::debug!(%channel, ?event, %target, "exit gate");

        if event == SQUIRREL_INSTALL || event == SQUIRREL_UPDATED {
            self.run_update_exe(paths, launcher, format!("--createShortcut={target}"));
            true
        } else if event == SQUIRREL_UNINSTALL {
            self.run_update_exe(paths, launcher, format!("--removeShortcut={target}"));
            true
        } else {
            event == SQUIRREL_OBSOLETE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        path::{Path, PathBuf},
    };

    use super::*;
    use crate::{
        config::CoordinatorConfig,
        error::CoordinatorError,
        invocation::{Environment, InvocationArgs},
    };

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(PathBuf, Vec<OsString>)>>,
    }

    impl ProcessLauncher for Recorder {
        fn spawn_detached(&self, _: &Path, _: &[OsString]) -> Result<(), CoordinatorError> {
            unreachable!()
        }

        fn spawn_and_wait(&self, program: &Path, args: &[OsString]) -> Result<i32, CoordinatorError> {
            self.calls
                .borrow_mut()
                .push((program.to_path_buf(), args.to_vec()));
            Ok(0)
        }

        fn output(&self, _: &Path, _: &[OsString]) -> Result<String, CoordinatorError> {
            unreachable!()
        }
    }

    fn check(args: &[&str]) -> (bool, Vec<(PathBuf, Vec<OsString>)>) {
        let exe_path = Path::new("/brave/app-1/brave.exe");
        let invocation = Invocation::new(
            InvocationArgs::new(std::iter::once("brave.exe").chain(args.iter().copied())),
            Environment::new(),
            exe_path,
        );
        let paths = PathResolver::new(exe_path, &CoordinatorConfig::default()).unwrap();
        let launcher = Recorder::default();

        let exit = SquirrelShortcutGate.should_exit(Channel::Release, &invocation, &paths, &launcher);

        (exit, launcher.calls.into_inner())
    }

    #[test]
    fn test_install_creates_shortcut() {
        let (exit, calls) = check(&["--squirrel-install", "1.0.0"]);

        assert!(exit);
        assert_eq!(
            calls,
            vec![(
                Path::new("/brave").join("Update.exe"),
                vec![OsString::from("--createShortcut=brave.exe")]
            )]
        );
    }

    #[test]
    fn test_uninstall_removes_shortcut() {
        let (exit, calls) = check(&["--squirrel-uninstall"]);

        assert!(exit);
        assert_eq!(calls[0].1, vec![OsString::from("--removeShortcut=brave.exe")]);
    }

    #[test]
    fn test_obsolete_exits_quietly() {
        let (exit, calls) = check(&["--squirrel-obsolete"]);

        assert!(exit);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_normal_launch_continues() {
        assert_eq!(check(&[]), (false, vec![]));
        assert_eq!(check(&["--squirrel-firstrun"]), (false, vec![]));
        assert_eq!(check(&["https://example.com", "--squirrel-install"]), (false, vec![]));
    }

    #[test]
    fn test_never_exit() {
        let exe_path = Path::new("/brave/app-1/brave.exe");
        let invocation = Invocation::new(
            InvocationArgs::new(["brave.exe", "--squirrel-install"]),
            Environment::new(),
            exe_path,
        );
        let paths = PathResolver::new(exe_path, &CoordinatorConfig::default()).unwrap();

        assert!(!NeverExit.should_exit(Channel::Beta, &invocation, &paths, &Recorder::default()));
    }
}
