//! Squirrel lifecycle handling for the Windows browser at startup.
//!
//! The Squirrel updater starts the application with flags such as
//! `--squirrel-install` whenever it installs, updates, or removes it.
//! This crate runs before the application shell, performs the one-time
//! housekeeping for those events, and decides whether the process should
//! exit, relaunch with the channel's profile directory, or proceed.
//!
//! ## Example
//!
//! ```no_run
//! # use squirrel_startup::{channel::Channel, config::CoordinatorConfig, shell::ProcessShell};
//! let mut shell = ProcessShell::new();
//! let report = squirrel_startup::run(&Channel::Beta, &CoordinatorConfig::default(), &mut shell)
//!     .unwrap();
//!
//! // Only reached when the application should proceed.
//! if let Some(report) = report {
//!     println!("related product installed: {}", report.is_installed());
//! }
//! ```
//!
//! ## Ordering
//!
//! The defaults helper is started detached on install and update, but on
//! uninstall the coordinator waits for it. The helper has to be done with
//! its files before the uninstaller deletes them.
//!
//! ## Profile directories
//!
//! Every channel except `dev` runs with
//! `--user-data-dir-name=brave-<channel>`. A process started without it
//! (and without `--relaunch` or the development override) is replaced by
//! one that has it. The `CHROME_USER_DATA_DIR` override is not passed on.
//!
//! ## Testing
//!
//! Process state is read once into an [`Invocation`](invocation::Invocation)
//! and every outside effect goes through a trait:
//! [`ProcessLauncher`](os::ProcessLauncher), [`PathProbe`](os::PathProbe),
//! [`ExitGate`](gate::ExitGate), the promo code traits, and
//! [`AppShell`](shell::AppShell). [`Coordinator::handle_events`] performs the
//! housekeeping and returns the decision without exiting.
use channel::ChannelResolver;
use coexist::CoexistenceReport;
use config::CoordinatorConfig;
use error::{format_error, CoordinatorError};
use invocation::Invocation;
use shell::AppShell;

pub use coordinator::{relaunch_args, ActionPlan, Coordinator, ProceedPlan};

pub mod channel;
pub mod classify;
pub mod coexist;
pub mod config;
mod coordinator;
pub mod error;
pub mod gate;
pub mod invocation;
pub mod os;
pub mod path;
pub mod promo;
pub mod shell;

/// Runs the coordinator for the current process.
///
/// The process arguments, environment, and executable path are captured,
/// then [`Coordinator::run`] carries out the plan through `shell`.
///
/// Returns the coexistence report when the application should proceed.
/// If the executable path cannot be determined, the shell is asked to
/// exit with status 1.
pub fn run(
    resolver: &dyn ChannelResolver,
    config: &CoordinatorConfig,
    shell: &mut dyn AppShell,
) -> Result<Option<CoexistenceReport>, CoordinatorError> {
    let invocation = match Invocation::from_process() {
        Ok(invocation) => invocation,
        Err(error) => {
            tracing::error!(error = %format_error(&error), "could not capture invocation");
            shell.exit(1);
            return Err(error);
        }
    };

    Coordinator::new(invocation, resolver, config).run(shell)
}
