//! Lifecycle event classification.
//!
//! Squirrel runs the application with one of the `--squirrel-*` flags when
//! it installs, updates, or removes it. Only exact argument matches count.
use crate::{channel::Channel, invocation::InvocationArgs};

/// Fired by the updater while installing.
pub const SQUIRREL_INSTALL: &str = "--squirrel-install";
/// Fired by the updater after an update was applied.
pub const SQUIRREL_UPDATED: &str = "--squirrel-updated";
/// Fired by the updater before uninstalling.
pub const SQUIRREL_UNINSTALL: &str = "--squirrel-uninstall";
/// Passed on the first launch after an install.
pub const SQUIRREL_FIRSTRUN: &str = "--squirrel-firstrun";
/// Fired on a version that was superseded by an update.
pub const SQUIRREL_OBSOLETE: &str = "--squirrel-obsolete";
/// Marks a process that was started by a profile relaunch.
pub const RELAUNCH: &str = "--relaunch";
/// Profile switch used by development builds regardless of channel.
pub const DEVELOPMENT_OVERRIDE: &str = "--user-data-dir-name=brave-development";

/// The lifecycle flags found in the process arguments.
///
/// Install and first run may both be set. Uninstall is not expected
/// together with install or update, but nothing here rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// `--squirrel-install` is present.
    pub install: bool,
    /// `--squirrel-updated` is present.
    pub update: bool,
    /// `--squirrel-uninstall` is present.
    pub uninstall: bool,
    /// `--squirrel-firstrun` is present.
    pub first_run: bool,
    /// `--relaunch` is present.
    pub relaunch: bool,
    /// The development profile override is present.
    pub development_override: bool,
    /// The expected profile switch for the channel.
    pub user_data_dir_switch: String,
    /// The expected profile switch is present.
    pub has_user_data_dir_switch: bool,
}

impl Classification {
    /// Returns whether this invocation handles an install or update event.
    pub fn is_install_or_update(&self) -> bool {
        self.install || self.update
    }

    /// Returns whether the process already carries a marker that makes a
    /// profile relaunch unnecessary.
    pub fn has_continuation_marker(&self) -> bool {
        self.has_user_data_dir_switch || self.relaunch || self.development_override
    }
}

/// Inspects the arguments for lifecycle flags.
///
/// `development_override` is the switch that exempts a process from
/// profile normalization, usually [`DEVELOPMENT_OVERRIDE`].
pub fn classify(
    channel: Channel,
    args: &InvocationArgs,
    development_override: &str,
) -> Classification {
    let user_data_dir_switch = channel.user_data_dir_switch();

    let classification = Classification {
        install: args.contains(SQUIRREL_INSTALL),
        update: args.contains(SQUIRREL_UPDATED),
        uninstall: args.contains(SQUIRREL_UNINSTALL),
        first_run: args.contains(SQUIRREL_FIRSTRUN),
        relaunch: args.contains(RELAUNCH),
        development_override: args.contains(development_override),
        has_user_data_dir_switch: args.contains(&user_data_dir_switch),
        user_data_dir_switch,
    };

    tracing::debug!(%channel, ?classification, "classified invocation");

    classification
}
