//! Startup coordination.
//!
//! Steps, in order. Each one may end the sequence:
//!
//! 1. Install or update: persist the first-run promo code (install only),
//!    copy the visual elements manifest, start the defaults helper detached.
//! 2. Uninstall: run the defaults helper with `-uninstall` and wait for it,
//!    so it finishes before the uninstaller removes its files.
//! 3. Ask the [`ExitGate`] whether the process only existed for the event.
//!    An uninstall always ends here.
//! 4. Relaunch with the channel's profile switch if it is missing.
//! 5. Proceed: tag the process with the channel's app user model ID and
//!    report whether the related product is installed.
//!
//! The side effects in steps 1 and 2 are best-effort and only logged
//! on failure.
use crate::{
    channel::{Channel, ChannelResolver},
    classify::{classify, Classification},
    coexist::{CoexistenceDetector, CoexistenceReport},
    config::CoordinatorConfig,
    error::{format_error, AddCoordinatorContext, CoordinatorError},
    gate::{ExitGate, SquirrelShortcutGate},
    invocation::Invocation,
    os::{FsProbe, PathProbe, ProcessLauncher, SystemLauncher},
    path::PathResolver,
    promo::{PromoCodeSource, PromoCodeStore},
    shell::{AppShell, RelaunchRequest},
};

use self::housekeeping::Housekeeping;

pub use self::relaunch::relaunch_args;

mod housekeeping;
mod relaunch;

/// What the current process does after coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    /// Exit immediately with status 0.
    Terminate,
    /// Start a new process with a corrected profile switch, then exit.
    Relaunch(RelaunchRequest),
    /// Continue starting the application.
    Proceed(ProceedPlan),
}

/// Details for [`ActionPlan::Proceed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceedPlan {
    /// App user model ID to set before the shell finishes launching.
    pub app_user_model_id: &'static str,
    /// Whether the related product is installed.
    pub coexistence: CoexistenceReport,
}

/// Coordinates updater lifecycle events at startup.
pub struct Coordinator {
    invocation: Invocation,
    channel: Channel,
    config: CoordinatorConfig,
    launcher: Box<dyn ProcessLauncher>,
    probe: Box<dyn PathProbe>,
    exit_gate: Box<dyn ExitGate>,
    promo_code_source: Option<Box<dyn PromoCodeSource>>,
    promo_code_store: Option<Box<dyn PromoCodeStore>>,
}

impl Coordinator {
    /// Create a coordinator for the given invocation.
    ///
    /// The channel is resolved here, once.
    pub fn new(
        invocation: Invocation,
        resolver: &dyn ChannelResolver,
        config: &CoordinatorConfig,
    ) -> Self {
        let channel = resolver.channel();
        tracing::debug!(%channel, "resolved channel");

        Self {
            invocation,
            channel,
            config: config.clone(),
            launcher: Box::new(SystemLauncher),
            probe: Box::new(FsProbe),
            exit_gate: Box::new(SquirrelShortcutGate),
            promo_code_source: None,
            promo_code_store: None,
        }
    }

    /// Replaces how child processes are started.
    pub fn with_launcher<L>(mut self, launcher: L) -> Self
    where
        L: ProcessLauncher + 'static,
    {
        self.launcher = Box::new(launcher);
        self
    }

    /// Replaces how install directories are checked for existence.
    pub fn with_path_probe<P>(mut self, probe: P) -> Self
    where
        P: PathProbe + 'static,
    {
        self.probe = Box::new(probe);
        self
    }

    /// Replaces the early exit decision.
    pub fn with_exit_gate<G>(mut self, exit_gate: G) -> Self
    where
        G: ExitGate + 'static,
    {
        self.exit_gate = Box::new(exit_gate);
        self
    }

    /// Sets where the first-run promo code comes from.
    pub fn with_promo_code_source<S>(mut self, source: S) -> Self
    where
        S: PromoCodeSource + 'static,
    {
        self.promo_code_source = Some(Box::new(source));
        self
    }

    /// Sets where the first-run promo code is written.
    pub fn with_promo_code_store<S>(mut self, store: S) -> Self
    where
        S: PromoCodeStore + 'static,
    {
        self.promo_code_store = Some(Box::new(store));
        self
    }

    /// Returns the resolved channel.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Performs the housekeeping for the lifecycle event and consults the
    /// exit gate, then returns how the process continues.
    ///
    /// The event side effects happen here. Exiting and relaunching are left
    /// to [`Self::run`].
    pub fn handle_events(&self) -> Result<ActionPlan, CoordinatorError> {
        let paths = PathResolver::new(self.invocation.exe_path(), &self.config)
            .coord_context("resolving install layout")?;
        let classification = classify(
            self.channel,
            &self.invocation.args,
            &self.config.development_override_switch,
        );

        self.housekeeping(&paths).run(&classification, &self.invocation.args);

        let gate_exit = self.exit_gate.should_exit(
            self.channel,
            &self.invocation,
            &paths,
            self.launcher.as_ref(),
        );

        Ok(self.decide(&classification, gate_exit))
    }

    fn housekeeping<'a>(&'a self, paths: &'a PathResolver) -> Housekeeping<'a> {
        let mut housekeeping = Housekeeping::new(paths, self.launcher.as_ref());
        if let Some(source) = &self.promo_code_source {
            housekeeping = housekeeping.with_promo_code_source(source.as_ref());
        }
        if let Some(store) = &self.promo_code_store {
            housekeeping = housekeeping.with_promo_code_store(store.as_ref());
        }
        housekeeping
    }

    /// Chooses the action once the event side effects are done.
    ///
    /// Only the coexistence lookup on [`ActionPlan::Proceed`] touches the
    /// system.
    fn decide(&self, classification: &Classification, gate_exit: bool) -> ActionPlan {
        if gate_exit || classification.uninstall {
            tracing::info!(gate_exit, uninstall = classification.uninstall, "terminating");
            return ActionPlan::Terminate;
        }

        if let Some(request) = relaunch::profile_relaunch(
            self.channel,
            classification,
            &self.invocation,
            &self.config.user_data_dir_env,
        ) {
            tracing::info!(args = ?request.args, "profile switch missing, relaunching");
            return ActionPlan::Relaunch(request);
        }

        let coexistence = CoexistenceDetector::new(&self.config, &self.invocation.env)
            .detect(self.probe.as_ref(), self.launcher.as_ref());

        ActionPlan::Proceed(ProceedPlan {
            app_user_model_id: self.channel.app_user_model_id(),
            coexistence,
        })
    }

    /// Handles the lifecycle event and then carries out the plan through
    /// the shell.
    ///
    /// Returns the coexistence report when the application may proceed.
    /// When the plan cannot be made or the relaunch fails, the shell is
    /// asked to exit with status 1 and the error is returned.
    pub fn run(
        self,
        shell: &mut dyn AppShell,
    ) -> Result<Option<CoexistenceReport>, CoordinatorError> {
        let plan = match self.handle_events() {
            Ok(plan) => plan,
            Err(error) => {
                tracing::error!(error = %format_error(&error), "could not plan startup");
                shell.exit(1);
                return Err(error);
            }
        };

        tracing::debug!(?plan, "created plan");

        match plan {
            ActionPlan::Terminate => {
                shell.exit(0);
                Ok(None)
            }
            ActionPlan::Relaunch(request) => {
                if let Err(error) = shell.relaunch(&request) {
                    tracing::error!(error = %format_error(&error), "relaunch failed");
                    shell.exit(1);
                    return Err(error);
                }
                shell.exit(0);
                Ok(None)
            }
            ActionPlan::Proceed(proceed) => {
                shell.register_app_user_model_id(proceed.app_user_model_id);
                Ok(Some(proceed.coexistence))
            }
        }
    }
}
