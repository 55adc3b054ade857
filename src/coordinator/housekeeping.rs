use std::ffi::OsString;

use crate::{
    classify::Classification,
    error::format_error,
    invocation::InvocationArgs,
    os::ProcessLauncher,
    path::PathResolver,
    promo::{PromoCodeSource, PromoCodeStore},
};

const UNINSTALL_ARG: &str = "-uninstall";

/// Side effects for install, update, and uninstall events.
///
/// Failures are logged and never stop the remaining steps.
pub struct Housekeeping<'a> {
    paths: &'a PathResolver,
    launcher: &'a dyn ProcessLauncher,
    promo_code_source: Option<&'a dyn PromoCodeSource>,
    promo_code_store: Option<&'a dyn PromoCodeStore>,
}

impl<'a> Housekeeping<'a> {
    pub fn new(paths: &'a PathResolver, launcher: &'a dyn ProcessLauncher) -> Self {
        Self {
            paths,
            launcher,
            promo_code_source: None,
            promo_code_store: None,
        }
    }

    pub fn with_promo_code_source(mut self, source: &'a dyn PromoCodeSource) -> Self {
        self.promo_code_source = Some(source);
        self
    }

    pub fn with_promo_code_store(mut self, store: &'a dyn PromoCodeStore) -> Self {
        self.promo_code_store = Some(store);
        self
    }

    pub fn run(&self, classification: &Classification, args: &InvocationArgs) {
        if classification.is_install_or_update() {
            if classification.install {
                self.persist_promo_code(args);
            }
            self.copy_manifest();
            self.add_defaults();
        } else if classification.uninstall {
            self.remove_defaults();
        }
    }

    fn persist_promo_code(&self, args: &InvocationArgs) {
        let Some(code) = self
            .promo_code_source
            .and_then(|source| source.first_run_promo_code(args))
        else {
            return;
        };

        let Some(store) = self.promo_code_store else {
            tracing::warn!("promo code found but no store configured");
            return;
        };

        tracing::info!("persisting first-run promo code");

        if let Err(error) = store.write_first_run_promo_code(&code) {
            tracing::warn!(
                error = %format_error(&error),
                "failed to persist first-run promo code"
            );
        }
    }

    fn copy_manifest(&self) {
        if let Err(error) = self.paths.copy_manifest() {
            tracing::error!(
                error = %format_error(&error),
                "failed to copy visual elements manifest"
            );
        }
    }

    fn add_defaults(&self) {
        let helper = self.paths.defaults_helper_path();
        tracing::info!(?helper, "starting defaults helper");

        if let Err(error) = self.launcher.spawn_detached(&helper, &[]) {
            tracing::warn!(error = %format_error(&error), "failed to start defaults helper");
        }
    }

    fn remove_defaults(&self) {
        let helper = self.paths.defaults_helper_path();
        tracing::info!(?helper, "removing defaults");

        match self
            .launcher
            .spawn_and_wait(&helper, &[OsString::from(UNINSTALL_ARG)])
        {
            Ok(0) => tracing::debug!("defaults removed"),
            Ok(code) => tracing::warn!(code, "defaults helper failed"),
            Err(error) => {
                tracing::warn!(error = %format_error(&error), "failed to run defaults helper")
            }
        }
    }
}
