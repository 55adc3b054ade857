//! Locating files relative to the running executable.
//!
//! Squirrel installs every version of the application into its own
//! `app-<version>` directory beneath a shared update root:
//!
//! * `<update root>/Update.exe`
//! * `<update root>/app-<version>/<executable>`
//! * `<update root>/app-<version>/resources/<defaults helper>`
//! * `<update root>/app-<version>/resources/<visual elements manifest>`
//!
//! The visual elements manifest customizes the Start menu tile and has to
//! live next to `Update.exe`, so it is copied there on install and update.
use std::path::{Path, PathBuf};

use crate::{
    config::CoordinatorConfig,
    error::{AddContext, CoordinatorError, CoordinatorErrorKind},
};

const RESOURCES_DIR: &str = "resources";

/// Resolves the paths of files shipped with the application.
///
/// Every method is a pure function of the executable path and config
/// given at construction.
#[derive(Debug, Clone)]
pub struct PathResolver {
    bin_dir: PathBuf,
    defaults_helper_name: String,
    visual_manifest_name: String,
    update_exe_name: String,
}

impl PathResolver {
    /// Create a new path resolver for the given executable.
    pub fn new<P: AsRef<Path>>(
        exe_path: P,
        config: &CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let exe_path = exe_path.as_ref();
        let bin_dir = exe_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                CoordinatorError::new(CoordinatorErrorKind::UnknownExecutablePath)
                    .with_context(format!("no parent directory for {exe_path:?}"))
            })?;

        Ok(Self {
            bin_dir: bin_dir.to_path_buf(),
            defaults_helper_name: config.defaults_helper_name.clone(),
            visual_manifest_name: config.visual_manifest_name.clone(),
            update_exe_name: config.update_exe_name.clone(),
        })
    }

    /// Returns the directory containing the running executable.
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Returns the path of the defaults helper binary.
    pub fn defaults_helper_path(&self) -> PathBuf {
        self.bin_dir
            .join(RESOURCES_DIR)
            .join(&self.defaults_helper_name)
    }

    /// Returns the path of the visual elements manifest shipped with this version.
    pub fn manifest_source_path(&self) -> PathBuf {
        self.bin_dir
            .join(RESOURCES_DIR)
            .join(&self.visual_manifest_name)
    }

    /// Returns the parent of [`Self::bin_dir`], where the updater lives.
    ///
    /// When the executable sits at a filesystem root, the root is returned.
    pub fn update_root_dir(&self) -> &Path {
        self.bin_dir.parent().unwrap_or(&self.bin_dir)
    }

    /// Returns the path of the Squirrel updater.
    pub fn update_exe_path(&self) -> PathBuf {
        self.update_root_dir().join(&self.update_exe_name)
    }

    /// Returns where [`Self::copy_manifest`] places the manifest.
    pub fn manifest_destination_path(&self) -> PathBuf {
        self.update_root_dir().join(&self.visual_manifest_name)
    }

    /// Copies the visual elements manifest into the update root,
    /// replacing any existing copy, and returns the destination.
    pub fn copy_manifest(&self) -> Result<PathBuf, CoordinatorError> {
        let source = self.manifest_source_path();
        let destination = self.manifest_destination_path();

        tracing::info!(?source, ?destination, "copying visual elements manifest");

        std::fs::copy(&source, &destination).with_contextc(|_error| {
            format!("failed to copy file {source:?} {destination:?}")
        })?;

        Ok(destination)
    }
}
