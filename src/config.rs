//! Coordinator settings loaded from RON files.
use std::{
    io::{Cursor, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    classify::DEVELOPMENT_OVERRIDE,
    error::{AddContext, AddCoordinatorContext, CoordinatorError, CoordinatorErrorKind},
};

/// Names and locations the coordinator works with.
///
/// The defaults match the layout Squirrel produces for the browser:
///
/// ```text
/// <update root>/Update.exe
/// <update root>/Update.VisualElementsManifest.xml   (copied on install)
/// <update root>/app-<version>/brave.exe             (running executable)
/// <update root>/app-<version>/resources/braveDefaults.exe
/// <update root>/app-<version>/resources/Update.VisualElementsManifest.xml
/// ```
///
/// Configuration files use RON and may leave out any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CoordinatorConfig {
    /// File name of the defaults helper inside `resources`.
    pub defaults_helper_name: String,
    /// File name of the Start menu tile manifest inside `resources`.
    pub visual_manifest_name: String,
    /// File name of the Squirrel updater in the update root.
    pub update_exe_name: String,
    /// Install directories of the related product, highest priority first.
    ///
    /// `%NAME%` placeholders are replaced with environment variables.
    pub coexistence_candidates: Vec<String>,
    /// Executable of the related product inside its install directory.
    pub coexistence_exe_name: String,
    /// Environment variable overriding the profile directory.
    ///
    /// It is not passed on to a relaunched process.
    pub user_data_dir_env: String,
    /// Switch that exempts a process from profile normalization.
    pub development_override_switch: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            defaults_helper_name: "braveDefaults.exe".to_string(),
            visual_manifest_name: "Update.VisualElementsManifest.xml".to_string(),
            update_exe_name: "Update.exe".to_string(),
            coexistence_candidates: vec![
                r"%USERPROFILE%\AppData\Local\BraveSoftware\Brave-Browser\Application".to_string(),
                r"%ProgramFiles(x86)%\BraveSoftware\Brave-Browser\Application".to_string(),
                r"%ProgramFiles%\BraveSoftware\Brave-Browser\Application".to_string(),
            ],
            coexistence_exe_name: "brave.exe".to_string(),
            user_data_dir_env: "CHROME_USER_DATA_DIR".to_string(),
            development_override_switch: DEVELOPMENT_OVERRIDE.to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Deserialize from the given path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoordinatorError> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading config");

        let buf =
            std::fs::read(path).with_contextc(|_error| format!("could not open file {path:?}"))?;

        Self::from_reader(Cursor::new(buf)).coord_contextc(|| format!("config file {path:?}"))
    }

    /// Deserialize from the given reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoordinatorError> {
        ron::de::from_reader::<R, Self>(reader).map_err(|error| {
            CoordinatorError::new(CoordinatorErrorKind::MalformedConfig).with_source(error)
        })
    }

    /// Serialize to a pretty RON string.
    pub fn to_ron_string(&self) -> Result<String, CoordinatorError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|error| CoordinatorError::new(CoordinatorErrorKind::Other).with_source(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = CoordinatorConfig::from_reader(Cursor::new(
            r#"(defaults_helper_name: "helper.exe", coexistence_candidates: ["%HOME%/app"])"#,
        ))
        .unwrap();

        assert_eq!(config.defaults_helper_name, "helper.exe");
        assert_eq!(config.coexistence_candidates, vec!["%HOME%/app"]);
        assert_eq!(config.user_data_dir_env, "CHROME_USER_DATA_DIR");
    }

    #[test]
    fn test_malformed_config() {
        let error = CoordinatorConfig::from_reader(Cursor::new("(defaults_helper_name: 5)"))
            .unwrap_err();

        assert!(matches!(error.kind(), CoordinatorErrorKind::MalformedConfig));
    }

    #[test]
    fn test_ron_round_trip_of_defaults() {
        let config = CoordinatorConfig::default();
        let text = config.to_ron_string().unwrap();

        assert_eq!(
            CoordinatorConfig::from_reader(Cursor::new(text)).unwrap(),
            config
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = CoordinatorConfig::load(dir.path().join("missing.ron")).unwrap_err();

        assert!(error.kind().is_io());
    }

    #[test]
    fn test_load_malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("startup.ron");
        std::fs::write(&path, "(update_exe_name: [])").unwrap();

        let error = CoordinatorConfig::load(&path).unwrap_err();

        assert!(matches!(error.kind(), CoordinatorErrorKind::MalformedConfig));
        assert!(error.to_string().contains("startup.ron"));
    }
}
