//! Detection of a side-by-side install of the Chromium based browser.
//!
//! Candidate install directories are probed in priority order, per-user
//! before per-machine. The first one found wins, and its version is read
//! from the executable's file metadata. Version lookups never fail the
//! detection; an unreadable version is reported as unknown.
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::{
    config::CoordinatorConfig,
    error::{format_error, AddCoordinatorContext, CoordinatorError},
    invocation::Environment,
    os::{PathProbe, ProcessLauncher},
};

/// Outcome of [`CoexistenceDetector::detect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CoexistenceReport {
    /// None of the candidate directories exist.
    #[default]
    NotInstalled,
    /// The related product was found.
    Installed {
        /// The candidate directory that exists.
        install_path: PathBuf,
        /// Product version, if it could be read.
        version: Option<String>,
    },
}

impl CoexistenceReport {
    /// Returns whether the related product was found.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }

    /// Returns the install directory when found.
    pub fn install_path(&self) -> Option<&Path> {
        match self {
            Self::NotInstalled => None,
            Self::Installed { install_path, .. } => Some(install_path),
        }
    }

    /// Returns the version when found and known.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::NotInstalled => None,
            Self::Installed { version, .. } => version.as_deref(),
        }
    }
}

// Field names are part of the contract with the application shell.
impl Serialize for CoexistenceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NotInstalled => {
                let mut state = serializer.serialize_struct("CoexistenceReport", 1)?;
                state.serialize_field("braveCoreInstalled", &false)?;
                state.end()
            }
            Self::Installed {
                install_path,
                version,
            } => {
                let len = if version.is_some() { 3 } else { 2 };
                let mut state = serializer.serialize_struct("CoexistenceReport", len)?;
                state.serialize_field("braveCoreInstalled", &true)?;
                state.serialize_field("braveCoreInstallPath", install_path)?;
                if let Some(version) = version {
                    state.serialize_field("braveCoreVersion", version)?;
                } else {
                    state.skip_field("braveCoreVersion")?;
                }
                state.end()
            }
        }
    }
}

/// Replaces every `%NAME%` placeholder with the environment variable's value.
///
/// Unset variables become the empty string. A `%` without a closing
/// partner, or an empty `%%` pair, is kept as is.
pub fn expand_template(template: &str, env: &Environment) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        match after.find('%') {
            Some(0) => {
                // "%%" is not a placeholder; the second '%' may open one.
                output.push('%');
                rest = after;
            }
            Some(end) => {
                let name = &after[..end];
                match env.get(name) {
                    Some(value) => output.push_str(&value.to_string_lossy()),
                    None => tracing::debug!(name, "unset variable in path template"),
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}

/// Extracts the product version from `Key=Value` metadata output.
///
/// Four numeric components such as `70.0.56.8` carry the engine's major
/// version first, which is dropped, giving `0.56.8`. Other values are
/// returned unchanged.
pub fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|line| !line.is_empty())?;
    let (_key, value) = line.split_once('=')?;

    if value.contains('=') || value.is_empty() {
        return None;
    }

    let components: Vec<&str> = value.split('.').collect();
    let numeric = components
        .iter()
        .all(|part| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit()));

    if components.len() == 4 && numeric {
        Some(components[1..].join("."))
    } else {
        Some(value.to_string())
    }
}

/// Builds the `wmic` arguments that print a file's version.
///
/// WQL string literals need every backslash doubled.
pub fn version_query_args(exe_path: &Path) -> Vec<OsString> {
    let name = exe_path.to_string_lossy().replace('\\', r"\\");

    vec![
        "datafile".into(),
        "where".into(),
        format!("name='{name}'").into(),
        "get".into(),
        "Version".into(),
        "/value".into(),
    ]
}

const VERSION_QUERY_PROGRAM: &str = "wmic";

/// Looks for an install of the related product.
#[derive(Debug, Clone)]
pub struct CoexistenceDetector {
    candidates: Vec<String>,
    exe_name: String,
    env: Environment,
}

impl CoexistenceDetector {
    /// Create a detector from the configured candidates.
    pub fn new(config: &CoordinatorConfig, env: &Environment) -> Self {
        Self {
            candidates: config.coexistence_candidates.clone(),
            exe_name: config.coexistence_exe_name.clone(),
            env: env.clone(),
        }
    }

    /// Returns the candidate directories with placeholders expanded, in probe order.
    pub fn resolved_candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.candidates
            .iter()
            .map(|template| PathBuf::from(expand_template(template, &self.env)))
    }

    /// Returns the first candidate directory that exists.
    pub fn find_install_path(&self, probe: &dyn PathProbe) -> Option<PathBuf> {
        self.resolved_candidates()
            .find(|candidate| probe.exists(candidate))
    }

    /// Probes the candidates and reads the version of the first match.
    pub fn detect(
        &self,
        probe: &dyn PathProbe,
        launcher: &dyn ProcessLauncher,
    ) -> CoexistenceReport {
        let Some(install_path) = self.find_install_path(probe) else {
            tracing::debug!("related product not installed");
            return CoexistenceReport::NotInstalled;
        };

        tracing::info!(?install_path, "related product already installed");

        let version = match self.query_version(&install_path, launcher) {
            Ok(version) => version,
            Err(error) => {
                tracing::warn!(error = %format_error(&error), "version query failed");
                None
            }
        };

        tracing::debug!(?version, "related product version");

        CoexistenceReport::Installed {
            install_path,
            version,
        }
    }

    fn query_version(
        &self,
        install_path: &Path,
        launcher: &dyn ProcessLauncher,
    ) -> Result<Option<String>, CoordinatorError> {
        let exe_path = install_path.join(&self.exe_name);
        let output = launcher
            .output(
                Path::new(VERSION_QUERY_PROGRAM),
                &version_query_args(&exe_path),
            )
            .coord_contextc(|| format!("querying version of {exe_path:?}"))?;

        Ok(parse_version(&output))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::CoordinatorErrorKind;

    struct RecordingProbe {
        existing: Vec<PathBuf>,
        probed: RefCell<Vec<PathBuf>>,
    }

    impl RecordingProbe {
        fn new(existing: &[&str]) -> Self {
            Self {
                existing: existing.iter().map(PathBuf::from).collect(),
                probed: RefCell::default(),
            }
        }
    }

    impl PathProbe for RecordingProbe {
        fn exists(&self, path: &Path) -> bool {
            self.probed.borrow_mut().push(path.to_path_buf());
            self.existing.iter().any(|item| item == path)
        }
    }

    struct FixedOutput(Result<&'static str, ()>, RefCell<u32>);

    impl FixedOutput {
        fn ok(text: &'static str) -> Self {
            Self(Ok(text), RefCell::new(0))
        }

        fn failing() -> Self {
            Self(Err(()), RefCell::new(0))
        }

        fn calls(&self) -> u32 {
            *self.1.borrow()
        }
    }

    impl ProcessLauncher for FixedOutput {
        fn spawn_detached(&self, _: &Path, _: &[OsString]) -> Result<(), CoordinatorError> {
            unreachable!()
        }

        fn spawn_and_wait(&self, _: &Path, _: &[OsString]) -> Result<i32, CoordinatorError> {
            unreachable!()
        }

        fn output(&self, program: &Path, _: &[OsString]) -> Result<String, CoordinatorError> {
            assert_eq!(program, Path::new("wmic"));
            *self.1.borrow_mut() += 1;
            self.0
                .map(str::to_string)
                .map_err(|_| CoordinatorErrorKind::ProcessLaunch.into())
        }
    }

    fn detector(candidates: &[&str]) -> CoexistenceDetector {
        let config = CoordinatorConfig {
            coexistence_candidates: candidates.iter().map(|item| item.to_string()).collect(),
            ..Default::default()
        };
        let env = Environment::from_iter([("ROOT", "/root"), ("ProgramFiles", "/pf")]);

        CoexistenceDetector::new(&config, &env)
    }

    #[test]
    fn test_expand_template() {
        let env = Environment::from_iter([("USERPROFILE", r"C:\Users\a"), ("X", "x")]);

        assert_eq!(
            expand_template(r"%USERPROFILE%\AppData", &env),
            r"C:\Users\a\AppData"
        );
        assert_eq!(expand_template("%X%%X%", &env), "xx");
        assert_eq!(expand_template("no placeholders", &env), "no placeholders");
    }

    #[test]
    fn test_expand_template_unset_variable_is_empty() {
        let env = Environment::new();

        assert_eq!(
            expand_template(r"%ProgramFiles(x86)%\BraveSoftware", &env),
            r"\BraveSoftware"
        );
    }

    #[test]
    fn test_expand_template_literal_percent() {
        let env = Environment::from_iter([("X", "x")]);

        assert_eq!(expand_template("100%", &env), "100%");
        assert_eq!(expand_template("a%%X%", &env), "a%x");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("\r\n\r\nVersion=70.0.56.8\r\n\r\n").as_deref(),
            Some("0.56.8")
        );
        assert_eq!(parse_version("Version=1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(parse_version("Version=70.0.a.8").as_deref(), Some("70.0.a.8"));
        assert_eq!(parse_version("Version="), None);
        assert_eq!(parse_version("No Instance(s) Available."), None);
        assert_eq!(parse_version("a=b=c"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_version_query_args() {
        let args = version_query_args(Path::new(r"C:\Program Files\Brave\brave.exe"));

        assert_eq!(args[2], r"name='C:\\Program Files\\Brave\\brave.exe'");
        assert_eq!(args.last().unwrap(), "/value");
    }

    #[test]
    fn test_first_match_wins() {
        let detector = detector(&["%ROOT%/a", "%ROOT%/b", "%ProgramFiles%/c"]);
        let probe = RecordingProbe::new(&["/root/b", "/pf/c"]);
        let launcher = FixedOutput::ok("Version=70.0.56.8");

        let report = detector.detect(&probe, &launcher);

        assert_eq!(
            report,
            CoexistenceReport::Installed {
                install_path: PathBuf::from("/root/b"),
                version: Some("0.56.8".to_string()),
            }
        );
        assert_eq!(
            *probe.probed.borrow(),
            vec![PathBuf::from("/root/a"), PathBuf::from("/root/b")]
        );
    }

    #[test]
    fn test_not_installed_skips_version_query() {
        let detector = detector(&["%ROOT%/a", "%ROOT%/b"]);
        let probe = RecordingProbe::new(&[]);
        let launcher = FixedOutput::ok("Version=70.0.56.8");

        let report = detector.detect(&probe, &launcher);

        assert_eq!(report, CoexistenceReport::NotInstalled);
        assert_eq!(launcher.calls(), 0);
        assert_eq!(probe.probed.borrow().len(), 2);
    }

    #[test]
    fn test_version_query_failure_is_unknown_version() {
        let detector = detector(&["%ROOT%/a"]);
        let probe = RecordingProbe::new(&["/root/a"]);
        let launcher = FixedOutput::failing();

        let report = detector.detect(&probe, &launcher);

        assert!(report.is_installed());
        assert_eq!(report.install_path(), Some(Path::new("/root/a")));
        assert_eq!(report.version(), None);
        assert_eq!(launcher.calls(), 1);
    }

    #[test]
    fn test_unset_variable_probes_stripped_path() {
        let detector = detector(&["%MISSING%/a"]);
        let probe = RecordingProbe::new(&[]);

        detector.detect(&probe, &FixedOutput::failing());

        assert_eq!(*probe.probed.borrow(), vec![PathBuf::from("/a")]);
    }
}
