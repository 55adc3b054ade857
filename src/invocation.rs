//! Read-only snapshot of the process state the coordinator works from.
//!
//! Arguments and environment variables are captured once and never edited
//! in place. Operations that need a different environment, such as a
//! relaunch, derive a new [`Environment`] from the snapshot.
use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use crate::error::{CoordinatorError, CoordinatorErrorKind};

/// The ordered arguments the process was started with.
///
/// The first item is the program name, as in [`std::env::args_os()`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    args: Vec<OsString>,
}

impl InvocationArgs {
    /// Creates arguments from anything yielding strings, program name first.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Captures the arguments of the current process.
    pub fn from_process() -> Self {
        Self::new(std::env::args_os())
    }

    /// Returns whether any argument, including the program name, equals `flag`.
    pub fn contains<F: AsRef<OsStr>>(&self, flag: F) -> bool {
        let flag = flag.as_ref();
        self.args.iter().any(|arg| arg == flag)
    }

    /// Returns all arguments including the program name.
    pub fn as_slice(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the arguments after the program name.
    pub fn user_args(&self) -> &[OsString] {
        self.args.get(1..).unwrap_or_default()
    }

    /// Returns the first argument after the program name.
    pub fn first_user_arg(&self) -> Option<&OsStr> {
        self.user_args().first().map(OsString::as_os_str)
    }
}

/// A snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the environment of the current process.
    pub fn from_process() -> Self {
        std::env::vars_os().collect()
    }

    /// Returns the value of a variable.
    ///
    /// An exact match is preferred. Otherwise names are compared
    /// ignoring ASCII case, as Windows does.
    pub fn get<K: AsRef<OsStr>>(&self, key: K) -> Option<&OsStr> {
        let key = key.as_ref();
        tracing::trace!(?key, "env get");

        if let Some(value) = self.vars.get(key) {
            return Some(value);
        }

        self.vars
            .iter()
            .find(|(name, _)| {
                name.as_encoded_bytes()
                    .eq_ignore_ascii_case(key.as_encoded_bytes())
            })
            .map(|(_, value)| value.as_os_str())
    }

    /// Returns whether a variable is set.
    pub fn contains<K: AsRef<OsStr>>(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Returns a copy of this snapshot with the variable removed.
    ///
    /// Every spelling that [`Self::get`] would match is removed.
    pub fn without<K: AsRef<OsStr>>(&self, key: K) -> Self {
        let key = key.as_ref();

        Self {
            vars: self
                .vars
                .iter()
                .filter(|(name, _)| {
                    !name
                        .as_encoded_bytes()
                        .eq_ignore_ascii_case(key.as_encoded_bytes())
                })
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Returns a copy of this snapshot with the variable set.
    pub fn with<K: Into<OsString>, V: Into<OsString>>(&self, key: K, value: V) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.into(), value.into());
        Self { vars }
    }

    /// Iterates over the variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars
            .iter()
            .map(|(name, value)| (name.as_os_str(), value.as_os_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Everything the coordinator reads from the running process.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Process arguments.
    pub args: InvocationArgs,
    /// Environment variables.
    pub env: Environment,
    /// Full path of the running executable.
    pub exe_path: PathBuf,
}

impl Invocation {
    /// Creates an invocation from explicit parts.
    pub fn new<P: Into<PathBuf>>(args: InvocationArgs, env: Environment, exe_path: P) -> Self {
        Self {
            args,
            env,
            exe_path: exe_path.into(),
        }
    }

    /// Captures the current process.
    pub fn from_process() -> Result<Self, CoordinatorError> {
        let exe_path = std::env::current_exe().map_err(|error| {
            CoordinatorError::new(CoordinatorErrorKind::UnknownExecutablePath).with_source(error)
        })?;

        Ok(Self::new(
            InvocationArgs::from_process(),
            Environment::from_process(),
            exe_path,
        ))
    }

    /// Returns the path of the running executable.
    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = InvocationArgs::new(["brave.exe", "--squirrel-firstrun", "https://a.test"]);

        assert!(args.contains("--squirrel-firstrun"));
        assert!(!args.contains("--squirrel"));
        assert_eq!(args.user_args().len(), 2);
        assert_eq!(args.first_user_arg(), Some(OsStr::new("--squirrel-firstrun")));
    }

    #[test]
    fn test_empty_args() {
        let args = InvocationArgs::default();

        assert!(args.user_args().is_empty());
        assert_eq!(args.first_user_arg(), None);
    }

    #[test]
    fn test_env_case_insensitive() {
        let env = Environment::from_iter([("ProgramFiles", r"C:\Program Files")]);

        assert_eq!(env.get("ProgramFiles"), Some(OsStr::new(r"C:\Program Files")));
        assert_eq!(env.get("PROGRAMFILES"), Some(OsStr::new(r"C:\Program Files")));
        assert_eq!(env.get("HOME"), None);
    }

    #[test]
    fn test_env_without_leaves_original() {
        let env = Environment::from_iter([("CHROME_USER_DATA_DIR", "x"), ("PATH", "y")]);
        let cleared = env.without("chrome_user_data_dir");

        assert!(env.contains("CHROME_USER_DATA_DIR"));
        assert!(!cleared.contains("CHROME_USER_DATA_DIR"));
        assert!(cleared.contains("PATH"));
    }
}
