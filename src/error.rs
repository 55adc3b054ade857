//! Common error types.
//!
//! See [`CoordinatorError`] and [`CoordinatorErrorKind`] for details.
use std::fmt::Display;

/// Main error type for this crate.
#[derive(Debug, thiserror::Error)]
pub struct CoordinatorError {
    kind: CoordinatorErrorKind,
    context: String,
    source: Option<Box<dyn std::error::Error + 'static + Send + Sync>>,
}

impl CoordinatorError {
    /// Creates a new error with the given error kind.
    pub fn new(kind: CoordinatorErrorKind) -> Self {
        Self {
            kind,
            context: String::new(),
            source: None,
        }
    }

    /// Adds a source error.
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: std::error::Error + 'static + Send + Sync,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Adds a string with a contextual description of the error.
    pub fn with_context<C>(mut self, value: C) -> Self
    where
        C: AsRef<str>,
    {
        if !self.context.is_empty() {
            self.context.push_str(": ");
        }
        self.context.push_str(value.as_ref());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &CoordinatorErrorKind {
        &self.kind
    }

}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.context.is_empty() {
            f.write_str(&self.context)?;
            f.write_str(": ")?;
        }

        self.kind.fmt(f)?;

        Ok(())
    }
}

impl From<CoordinatorErrorKind> for CoordinatorError {
    fn from(value: CoordinatorErrorKind) -> Self {
        Self::new(value)
    }
}

impl From<std::io::Error> for CoordinatorError {
    fn from(value: std::io::Error) -> Self {
        Self::new(CoordinatorErrorKind::Io).with_source(value)
    }
}

impl From<AdditionalContext> for CoordinatorError {
    fn from(value: AdditionalContext) -> Self {
        let kind = match value.source.downcast_ref::<std::io::Error>() {
            Some(_) => CoordinatorErrorKind::Io,
            None => CoordinatorErrorKind::Other,
        };
        Self::new(kind).with_source(value)
    }
}

/// Error category for [`CoordinatorError`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoordinatorErrorKind {
    /// Input/Output error usually from [`std::io::Error`].
    #[error("input/output error")]
    Io,

    /// The release channel name is not recognized.
    #[error("invalid release channel")]
    InvalidChannel,

    /// Path of the running executable could not be determined.
    #[error("unknown executable path")]
    UnknownExecutablePath,

    /// [`crate::config::CoordinatorConfig`] could not be parsed.
    #[error("malformed configuration")]
    MalformedConfig,

    /// A child process could not be started or did not report its output.
    #[error("process launch failed")]
    ProcessLaunch,

    /// A write-once value was already persisted.
    #[error("value already exists")]
    AlreadyExists,

    /// The application could not be relaunched.
    #[error("relaunch failed")]
    Relaunch,

    /// Any other error.
    #[error("other")]
    Other,
}

impl CoordinatorErrorKind {
    /// Returns whether it is the Io variant.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io)
    }
}

/// Modify `Result<T, CoordinatorError>` with context.
pub trait AddCoordinatorContext<T> {
    /// Add context using the given string when Err.
    fn coord_context<C>(self, context: C) -> Result<T, CoordinatorError>
    where
        C: AsRef<str>;

    /// Add context using the evaluated function when Err.
    fn coord_contextc<C, CT>(self, context: C) -> Result<T, CoordinatorError>
    where
        C: FnOnce() -> CT,
        CT: AsRef<str>;
}

impl<T> AddCoordinatorContext<T> for Result<T, CoordinatorError> {
    fn coord_context<C>(self, context: C) -> Result<T, CoordinatorError>
    where
        C: AsRef<str>,
    {
        self.map_err(|error| error.with_context(context.as_ref()))
    }

    fn coord_contextc<C, CT>(self, context: C) -> Result<T, CoordinatorError>
    where
        C: FnOnce() -> CT,
        CT: AsRef<str>,
    {
        self.map_err(|error| error.with_context(context().as_ref()))
    }
}

/// Contains a contextual description of an error.
///
/// This isn't a real error, but allows injecting context in the error stack.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AdditionalContext {
    message: String,
    #[source]
    source: Box<dyn std::error::Error + Sync + Send + 'static>,
}

impl AdditionalContext {
    /// Creates a new context error with the given message and source error.
    pub fn new<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static,
    {
        Self {
            message,
            source: Box::new(source),
        }
    }
}

/// Trait for wrapping errors in Result with descriptive context strings.
pub trait AddContext<T, E, A> {
    /// Map the error with an error containing the context string.
    fn with_context<C>(self, context: C) -> Result<T, A>
    where
        C: Into<String>;

    /// Map the error with an error containing the context string evaluated from a function.
    fn with_contextc<C, CT>(self, context: C) -> Result<T, A>
    where
        C: FnOnce(&E) -> CT,
        CT: Into<String>;
}

impl<T, E> AddContext<T, E, AdditionalContext> for Result<T, E>
where
    E: std::error::Error + Sync + Send + 'static,
{
    fn with_context<C>(self, context: C) -> Result<T, AdditionalContext>
    where
        C: Into<String>,
    {
        self.map_err(|error| AdditionalContext::new(context.into(), error))
    }

    fn with_contextc<C, CT>(self, context: C) -> Result<T, AdditionalContext>
    where
        C: FnOnce(&E) -> CT,
        CT: Into<String>,
    {
        self.map_err(|error| AdditionalContext::new(context(&error).into(), error))
    }
}

/// Renders an error and its chain of sources on separate lines.
pub fn format_error<E>(error: &E) -> String
where
    E: std::error::Error,
{
    let mut buf = error.to_string();

    let mut source = error.source();

    while let Some(error) = source {
        buf.push_str("\n↳");
        buf.push_str(&error.to_string());
        source = error.source();
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let error = CoordinatorError::new(CoordinatorErrorKind::Relaunch)
            .with_context("first")
            .with_context("second");

        assert_eq!(error.to_string(), "first: second: relaunch failed");
    }

    #[test]
    fn test_io_source_in_chain() {
        let error: CoordinatorError = std::io::Error::other("disk on fire").into();

        assert!(error.kind().is_io());
        assert_eq!(format_error(&error), "input/output error\n↳disk on fire");
    }

    #[test]
    fn test_coord_context_on_result() {
        let result: Result<(), CoordinatorError> =
            Err(CoordinatorErrorKind::ProcessLaunch.into());
        let error = result
            .coord_contextc(|| "querying version")
            .coord_context("startup")
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "querying version: startup: process launch failed"
        );
    }

    #[test]
    fn test_additional_context_keeps_io_kind() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let error: CoordinatorError = result.with_context("copying manifest").unwrap_err().into();

        assert!(error.kind().is_io());
    }

    #[test]
    fn test_format_error_chain() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("inner"));
        let error = result.with_context("outer").unwrap_err();

        assert_eq!(format_error(&error), "outer\n↳inner");
    }
}
