//! First-run promo codes.
//!
//! An installer can be given a referral promo code which has to survive
//! until the browser runs for the first time. It is extracted while
//! handling the install event and written once to disk.
use std::{
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    error::{CoordinatorError, CoordinatorErrorKind},
    invocation::InvocationArgs,
};

/// Extracts a first-run promo code from the process arguments.
pub trait PromoCodeSource {
    /// Returns the promo code, if the arguments carry one.
    fn first_run_promo_code(&self, args: &InvocationArgs) -> Option<String>;
}

impl<F> PromoCodeSource for F
where
    F: Fn(&InvocationArgs) -> Option<String>,
{
    fn first_run_promo_code(&self, args: &InvocationArgs) -> Option<String> {
        self(args)
    }
}

/// Persists a first-run promo code.
pub trait PromoCodeStore {
    /// Writes the promo code.
    fn write_first_run_promo_code(&self, code: &str) -> Result<(), CoordinatorError>;
}

/// Stores the promo code in a single file.
///
/// The file is written once. If it already exists it is kept and
/// [`CoordinatorErrorKind::AlreadyExists`] is returned.
#[derive(Debug, Clone)]
pub struct FilePromoCodeStore {
    path: PathBuf,
}

impl FilePromoCodeStore {
    /// Create a store writing to the given file.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a previously stored promo code.
    pub fn read(&self) -> Result<Option<String>, CoordinatorError> {
        match std::fs::read_to_string(&self.path) {
            Ok(code) => Ok(Some(code)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }
}

impl PromoCodeStore for FilePromoCodeStore {
    fn write_first_run_promo_code(&self, code: &str) -> Result<(), CoordinatorError> {
        if self.path.exists() {
            return Err(CoordinatorError::new(CoordinatorErrorKind::AlreadyExists)
                .with_context(format!("promo code file {:?}", self.path)));
        }

        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        tracing::debug!(?dir, "creating directories");
        std::fs::create_dir_all(dir)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        temp_file.write_all(code.as_bytes())?;
        temp_file.flush()?;

        tracing::info!(path = ?self.path, "persisting first-run promo code");

        temp_file.persist_noclobber(&self.path).map_err(|error| {
            if error.error.kind() == std::io::ErrorKind::AlreadyExists {
                CoordinatorError::new(CoordinatorErrorKind::AlreadyExists).with_source(error.error)
            } else {
                CoordinatorError::from(error.error)
            }
        })?;

        Ok(())
    }
}
