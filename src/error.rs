//! Error taxonomy shared by the store, the mapping engine, and the loader.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required entity or relationship hop did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local and external data disagree on an invariant.
    #[error("integrity fault: {0}")]
    Integrity(String),

    /// More than one row where the model allows exactly one.
    #[error("multiple rows where one was expected: {0}")]
    MultipleRows(String),

    /// Input failed validation; nothing was written or submitted.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The external sequence service could not be used.
    #[error("upstream service error: {0}")]
    Upstream(String),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Error::NotFound(what.to_string())
    }

    /// Shortcut for a validation error on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        Error::Validation(errors)
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Store(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(anyhow::Error::new(err))
    }
}

/// Per-field validation messages, keyed by field path such as `[0].transcripts[1].enst_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct ValidationErrors(pub IndexMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` if no message was collected, the validation error otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
                .join("; ")
        )
    }
}
