//! Error types.
//!
//! Callers only ever see three outcomes: a validation message, a generic
//! generation failure, or a generic export failure. The underlying causes are
//! kept as sources so they can be logged.

use thiserror::Error;

/// Top-level error for generation and export.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to generate policies")]
    Generation(#[source] GenerationError),

    #[error("Failed to export policies")]
    Export(#[source] ExportFailure),
}

/// Why an LLM call failed.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request to LLM provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM provider returned no content")]
    EmptyResponse,
}

/// Why an export failed.
#[derive(Error, Debug)]
pub enum ExportFailure {
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rendered {0} is empty")]
    EmptyDocument(String),

    #[error("export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PolicyError>;

impl PolicyError {
    /// Log the full cause chain and return self, for use in `map_err`.
    pub fn logged(self) -> Self {
        match &self {
            PolicyError::Validation(msg) => log::warn!("validation failed: {msg}"),
            PolicyError::Generation(cause) => log::error!("Error generating policies: {cause}"),
            PolicyError::Export(cause) => log::error!("Error exporting policies: {cause}"),
        }
        self
    }
}

impl From<GenerationError> for PolicyError {
    fn from(err: GenerationError) -> Self {
        PolicyError::Generation(err)
    }
}

impl From<ExportFailure> for PolicyError {
    fn from(err: ExportFailure) -> Self {
        PolicyError::Export(err)
    }
}
