use std::fmt::Display;

use thiserror::Error;

/// Failure kinds shared by every stage of a request.
///
/// Each stage converts the failures of its external collaborators into one of
/// these variants at its own boundary; the variant decides the remediation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Could not provision artifact '{artifact}': {cause}")]
    Provision { artifact: String, cause: String },

    #[error("Could not load index '{index}': {cause}")]
    Load { index: String, cause: String },

    #[error("Similarity search failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<E: Display>(err: E) -> Self {
        Error::Configuration(err.to_string())
    }

    pub fn provision<E: Display>(artifact: &str, err: E) -> Self {
        Error::Provision { artifact: artifact.to_string(), cause: format!("{:#}", err) }
    }

    pub fn load<E: Display>(index: &str, err: E) -> Self {
        Error::Load { index: index.to_string(), cause: format!("{:#}", err) }
    }

    pub fn retrieval<E: Display>(err: E) -> Self {
        Error::Retrieval(format!("{:#}", err))
    }

    pub fn generation<E: Display>(err: E) -> Self {
        Error::Generation(format!("{:#}", err))
    }

    /// Stable name of the error kind, used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::Provision { .. } => "ProvisionError",
            Error::Load { .. } => "LoadError",
            Error::Retrieval(_) => "RetrievalError",
            Error::Generation(_) => "GenerationError",
        }
    }

    /// Retrieval and generation usually fail on flaky remote services.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Retrieval(_) | Error::Generation(_))
    }

    /// One-line operator hint printed next to the diagnostic.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "check config.toml and the APP_* environment variables",
            Error::Provision { .. } => "make sure the admin index build has been run for this style",
            Error::Load { .. } => "the published index is unreadable or was built with another embedding model; rebuild it",
            Error::Retrieval(_) | Error::Generation(_) => "the remote service may be temporarily unavailable; try again",
        }
    }
}
