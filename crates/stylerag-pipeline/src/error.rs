use std::fmt;

use thiserror::Error;

use stylerag_core::Error;

/// Where a request was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    IndexLoading,
    Retrieving,
    Composing,
    Generating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::IndexLoading => "index loading",
            Stage::Retrieving => "retrieval",
            Stage::Composing => "prompt composition",
            Stage::Generating => "generation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Refused before any stage ran.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("{stage} failed: {source}")]
    Failed { stage: Stage, source: Error },
}

impl PipelineError {
    pub fn failed(stage: Stage, source: Error) -> Self {
        tracing::warn!(%stage, kind = source.kind(), error = %source, "request failed");
        PipelineError::Failed { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Rejected(_) => None,
            PipelineError::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn cause(&self) -> Option<&Error> {
        match self {
            PipelineError::Rejected(_) => None,
            PipelineError::Failed { source, .. } => Some(source),
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            PipelineError::Rejected(_) => "enter a question and try again",
            PipelineError::Failed { source, .. } => source.remediation(),
        }
    }
}
