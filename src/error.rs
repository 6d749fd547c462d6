use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("encoder failed: {0}")]
    Encoder(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl WorkerError {
    /// Whether requeueing the message has a chance of succeeding later.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            WorkerError::Configuration(_) | WorkerError::MalformedMessage(_)
        )
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::MalformedMessage(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Workspace,
    Fetch,
    Encode(String),
    Manifest,
    Upload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Workspace => f.write_str("workspace"),
            Phase::Fetch => f.write_str("fetch"),
            Phase::Encode(rendition) => write!(f, "encode {}", rendition),
            Phase::Manifest => f.write_str("manifest"),
            Phase::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{phase} phase failed: {source}")]
pub struct JobError {
    pub phase: Phase,
    #[source]
    pub source: WorkerError,
}

impl JobError {
    pub fn new(phase: Phase, source: WorkerError) -> Self {
        Self { phase, source }
    }

    /// Workspace failures point at the host environment, so they are never
    /// worth a retry on this worker.
    pub fn is_retryable(&self) -> bool {
        self.phase != Phase::Workspace && self.source.is_retryable()
    }
}

/// Attaches a phase to a fallible step of the job pipeline.
pub trait PhaseExt<T> {
    fn in_phase(self, phase: Phase) -> Result<T, JobError>;
}

impl<T, E> PhaseExt<T> for Result<T, E>
where
    E: Into<WorkerError>,
{
    fn in_phase(self, phase: Phase) -> Result<T, JobError> {
        self.map_err(|e| JobError::new(phase, e.into()))
    }
}
