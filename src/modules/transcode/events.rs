use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// A single transcoding request as published on the jobs queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub filename: String,
}

impl JobDescriptor {
    /// Decodes and validates a message body. Every failure here is a poison
    /// message: retrying the same bytes can never succeed.
    pub fn from_payload(payload: &[u8]) -> Result<Self, WorkerError> {
        let job: JobDescriptor = serde_json::from_slice(payload)?;
        job.validate()?;
        Ok(job)
    }

    // The id doubles as a workspace directory name and an object key prefix.
    fn validate(&self) -> Result<(), WorkerError> {
        if !is_single_component(&self.id) {
            return Err(WorkerError::MalformedMessage(format!(
                "job id {:?} is not a usable path component",
                self.id
            )));
        }
        if !is_single_component(&self.filename) {
            return Err(WorkerError::MalformedMessage(format!(
                "filename {:?} is not a plain file name",
                self.filename
            )));
        }
        if self.source_url.trim().is_empty() {
            return Err(WorkerError::MalformedMessage("source url is empty".into()));
        }
        Ok(())
    }
}

pub(crate) fn is_single_component(value: &str) -> bool {
    if value.is_empty() || value.contains('/') || value.contains('\\') {
        return false;
    }
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
