//! Rendition ladder.
//!
//! The ladder is plain data ordered from highest to lowest quality. Its order
//! drives both the encode sequence and the variant order in the master
//! playlist, so adding a rung is a table edit (or a `LADDER_FILE`), not a
//! code change.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;
use crate::modules::transcode::events::is_single_component;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub name: String,
    pub target_height: u32,
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
}

impl RenditionSpec {
    fn new(name: &str, target_height: u32, bandwidth: u64, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            target_height,
            bandwidth,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    renditions: Vec<RenditionSpec>,
}

impl Ladder {
    pub fn new(renditions: Vec<RenditionSpec>) -> Result<Self, WorkerError> {
        if renditions.is_empty() {
            return Err(WorkerError::Configuration("rendition ladder is empty".into()));
        }

        let mut seen = HashSet::new();
        for spec in &renditions {
            if !is_single_component(&spec.name) {
                return Err(WorkerError::Configuration(format!(
                    "rendition name {:?} is not a usable directory name",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(WorkerError::Configuration(format!(
                    "rendition {} is listed twice",
                    spec.name
                )));
            }
            if spec.target_height == 0
                || spec.width == 0
                || spec.height == 0
                || spec.bandwidth == 0
            {
                return Err(WorkerError::Configuration(format!(
                    "rendition {} has a zero dimension or bandwidth",
                    spec.name
                )));
            }
        }

        Ok(Self { renditions })
    }

    /// The built-in 1080p/720p/480p/360p ladder.
    pub fn standard() -> Self {
        Self {
            renditions: vec![
                RenditionSpec::new("1080p", 1080, 5_000_000, 1920, 1080),
                RenditionSpec::new("720p", 720, 3_000_000, 1280, 720),
                RenditionSpec::new("480p", 480, 1_500_000, 854, 480),
                RenditionSpec::new("360p", 360, 800_000, 640, 360),
            ],
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, WorkerError> {
        let renditions: Vec<RenditionSpec> = serde_json::from_str(raw)
            .map_err(|e| WorkerError::Configuration(format!("invalid ladder: {}", e)))?;
        Self::new(renditions)
    }

    pub fn load(path: &Path) -> Result<Self, WorkerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WorkerError::Configuration(format!("cannot read ladder {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, name: &str) -> Option<&RenditionSpec> {
        self.renditions.iter().find(|spec| spec.name == name)
    }

    /// Like [`Ladder::get`], but an unknown name is a configuration error.
    pub fn require(&self, name: &str) -> Result<&RenditionSpec, WorkerError> {
        self.get(name).ok_or_else(|| {
            WorkerError::Configuration(format!("unknown rendition {:?}", name))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.renditions.iter().map(|spec| spec.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenditionSpec> {
        self.renditions.iter()
    }

    pub fn len(&self) -> usize {
        self.renditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self::standard()
    }
}
