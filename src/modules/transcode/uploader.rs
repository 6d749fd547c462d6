//! Rendition tree upload.
//!
//! [`artifacts`] is a lazy walk over an HLS output tree that yields one
//! [`Artifact`] per uploadable file. Calling it again restarts the walk. At
//! every level subdirectories are visited before plain files, and segments
//! come before playlists. Every file is therefore uploaded before any
//! playlist that references it, and the top-level master playlist goes last.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::WorkerError;
use crate::infrastructure::storage::ObjectStore;

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("m3u8", "application/vnd.apple.mpegurl"),
    ("ts", "video/mp2t"),
];

pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub key: String,
    pub content_type: &'static str,
}

pub struct ArtifactWalk {
    root: PathBuf,
    job_id: String,
    inner: walkdir::IntoIter,
}

pub fn artifacts(root: &Path, job_id: &str) -> ArtifactWalk {
    let inner = WalkDir::new(root)
        .min_depth(1)
        .sort_by(upload_order)
        .into_iter();

    ArtifactWalk {
        root: root.to_path_buf(),
        job_id: job_id.to_string(),
        inner,
    }
}

fn upload_rank(entry: &DirEntry) -> u8 {
    if entry.file_type().is_dir() {
        return 0;
    }
    match entry.path().extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ts") => 1,
        Some(ext) if ext.eq_ignore_ascii_case("m3u8") => 2,
        _ => 3,
    }
}

fn upload_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    upload_rank(a)
        .cmp(&upload_rank(b))
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// `{job_id}/{relative path}` with `/` separators on every host.
fn object_key(job_id: &str, relative: &Path) -> String {
    let mut key = String::from(job_id);
    for component in relative.components() {
        if let Component::Normal(part) = component {
            key.push('/');
            key.push_str(&part.to_string_lossy());
        }
    }
    key
}

impl Iterator for ArtifactWalk {
    type Item = Result<Artifact, WorkerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(WorkerError::Io(e.into()))),
            };

            if entry.file_type().is_dir() {
                continue;
            }
            let Some(content_type) = content_type_for(entry.path()) else {
                continue;
            };

            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };

            return Some(Ok(Artifact {
                key: object_key(&self.job_id, relative),
                path: entry.path().to_path_buf(),
                content_type,
            }));
        }
    }
}

#[derive(Clone)]
pub struct StorageUploader {
    store: Arc<dyn ObjectStore>,
}

impl StorageUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Uploads every artifact under `root` and returns how many were stored.
    /// Stops at the first failed put.
    pub async fn upload_tree(&self, root: &Path, job_id: &str) -> Result<usize, WorkerError> {
        let mut uploaded = 0;

        for artifact in artifacts(root, job_id) {
            let artifact = artifact?;
            debug!(job_id, key = %artifact.key, "Uploading {}", artifact.path.display());
            self.store
                .put_object(&artifact.path, &artifact.key, artifact.content_type)
                .await?;
            uploaded += 1;
        }

        info!(job_id, objects = uploaded, "⬆️ Uploaded HLS files");
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rendition in ["1080p", "720p"] {
            fs::create_dir(root.join(rendition)).unwrap();
            fs::write(root.join(rendition).join("playlist.m3u8"), "#EXTM3U\n").unwrap();
            fs::write(root.join(rendition).join("segment_000.ts"), b"ts").unwrap();
            fs::write(root.join(rendition).join("segment_001.ts"), b"ts").unwrap();
        }
        fs::write(root.join("master.m3u8"), "#EXTM3U\n").unwrap();
        fs::write(root.join("ffmpeg.log"), "noise").unwrap();
        fs::write(root.join("720p").join("thumb.jpg"), b"jpg").unwrap();
        dir
    }

    #[test]
    fn maps_known_extensions_only() {
        assert_eq!(
            content_type_for(Path::new("a/master.m3u8")),
            Some("application/vnd.apple.mpegurl")
        );
        assert_eq!(content_type_for(Path::new("segment_000.ts")), Some("video/mp2t"));
        assert_eq!(content_type_for(Path::new("poster.jpg")), None);
        assert_eq!(content_type_for(Path::new("README")), None);
    }

    #[test]
    fn keys_use_forward_slashes() {
        let relative: PathBuf = ["720p", "segment_000.ts"].iter().collect();
        assert_eq!(object_key("job-1", &relative), "job-1/720p/segment_000.ts");
    }

    #[test]
    fn walk_orders_referenced_files_first() {
        let tree = sample_tree();
        let keys: Vec<String> = artifacts(tree.path(), "job")
            .map(|a| a.unwrap().key)
            .collect();

        assert_eq!(
            keys,
            [
                "job/1080p/segment_000.ts",
                "job/1080p/segment_001.ts",
                "job/1080p/playlist.m3u8",
                "job/720p/segment_000.ts",
                "job/720p/segment_001.ts",
                "job/720p/playlist.m3u8",
                "job/master.m3u8",
            ]
        );
    }

    #[test]
    fn extension_case_does_not_change_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("360p")).unwrap();
        fs::write(root.join("360p").join("PLAYLIST.M3U8"), "#EXTM3U\n").unwrap();
        fs::write(root.join("360p").join("segment_000.TS"), b"ts").unwrap();
        fs::write(root.join("Master.M3U8"), "#EXTM3U\n").unwrap();

        let walk: Vec<Artifact> = artifacts(root, "job").map(Result::unwrap).collect();
        let keys: Vec<&str> = walk.iter().map(|a| a.key.as_str()).collect();

        assert_eq!(
            keys,
            ["job/360p/segment_000.TS", "job/360p/PLAYLIST.M3U8", "job/Master.M3U8"]
        );
        assert_eq!(walk[0].content_type, "video/mp2t");
        assert_eq!(walk[2].content_type, "application/vnd.apple.mpegurl");
    }

    #[test]
    fn walk_is_restartable() {
        let tree = sample_tree();
        let first: Vec<_> = artifacts(tree.path(), "job").map(Result::unwrap).collect();
        let second: Vec<_> = artifacts(tree.path(), "job").map(Result::unwrap).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|a| !a.key.contains('\\')));
    }

    #[test]
    fn missing_root_yields_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut walk = artifacts(&dir.path().join("nope"), "job");
        assert!(matches!(walk.next(), Some(Err(WorkerError::Io(_)))));
    }
}
