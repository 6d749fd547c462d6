use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

const HLS_DIR: &str = "hls";
const SOURCE_DIR: &str = "source";

/// Scratch directory owned by one job. The tree is removed when the value is
/// dropped, whichever way the job exits.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    job_id: String,
}

impl Workspace {
    /// Creates `<root>/video_<job_id>`, replacing any leftover from an attempt
    /// that died before it could clean up.
    ///
    /// The name carries no random suffix, so a `root` must belong to a single
    /// worker process: two workers sharing one `WORK_DIR` that both receive a
    /// redelivered job would remove each other's live workspace.
    pub fn acquire(root: &Path, job_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;

        let prefix = format!("video_{}", job_id);
        let stale = root.join(&prefix);
        if stale.exists() {
            warn!(job_id, path = %stale.display(), "Removing stale workspace");
            std::fs::remove_dir_all(&stale)?;
        }

        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(0)
            .tempdir_in(root)?;
        std::fs::create_dir(dir.path().join(HLS_DIR))?;
        std::fs::create_dir(dir.path().join(SOURCE_DIR))?;

        debug!(job_id, path = %dir.path().display(), "Workspace acquired");
        Ok(Self {
            dir,
            job_id: job_id.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Root of the tree that gets uploaded.
    pub fn hls_dir(&self) -> PathBuf {
        self.dir.path().join(HLS_DIR)
    }

    /// Where the downloaded source lands. Kept apart from `hls/` so no
    /// filename can collide with the output tree.
    pub fn source_path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(SOURCE_DIR).join(filename)
    }

    /// Removes the tree now and reports failures, instead of leaving it to
    /// the silent cleanup in `Drop`.
    pub fn release(self) {
        let Self { dir, job_id } = self;
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(job_id = %job_id, "Workspace released"),
            Err(e) => warn!(
                job_id = %job_id,
                path = %path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}
