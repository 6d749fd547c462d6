use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::WorkerError;
use crate::modules::transcode::ladder::{Ladder, RenditionSpec};
use crate::modules::transcode::manifest::RENDITION_PLAYLIST;

const SEGMENT_SECONDS: u32 = 10;
const SEGMENT_PATTERN: &str = "segment_%03d.ts";
const STDERR_TAIL_LINES: usize = 8;

/// Produces one HLS rendition (`<hls_root>/<name>/playlist.m3u8` plus its
/// segments) from a source file.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(
        &self,
        input: &Path,
        hls_root: &Path,
        rendition: &str,
    ) -> Result<(), WorkerError>;
}

pub struct FfmpegEncoder {
    program: PathBuf,
    ladder: Arc<Ladder>,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<PathBuf>, ladder: Arc<Ladder>) -> Self {
        Self {
            program: program.into(),
            ladder,
        }
    }

    pub fn args(input: &Path, output_dir: &Path, spec: &RenditionSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-nostdin".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
        ];
        // -2 keeps the aspect ratio with an even width, as libx264 requires.
        args.extend([
            "-vf".into(),
            format!("scale=-2:{}", spec.target_height).into(),
            "-c:v".into(),
            "libx264".into(),
            "-c:a".into(),
            "aac".into(),
            "-hls_time".into(),
            SEGMENT_SECONDS.to_string().into(),
            "-hls_list_size".into(),
            "0".into(),
            "-hls_segment_filename".into(),
            output_dir.join(SEGMENT_PATTERN).into_os_string(),
            "-f".into(),
            "hls".into(),
            output_dir.join(RENDITION_PLAYLIST).into_os_string(),
        ]);
        args
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        hls_root: &Path,
        rendition: &str,
    ) -> Result<(), WorkerError> {
        let spec = self.ladder.require(rendition)?;

        let output_dir = hls_root.join(&spec.name);
        tokio::fs::create_dir_all(&output_dir).await?;

        info!(rendition, height = spec.target_height, "🎞️ Running encoder");
        let output = Command::new(&self.program)
            .args(Self::args(input, &output_dir, spec))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                WorkerError::Encoder(format!(
                    "failed to spawn {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(WorkerError::Encoder(format!(
                "{} exited with {} for {}: {}",
                self.program.display(),
                output.status,
                rendition,
                stderr_tail(&output.stderr)
            )));
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
