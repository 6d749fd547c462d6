use std::fmt::Write as _;
use std::path::Path;

use crate::error::WorkerError;
use crate::modules::transcode::ladder::Ladder;

pub const MASTER_PLAYLIST: &str = "master.m3u8";
pub const RENDITION_PLAYLIST: &str = "playlist.m3u8";

/// Renders the master playlist for `renditions`, in the given order.
///
/// Output is a pure function of its inputs, so re-running a job yields a
/// byte-identical manifest.
pub fn master_playlist<S: AsRef<str>>(
    renditions: &[S],
    ladder: &Ladder,
) -> Result<String, WorkerError> {
    let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n\n");

    for name in renditions {
        let spec = ladder.require(name.as_ref())?;
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}\n{}/{}\n\n",
            spec.bandwidth, spec.width, spec.height, spec.name, RENDITION_PLAYLIST
        );
    }

    Ok(out)
}

pub async fn write_master_playlist<S: AsRef<str>>(
    hls_dir: &Path,
    renditions: &[S],
    ladder: &Ladder,
) -> Result<(), WorkerError> {
    let body = master_playlist(renditions, ladder)?;
    tokio::fs::write(hls_dir.join(MASTER_PLAYLIST), body).await?;
    Ok(())
}
