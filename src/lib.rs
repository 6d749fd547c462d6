//! Message-driven HLS packaging worker.
//!
//! Each job message names a source video. The worker fetches it, encodes
//! every rung of the rendition ladder with ffmpeg, writes a master
//! playlist, and uploads the package to an S3-compatible bucket under the
//! job id. The job's outcome decides whether the message is acknowledged or
//! requeued.

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod modules;
pub mod state;
pub mod workers;

pub use error::{JobError, Phase, WorkerError};
