//! Media processing for the vfetch job pipeline.
//!
//! This crate wraps the external tools the pipeline shells out to:
//! - yt-dlp for retrieving remote media
//! - FFmpeg for HLS packaging and rotation transcodes
//!
//! Both are reached through the [`Retriever`] and [`Transcoder`] traits so the
//! worker can be exercised without the binaries installed.

pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod hls;
pub mod rotate;
pub mod transcoder;

pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegRunner, ProcessOutcome};
pub use download::{Retriever, YtDlpRetriever};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{file_has_content, remove_job_files, CleanupReport};
pub use hls::{content_type_for, HlsOptions, PLAYLIST_NAME};
pub use rotate::rotate_in_place;
pub use transcoder::{FfmpegTranscoder, Transcoder};
