//! Transcoding collaborator used by packaging and rotation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner, ProcessOutcome};
use crate::error::MediaResult;
use crate::hls::{packaging_command, HlsOptions};

/// Runs the two FFmpeg jobs the pipeline needs.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Remux `input` into an HLS playlist and segments under `out_dir`.
    async fn package(&self, input: &Path, out_dir: &Path) -> MediaResult<ProcessOutcome>;

    /// Re-encode `input` through the video filter `descriptor` into `output`.
    async fn transform(
        &self,
        input: &Path,
        descriptor: &str,
        output: &Path,
    ) -> MediaResult<ProcessOutcome>;
}

/// [`Transcoder`] backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    hls: HlsOptions,
    transform_timeout_secs: Option<u64>,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(HlsOptions::default())
    }
}

impl FfmpegTranscoder {
    pub fn new(hls: HlsOptions) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            hls,
            transform_timeout_secs: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Kill rotation transcodes that run longer than `secs`.
    pub fn with_transform_timeout(mut self, secs: Option<u64>) -> Self {
        self.transform_timeout_secs = secs;
        self
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_program(self.program.clone())
    }
}

/// Build the rotation transcode command.
pub fn transform_command(input: &Path, descriptor: &str, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_filter(descriptor)
        .audio_codec("copy")
        .movflags("+faststart")
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn package(&self, input: &Path, out_dir: &Path) -> MediaResult<ProcessOutcome> {
        tokio::fs::create_dir_all(out_dir).await?;

        let cmd = packaging_command(input, out_dir, self.hls);
        let outcome = self.runner().run(&cmd).await?;

        info!(
            input = %input.display(),
            out_dir = %out_dir.display(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "HLS packaging finished"
        );
        Ok(outcome)
    }

    async fn transform(
        &self,
        input: &Path,
        descriptor: &str,
        output: &Path,
    ) -> MediaResult<ProcessOutcome> {
        let cmd = transform_command(input, descriptor, output);
        let runner = match self.transform_timeout_secs {
            Some(secs) => self.runner().with_timeout(secs),
            None => self.runner(),
        };
        runner.run(&cmd).await
    }
}
