//! Media retrieval using yt-dlp.
//!
//! The retrieval writes straight to the final artifact path (`--no-part`) so
//! that packaging can start tailing the file while bytes are still arriving.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Fetches a remote URL into a single local container file.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve `url` into `output`.
    ///
    /// Returns once the tool has exited. `Ok` implies `output` exists.
    async fn retrieve(&self, url: &str, output: &Path) -> MediaResult<()>;
}

/// [`Retriever`] backed by the `yt-dlp` CLI.
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    program: PathBuf,
    format: String,
}

impl Default for YtDlpRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpRetriever {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format: "mp4/best".to_string(),
        }
    }

    /// Use a specific yt-dlp executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Override the format selector.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Build the yt-dlp argument list.
    pub fn build_args(&self, url: &str, output: &Path) -> Vec<String> {
        vec![
            "--no-part".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--postprocessor-args".to_string(),
            "ffmpeg:-movflags +faststart".to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl Retriever for YtDlpRetriever {
    async fn retrieve(&self, url: &str, output: &Path) -> MediaResult<()> {
        which::which(&self.program).map_err(|_| MediaError::YtDlpNotFound)?;

        info!("Downloading media from {} to {}", url, output.display());

        let result = Command::new(&self.program)
            .args(self.build_args(url, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            debug!("yt-dlp stderr: {}", stderr);

            let error_msg = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("Unknown error");

            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_msg
            )));
        }

        // Verify file was created
        if !output.exists() {
            return Err(MediaError::download_failed("Output file not created"));
        }

        let file_size = output.metadata()?.len();
        info!(
            output = %output.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded media successfully"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_end_with_output_then_url() {
        let args = YtDlpRetriever::new().build_args("https://example.com/v", Path::new("/d/a.mp4"));
        assert_eq!(args[0], "--no-part");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.windows(2).any(|w| w == ["-f", "mp4/best"]));
        assert!(args.windows(2).any(|w| w == ["--merge-output-format", "mp4"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["--postprocessor-args", "ffmpeg:-movflags +faststart"]));
        let n = args.len();
        assert_eq!(args[n - 3], "-o");
        assert_eq!(args[n - 2], "/d/a.mp4");
        assert_eq!(args[n - 1], "https://example.com/v");
    }

    #[test]
    fn test_custom_format() {
        let args = YtDlpRetriever::new()
            .with_format("best")
            .build_args("u", Path::new("o"));
        assert!(args.windows(2).any(|w| w == ["-f", "best"]));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let retriever = YtDlpRetriever::new().with_program("no-such-yt-dlp-binary");
        let err = retriever
            .retrieve("https://example.com/v", Path::new("/tmp/never.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::YtDlpNotFound));
    }
}
