//! HLS packaging layout and FFmpeg arguments.

use std::path::Path;
use std::time::Duration;

use crate::command::FfmpegCommand;

/// Playlist file name inside a streaming directory.
pub const PLAYLIST_NAME: &str = "playlist.m3u8";

/// Segment file name pattern inside a streaming directory.
pub const SEGMENT_PATTERN: &str = "segment_%05d.ts";

/// Parameters for an HLS copy-codec remux.
#[derive(Debug, Clone, Copy)]
pub struct HlsOptions {
    /// Target segment duration
    pub segment_secs: u32,
    /// Stop tailing the input after it has not grown for this long
    pub idle_timeout: Duration,
}

impl Default for HlsOptions {
    fn default() -> Self {
        Self {
            segment_secs: 4,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the packaging command for `input` into `out_dir`.
///
/// The input is followed as it grows, so packaging may start before the
/// retrieval has finished writing.
pub fn packaging_command(input: &Path, out_dir: &Path, opts: HlsOptions) -> FfmpegCommand {
    let segments = out_dir.join(SEGMENT_PATTERN);
    FfmpegCommand::new(input, out_dir.join(PLAYLIST_NAME))
        .follow_input(opts.idle_timeout)
        .stream_copy()
        .format("hls")
        .output_args([
            "-hls_time".to_string(),
            opts.segment_secs.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_flags".to_string(),
            "append_list+independent_segments".to_string(),
            "-hls_segment_filename".to_string(),
            segments.to_string_lossy().to_string(),
        ])
}

/// Content type for a file served from a streaming directory.
pub fn content_type_for(file_name: &str) -> &'static str {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
