//! In-place rotation of a container file.
//!
//! The transcode writes to a temp file next to the artifact. Only a verified,
//! non-empty output is renamed over the original, so a failed transcode leaves
//! the original untouched.

use std::path::Path;

use tracing::{debug, info};
use vfetch_models::RotationAngle;

use crate::command::ProcessOutcome;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::file_has_content;
use crate::transcoder::Transcoder;

/// Rotate `artifact` by `angle`, replacing it atomically on success.
pub async fn rotate_in_place<T>(
    transcoder: &T,
    artifact: &Path,
    angle: RotationAngle,
) -> MediaResult<ProcessOutcome>
where
    T: Transcoder + ?Sized,
{
    let original = tokio::fs::metadata(artifact)
        .await
        .map_err(|_| MediaError::FileNotFound(artifact.to_path_buf()))?;

    let dir = artifact
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let tmp = tempfile::Builder::new()
        .prefix(".rotate-")
        .suffix(".mp4")
        .tempfile_in(dir)?
        .into_temp_path();

    debug!(
        artifact = %artifact.display(),
        tmp = %tmp.display(),
        angle = angle.degrees(),
        "Rotating via temp file"
    );

    // `tmp` removes itself on drop, so every early return below cleans up.
    let outcome = transcoder
        .transform(artifact, angle.transform_filter(), &tmp)
        .await?;

    if !file_has_content(&tmp).await {
        return Err(MediaError::invalid_output(format!(
            "rotation produced no output for {}",
            artifact.display()
        )));
    }

    tokio::fs::set_permissions(&tmp, original.permissions()).await?;
    tmp.persist(artifact).map_err(|e| MediaError::Io(e.error))?;

    info!(
        artifact = %artifact.display(),
        angle = angle.degrees(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Rotated artifact in place"
    );
    Ok(outcome)
}
