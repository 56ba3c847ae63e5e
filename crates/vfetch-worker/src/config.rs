//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use vfetch_media::HlsOptions;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding artifacts, streaming directories and the snapshot
    pub data_dir: PathBuf,
    /// Snapshot file, relative paths resolve against `data_dir`
    pub snapshot_file: PathBuf,
    /// Jobs older than this are swept
    pub retention: Duration,
    /// Time between retention sweeps
    pub sweep_interval: Duration,
    /// Whether the retention sweeper runs at all
    pub retention_sweep_enabled: bool,
    /// How often the fetch worker checks for the artifact file
    pub artifact_poll_interval: Duration,
    /// How long retrieval may run before the artifact file first appears
    pub artifact_wait_timeout: Duration,
    /// Target HLS segment duration in seconds
    pub hls_segment_secs: u32,
    /// Packaging stops tailing the artifact after it has been idle this long
    pub packaging_idle_timeout: Duration,
    /// Kill rotation transcodes after this long (none by default)
    pub rotate_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("downloads"),
            snapshot_file: PathBuf::from("database.json"),
            retention: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(1800),
            retention_sweep_enabled: true,
            artifact_poll_interval: Duration::from_millis(1000),
            artifact_wait_timeout: Duration::from_secs(3600),
            hls_segment_secs: 4,
            packaging_idle_timeout: Duration::from_secs(30),
            rotate_timeout: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// `None` when the value does not fit in a `Duration` of seconds.
fn hours(h: u64) -> Option<Duration> {
    h.checked_mul(3600).map(Duration::from_secs)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("VFETCH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            snapshot_file: std::env::var("VFETCH_SNAPSHOT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_file),
            retention: env_parse::<u64>("VFETCH_RETENTION_HOURS")
                .and_then(hours)
                .unwrap_or(defaults.retention),
            sweep_interval: env_parse::<u64>("VFETCH_SWEEP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            retention_sweep_enabled: std::env::var("ENABLE_RETENTION_SWEEP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            artifact_poll_interval: env_parse::<u64>("VFETCH_ARTIFACT_POLL_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.artifact_poll_interval),
            artifact_wait_timeout: env_parse::<u64>("VFETCH_ARTIFACT_WAIT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.artifact_wait_timeout),
            hls_segment_secs: env_parse("VFETCH_HLS_SEGMENT_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.hls_segment_secs),
            packaging_idle_timeout: env_parse::<u64>("VFETCH_PACKAGING_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.packaging_idle_timeout),
            rotate_timeout: env_parse::<u64>("VFETCH_ROTATE_TIMEOUT_SECS").map(Duration::from_secs),
        }
    }

    /// Resolved location of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        if self.snapshot_file.is_absolute() {
            self.snapshot_file.clone()
        } else {
            self.data_dir.join(&self.snapshot_file)
        }
    }

    pub fn hls_options(&self) -> HlsOptions {
        HlsOptions {
            segment_secs: self.hls_segment_secs,
            idle_timeout: self.packaging_idle_timeout,
        }
    }
}
