//! End-to-end pipeline behavior with fake retrieval and transcoding tools.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};
use vfetch_media::{MediaError, MediaResult, ProcessOutcome, Retriever, Transcoder};
use vfetch_models::{Job, JobId, JobStatus, PackagingStatus};
use vfetch_store::{MemoryStore, SnapshotStore, StoreHandle};
use vfetch_worker::{JobService, WorkerConfig, WorkerError};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Writes a payload to the output path, optionally waiting for a release
/// signal before reporting success.
struct ScriptedRetriever {
    payload: &'static [u8],
    release: Option<Arc<Notify>>,
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn retrieve(&self, _url: &str, output: &Path) -> MediaResult<()> {
        tokio::fs::write(output, self.payload).await?;
        if let Some(release) = &self.release {
            release.notified().await;
        }
        Ok(())
    }
}

struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(&self, _url: &str, _output: &Path) -> MediaResult<()> {
        Err(MediaError::download_failed("yt-dlp failed: ERROR: Unsupported URL"))
    }
}

/// Reports success without writing anything.
struct SilentRetriever;

#[async_trait]
impl Retriever for SilentRetriever {
    async fn retrieve(&self, _url: &str, _output: &Path) -> MediaResult<()> {
        Ok(())
    }
}

/// Writes the payload at once, then keeps "downloading" for a while.
struct SlowRetriever {
    payload: &'static [u8],
    finish_after: Duration,
}

#[async_trait]
impl Retriever for SlowRetriever {
    async fn retrieve(&self, _url: &str, output: &Path) -> MediaResult<()> {
        tokio::fs::write(output, self.payload).await?;
        tokio::time::sleep(self.finish_after).await;
        Ok(())
    }
}

struct PanickingRetriever;

#[async_trait]
impl Retriever for PanickingRetriever {
    async fn retrieve(&self, _url: &str, _output: &Path) -> MediaResult<()> {
        panic!("extractor crashed");
    }
}

/// Never finishes; flags when its future is dropped.
struct HangingRetriever {
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Retriever for HangingRetriever {
    async fn retrieve(&self, _url: &str, _output: &Path) -> MediaResult<()> {
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Models the artifact as `orientation=<quarter turns>` so rotations can be
/// compared without real video.
struct OrientationTranscoder {
    packaged: mpsc::UnboundedSender<(PathBuf, PathBuf)>,
    transforms: AtomicUsize,
    fail_transform: bool,
}

impl OrientationTranscoder {
    fn new() -> (Self, mpsc::UnboundedReceiver<(PathBuf, PathBuf)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                packaged: tx,
                transforms: AtomicUsize::new(0),
                fail_transform: false,
            },
            rx,
        )
    }

    fn failing() -> Self {
        let (mut this, _rx) = Self::new();
        this.fail_transform = true;
        this
    }
}

fn turns_for(descriptor: &str) -> u32 {
    descriptor
        .split(',')
        .map(|step| match step.trim() {
            "transpose=1" => 1,
            "transpose=2" => 3,
            other => panic!("unexpected filter step {other}"),
        })
        .sum()
}

fn orientation_of(bytes: &[u8]) -> u32 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.strip_prefix("orientation="))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl Transcoder for OrientationTranscoder {
    async fn package(&self, input: &Path, out_dir: &Path) -> MediaResult<ProcessOutcome> {
        let _ = self.packaged.send((input.to_path_buf(), out_dir.to_path_buf()));
        tokio::fs::create_dir_all(out_dir).await?;
        tokio::fs::write(out_dir.join("playlist.m3u8"), b"#EXTM3U\n").await?;
        tokio::fs::write(out_dir.join("segment_00000.ts"), b"ts").await?;
        Ok(ProcessOutcome {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    async fn transform(
        &self,
        input: &Path,
        descriptor: &str,
        output: &Path,
    ) -> MediaResult<ProcessOutcome> {
        self.transforms.fetch_add(1, Ordering::SeqCst);
        if self.fail_transform {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Error while decoding stream #0:0".to_string()),
                Some(1),
            ));
        }
        let current = orientation_of(&tokio::fs::read(input).await?);
        let next = (current + turns_for(descriptor)) % 4;
        tokio::fs::write(output, format!("orientation={next}")).await?;
        Ok(ProcessOutcome {
            exit_code: Some(0),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _dir: TempDir,
    data_dir: PathBuf,
    backend: Arc<MemoryStore>,
    service: JobService,
}

fn test_config(data_dir: &Path) -> WorkerConfig {
    WorkerConfig {
        data_dir: data_dir.to_path_buf(),
        artifact_poll_interval: Duration::from_millis(10),
        artifact_wait_timeout: Duration::from_secs(10),
        ..Default::default()
    }
}

fn harness_with(
    retriever: Arc<dyn Retriever>,
    transcoder: Arc<dyn Transcoder>,
    tweak: impl FnOnce(&mut WorkerConfig),
) -> Harness {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("downloads");
    let mut config = test_config(&data_dir);
    tweak(&mut config);

    let backend = Arc::new(MemoryStore::new());
    let store = StoreHandle::spawn(backend.clone());
    let service = JobService::new(&config, store, retriever, transcoder);

    Harness {
        _dir: dir,
        data_dir,
        backend,
        service,
    }
}

fn harness(retriever: Arc<dyn Retriever>, transcoder: Arc<dyn Transcoder>) -> Harness {
    harness_with(retriever, transcoder, |_| {})
}

async fn wait_for<F>(service: &JobService, id: &JobId, mut done: F) -> Job
where
    F: FnMut(&Job) -> bool,
{
    for _ in 0..500 {
        let job = service.get_job(id).await.unwrap();
        if done(&job) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not reach the expected state");
}

/// Insert a Ready job whose artifact holds `orientation=0`.
async fn ready_job(h: &Harness) -> Job {
    std::fs::create_dir_all(&h.data_dir).unwrap();
    let id = JobId::new();
    let mut job = Job::with_id(
        id.clone(),
        "https://example.com/v",
        h.service.layout().artifact_path(&id),
        h.service.layout().streaming_dir(&id),
    );
    std::fs::write(job.artifact_path().unwrap(), b"orientation=0").unwrap();
    job.mark_ready().unwrap();
    h.service.store().insert(job.clone()).await.unwrap();
    job
}

fn artifact_bytes(job: &Job) -> Vec<u8> {
    std::fs::read(job.artifact_path().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Creation and retrieval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_job_is_processing_with_assigned_paths() {
    let release = Arc::new(Notify::new());
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(
        Arc::new(ScriptedRetriever {
            payload: b"orientation=0",
            release: Some(release.clone()),
        }),
        Arc::new(transcoder),
    );

    let id = h.service.create_job("https://example.com/watch?v=1").await.unwrap();
    let job = h.service.get_job(&id).await.unwrap();

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.source_url, "https://example.com/watch?v=1");
    assert_eq!(job.artifact_path(), Some(h.data_dir.join(format!("{id}.mp4")).as_path()));
    assert_eq!(job.streaming_dir(), Some(h.data_dir.join(format!("{id}_hls")).as_path()));
    assert!(job.error_detail.is_none());

    release.notify_one();
}

#[tokio::test]
async fn successful_retrieval_reaches_ready_with_artifact() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(
        Arc::new(ScriptedRetriever {
            payload: b"orientation=0",
            release: None,
        }),
        Arc::new(transcoder),
    );

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Ready);
    assert!(job.artifact_path().unwrap().exists());
    assert!(job.error_detail.is_none());
}

#[tokio::test]
async fn failed_retrieval_reaches_failed_with_detail() {
    let (transcoder, mut packaged) = OrientationTranscoder::new();
    let h = harness(Arc::new(FailingRetriever), Arc::new(transcoder));

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Failed);
    let detail = job.error_detail.unwrap();
    assert!(detail.contains("Unsupported URL"), "{detail}");
    assert!(packaged.try_recv().is_err());
}

#[tokio::test]
async fn retrieval_without_output_file_fails() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_detail.unwrap().contains("Output file not created"));
}

#[tokio::test]
async fn retrieval_past_deadline_is_aborted_and_failed() {
    let dropped = Arc::new(AtomicBool::new(false));
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness_with(
        Arc::new(HangingRetriever {
            dropped: dropped.clone(),
        }),
        Arc::new(transcoder),
        |c| c.artifact_wait_timeout = Duration::from_millis(150),
    );

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Failed);
    let detail = job.error_detail.unwrap();
    assert!(detail.contains("did not appear within 150ms"), "{detail}");
    for _ in 0..100 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn retrieval_still_writing_past_deadline_reaches_ready() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness_with(
        Arc::new(SlowRetriever {
            payload: b"orientation=0",
            finish_after: Duration::from_millis(400),
        }),
        Arc::new(transcoder),
        |c| c.artifact_wait_timeout = Duration::from_millis(150),
    );

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Ready, "{:?}", job.error_detail);
    assert!(job.error_detail.is_none());
    assert!(job.artifact_path().unwrap().exists());
}

#[tokio::test]
async fn panicking_retrieval_marks_job_failed() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(PanickingRetriever), Arc::new(transcoder));

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| j.is_terminal()).await;

    assert_eq!(job.status, JobStatus::Failed);
    let detail = job.error_detail.unwrap();
    assert!(detail.contains("without settling"), "{detail}");
}

#[tokio::test]
async fn terminal_status_is_never_overwritten() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(FailingRetriever), Arc::new(transcoder));

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    wait_for(&h.service, &id, |j| j.is_terminal()).await;

    let err = h
        .service
        .store()
        .update(&id, |job| job.mark_ready())
        .await
        .unwrap_err();
    assert!(matches!(err, vfetch_store::StoreError::Model(_)));
    assert_eq!(h.service.get_job(&id).await.unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn invalid_url_is_rejected_without_a_record() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));

    for bad in ["", "not a url", "ftp://example.com/file", "file:///etc/passwd"] {
        let err = h.service.create_job(bad).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidUrl(_)), "{bad}: {err:?}");
    }
    assert!(h.service.list_jobs().await.unwrap().is_empty());
    assert_eq!(h.backend.saves(), 0);
}

// ---------------------------------------------------------------------------
// Concrete scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_retrieve_package_ready_scenario() {
    let release = Arc::new(Notify::new());
    let (transcoder, mut packaged) = OrientationTranscoder::new();
    let h = harness(
        Arc::new(ScriptedRetriever {
            payload: b"orientation=0",
            release: Some(release.clone()),
        }),
        Arc::new(transcoder),
    );

    // An unrelated record that must not be touched.
    let bystander = Job::new("https://example.com/other", "x.mp4", "x_hls");
    h.service.store().insert(bystander.clone()).await.unwrap();

    let id = h.service.create_job("https://example.com/a").await.unwrap();
    let jobs = h.service.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(h.service.get_job(&id).await.unwrap().status, JobStatus::Processing);

    // Retrieval has written bytes; packaging should start before it completes.
    let (input, out_dir) = tokio::time::timeout(Duration::from_secs(5), packaged.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(input, h.data_dir.join(format!("{id}.mp4")));
    assert_eq!(out_dir, h.data_dir.join(format!("{id}_hls")));
    assert_eq!(h.service.get_job(&id).await.unwrap().status, JobStatus::Processing);

    release.notify_one();
    let job = wait_for(&h.service, &id, |j| {
        j.is_terminal() && j.packaging_status == PackagingStatus::Completed
    })
    .await;
    assert_eq!(job.status, JobStatus::Ready);
    assert!(job.streaming_dir().unwrap().join("playlist.m3u8").exists());

    assert_eq!(h.service.get_job(&bystander.id).await.unwrap(), bystander);
}

#[tokio::test]
async fn packaging_failure_does_not_change_job_status() {
    struct BrokenPackager;

    #[async_trait]
    impl Transcoder for BrokenPackager {
        async fn package(&self, _input: &Path, _out_dir: &Path) -> MediaResult<ProcessOutcome> {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ))
        }

        async fn transform(&self, _: &Path, _: &str, _: &Path) -> MediaResult<ProcessOutcome> {
            unreachable!()
        }
    }

    let h = harness(
        Arc::new(ScriptedRetriever {
            payload: b"orientation=0",
            release: None,
        }),
        Arc::new(BrokenPackager),
    );

    let id = h.service.create_job("https://example.com/v").await.unwrap();
    let job = wait_for(&h.service, &id, |j| {
        j.is_terminal() && j.packaging_status == PackagingStatus::Failed
    })
    .await;

    assert_eq!(job.status, JobStatus::Ready);
    assert!(job
        .packaging_error
        .unwrap()
        .contains("Invalid data found when processing input"));
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn four_quarter_turns_restore_orientation() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let job = ready_job(&h).await;
    let original = artifact_bytes(&job);

    for _ in 0..4 {
        h.service.rotate(&job.id, "90").await.unwrap();
    }
    assert_eq!(artifact_bytes(&job), original);

    let after = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(after.primary_artifact_path, job.primary_artifact_path);
    assert_eq!(after.status, JobStatus::Ready);
}

#[tokio::test]
async fn half_turn_equals_two_quarter_turns() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let a = ready_job(&h).await;
    let b = ready_job(&h).await;

    h.service.rotate(&a.id, "180").await.unwrap();
    h.service.rotate(&b.id, "90").await.unwrap();
    h.service.rotate(&b.id, "90").await.unwrap();

    assert_eq!(artifact_bytes(&a), artifact_bytes(&b));
    assert_eq!(artifact_bytes(&a), b"orientation=2");
}

#[tokio::test]
async fn invalid_angle_leaves_artifact_unchanged() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let transcoder = Arc::new(transcoder);
    let h = harness(Arc::new(SilentRetriever), transcoder.clone());
    let job = ready_job(&h).await;
    let before = artifact_bytes(&job);

    for bad in ["45", "0", "360", "-90", "ninety"] {
        let err = h.service.rotate(&job.id, bad).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidAngle(_)), "{bad}: {err:?}");
    }

    // Angle is checked before the job lookup.
    let err = h
        .service
        .rotate(&JobId::from("missing"), "45")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::InvalidAngle(_)));

    assert_eq!(artifact_bytes(&job), before);
    assert_eq!(transcoder.transforms.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_id_is_not_found_without_mutation() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let job = ready_job(&h).await;
    let saves = h.backend.saves();
    let snapshot = h.backend.load().await.unwrap();

    let missing = JobId::from("does-not-exist");
    assert!(matches!(
        h.service.get_job(&missing).await,
        Err(WorkerError::NotFound(_))
    ));
    assert!(matches!(
        h.service.rotate(&missing, "90").await,
        Err(WorkerError::NotFound(_))
    ));

    assert_eq!(h.backend.saves(), saves);
    assert_eq!(h.backend.load().await.unwrap(), snapshot);
    assert!(snapshot.contains_key(&job.id));
}

#[tokio::test]
async fn rotation_failure_is_surfaced_and_recorded() {
    let h = harness(Arc::new(SilentRetriever), Arc::new(OrientationTranscoder::failing()));
    let job = ready_job(&h).await;
    let before = artifact_bytes(&job);

    let err = h.service.rotate(&job.id, "270").await.unwrap_err();
    match &err {
        WorkerError::TranscodeFailure { exit_code, stderr, .. } => {
            assert_eq!(*exit_code, Some(1));
            assert!(stderr.as_deref().unwrap().contains("decoding stream"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(artifact_bytes(&job), before);
    let stored = h.service.get_job(&job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Ready);
    assert!(stored.rotation_error.unwrap().contains("decoding stream"));

    let leftovers: Vec<_> = std::fs::read_dir(&h.data_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn rotation_requires_existing_artifact() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let job = ready_job(&h).await;
    std::fs::remove_file(job.artifact_path().unwrap()).unwrap();

    assert!(matches!(
        h.service.rotate(&job.id, "90").await,
        Err(WorkerError::ArtifactMissing(_))
    ));
}

// ---------------------------------------------------------------------------
// File lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streaming_file_lookup_rejects_traversal() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let job = ready_job(&h).await;
    let dir = job.streaming_dir().unwrap();
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("playlist.m3u8"), b"#EXTM3U").unwrap();

    let found = h.service.streaming_file(&job.id, "playlist.m3u8").await.unwrap();
    assert_eq!(found, dir.join("playlist.m3u8"));

    for bad in ["../database.json", "..", "a/b.ts", ".hidden"] {
        assert!(matches!(
            h.service.streaming_file(&job.id, bad).await,
            Err(WorkerError::InvalidFileName(_))
        ));
    }
    assert!(matches!(
        h.service.streaming_file(&job.id, "segment_00009.ts").await,
        Err(WorkerError::ArtifactMissing(_))
    ));
}

#[tokio::test]
async fn artifact_file_resolves_existing_artifact() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    let job = ready_job(&h).await;

    let path = h.service.artifact_file(&job.id).await.unwrap();
    assert_eq!(Some(path.as_path()), job.artifact_path());

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        h.service.artifact_file(&job.id).await,
        Err(WorkerError::ArtifactMissing(_))
    ));
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_removes_expired_jobs_and_files() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));

    let mut old = ready_job(&h).await;
    let hls = old.streaming_dir().unwrap().to_path_buf();
    std::fs::create_dir_all(&hls).unwrap();
    std::fs::write(hls.join("playlist.m3u8"), b"#EXTM3U").unwrap();
    std::fs::write(hls.join("segment_00000.ts"), b"ts").unwrap();

    // Age the record past the horizon.
    let now = Utc::now();
    old = h
        .service
        .store()
        .update(&old.id, move |job| {
            job.created_at = now - chrono::Duration::hours(25);
            Ok(())
        })
        .await
        .unwrap();

    // In-flight jobs are swept on age alone.
    let mut stale_processing = Job::new(
        "https://example.com/slow",
        h.data_dir.join("slow.mp4"),
        h.data_dir.join("slow_hls"),
    );
    stale_processing.created_at = now - chrono::Duration::hours(30);
    h.service.store().insert(stale_processing.clone()).await.unwrap();

    let fresh = ready_job(&h).await;

    let report = h.service.sweeper().sweep_once(now).await.unwrap();

    assert_eq!(report.removed.len(), 2);
    assert!(report.removed.contains(&old.id));
    assert!(report.removed.contains(&stale_processing.id));
    assert_eq!(report.files_deleted, 4);
    assert_eq!(report.file_failures, 0);

    assert!(matches!(
        h.service.get_job(&old.id).await,
        Err(WorkerError::NotFound(_))
    ));
    assert!(!old.artifact_path().unwrap().exists());
    assert!(!hls.exists());

    assert!(h.service.get_job(&fresh.id).await.is_ok());
    assert!(fresh.artifact_path().unwrap().exists());
}

#[tokio::test]
async fn sweep_with_nothing_expired_does_not_save() {
    let (transcoder, _rx) = OrientationTranscoder::new();
    let h = harness(Arc::new(SilentRetriever), Arc::new(transcoder));
    ready_job(&h).await;
    let saves = h.backend.saves();

    let report = h.service.sweeper().sweep_once(Utc::now()).await.unwrap();

    assert!(report.removed.is_empty());
    assert_eq!(h.backend.saves(), saves);
}

// ---------------------------------------------------------------------------
// Real tools
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn ffmpeg_rotation_replaces_artifact() {
    use vfetch_media::{FfmpegCommand, FfmpegRunner, FfmpegTranscoder, HlsOptions};

    let dir = TempDir::new().unwrap();
    let artifact = dir.path().join("clip.mp4");
    let cmd = FfmpegCommand::new("testsrc=size=320x240:rate=10", &artifact)
        .input_arg("-f")
        .input_arg("lavfi")
        .output_args(["-t", "1", "-pix_fmt", "yuv420p"]);
    FfmpegRunner::new().run(&cmd).await.unwrap();

    let transcoder = FfmpegTranscoder::new(HlsOptions::default());
    let store = StoreHandle::spawn(Arc::new(MemoryStore::new()));
    let mut job = Job::new("https://example.com/v", &artifact, dir.path().join("clip_hls"));
    job.mark_ready().unwrap();
    store.insert(job.clone()).await.unwrap();

    let service = JobService::new(
        &test_config(dir.path()),
        store,
        Arc::new(SilentRetriever),
        Arc::new(transcoder),
    );
    service.rotate(&job.id, "90").await.unwrap();
    service.rotate(&job.id, "270").await.unwrap();

    assert!(std::fs::metadata(&artifact).unwrap().len() > 0);
    assert!(service.get_job(&job.id).await.unwrap().rotation_error.is_none());
}
