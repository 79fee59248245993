//! Compilation assembler.
//!
//! One compile fetches candidate clips, selects and downloads them in
//! catalog order, normalizes each to a shared profile with a credit
//! overlay, then concatenates them into `<work_dir>/<process_id>/compilation.mp4`.
//!
//! Download failures are soft: they are recorded on the result and the
//! clip is skipped. Any encode failure aborts the compile and no artifact
//! path is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, Instrument};

use clipreel_catalog::{ClipFetcher, ClipSource, GameDirectory, GameSource};
use clipreel_media::{Encoder, MediaError, NormalizeJob};
use clipreel_models::{Clip, CompilationResult, ProcessId, Schedule, SoftError, TimeRange, Window};

use crate::blacklist::Blacklist;
use crate::description::{chapter_description, compilation_title};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::CompileLogger;
use crate::metrics::{record_compile, record_soft_error};
use crate::selection::{Selection, SelectionPolicy, Verdict};

/// Raw catalog response kept for auditing.
pub const CLIPS_FILE: &str = "clips.json";
/// Serialized [`CompilationResult`].
pub const RESULT_FILE: &str = "result.json";
/// Encoder log sink.
pub const FFMPEG_LOG: &str = "ffmpeg.log";
/// Final artifact name inside the working directory.
pub const ARTIFACT_FILE: &str = "compilation.mp4";

/// Parameters of one compile.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub game_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub policy: SelectionPolicy,
    /// Human-readable label used in logs and errors
    pub label: String,
}

impl CompileRequest {
    pub fn new(
        game_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: SelectionPolicy,
    ) -> Self {
        let game_id = game_id.into();
        let label = format!(
            "game {} [{} .. {}]",
            game_id,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        Self {
            game_id,
            start,
            end,
            policy,
            label,
        }
    }

    pub fn for_window(window: &Window, schedule: &Schedule) -> Self {
        Self {
            game_id: schedule.game_id.clone(),
            start: window.start,
            end: window.end,
            policy: SelectionPolicy::for_schedule(schedule),
            label: window.label(),
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::Bounded {
            start: self.start,
            end: self.end,
        }
    }
}

/// Runs compiles against injected clip, download and encoder seams.
pub struct Assembler {
    clips: Arc<dyn ClipSource>,
    fetcher: Arc<dyn ClipFetcher>,
    encoder: Arc<dyn Encoder>,
    games: Arc<GameDirectory>,
    game_source: Option<Arc<dyn GameSource>>,
    blacklist: Arc<Blacklist>,
    work_dir: PathBuf,
    fetch_cap: usize,
    ffmpeg_semaphore: Arc<Semaphore>,
}

impl Assembler {
    pub fn new(
        clips: Arc<dyn ClipSource>,
        fetcher: Arc<dyn ClipFetcher>,
        encoder: Arc<dyn Encoder>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            clips,
            fetcher,
            encoder,
            games: Arc::new(GameDirectory::in_memory()),
            game_source: None,
            blacklist: Arc::new(Blacklist::new()),
            work_dir: work_dir.into(),
            fetch_cap: 1000,
            ffmpeg_semaphore: Arc::new(Semaphore::new(4)),
        }
    }

    /// Name games through `directory`, asking `source` about unknown IDs.
    pub fn with_games(
        mut self,
        directory: Arc<GameDirectory>,
        source: Option<Arc<dyn GameSource>>,
    ) -> Self {
        self.games = directory;
        self.game_source = source;
        self
    }

    pub fn with_blacklist(mut self, blacklist: Arc<Blacklist>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_fetch_cap(mut self, cap: usize) -> Self {
        self.fetch_cap = cap.max(1);
        self
    }

    pub fn with_max_ffmpeg(mut self, permits: usize) -> Self {
        self.ffmpeg_semaphore = Arc::new(Semaphore::new(permits.max(1)));
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Compile one window of `schedule`.
    pub async fn compile_window(
        &self,
        window: &Window,
        schedule: &Schedule,
    ) -> WorkerResult<CompilationResult> {
        if !schedule.has_game() {
            return Err(WorkerError::invalid_schedule(format!(
                "schedule {} has no game id",
                schedule.id
            )));
        }
        self.compile(CompileRequest::for_window(window, schedule)).await
    }

    /// Run one compile in a fresh working directory.
    pub async fn compile(&self, request: CompileRequest) -> WorkerResult<CompilationResult> {
        let process_id = ProcessId::new();
        let logger = CompileLogger::new(&process_id, request.label.clone());
        let span = logger.create_span();
        let started = Instant::now();

        let result = self
            .run(&process_id, &request, &logger)
            .instrument(span)
            .await;

        record_compile(result.is_ok(), started.elapsed().as_secs_f64());
        match &result {
            Ok(done) => logger.log_completion(&format!(
                "{} clips, {}s, {} soft errors",
                done.clip_count,
                done.duration_seconds,
                done.errors.len()
            )),
            Err(e) => logger.log_error(&format!("{} (stage {})", e, e.stage())),
        }
        result
    }

    async fn run(
        &self,
        process_id: &ProcessId,
        request: &CompileRequest,
        logger: &CompileLogger,
    ) -> WorkerResult<CompilationResult> {
        logger.log_start(&format!(
            "game {} target {}s",
            request.game_id, request.policy.target_seconds
        ));

        let candidates = self
            .clips
            .clips_by_game(&request.game_id, request.range(), self.fetch_cap)
            .await
            .map_err(|e| WorkerError::fetch(request.label.clone(), e))?;
        logger.log_progress(&format!("fetched {} candidate clips", candidates.len()));

        let dir = self.work_dir.join(process_id.as_str());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| WorkerError::work_dir(&dir, e))?;
        write_json(&dir.join(CLIPS_FILE), &candidates).await?;

        let mut errors = Vec::new();
        let selection = self
            .select(request, &candidates, &dir, &mut errors, logger)
            .await;
        let duration = selection.accumulated();
        let selected = selection.into_selected();
        if selected.is_empty() {
            return Err(WorkerError::NoClips(request.label.clone()));
        }
        logger.log_progress(&format!(
            "selected {} clips totalling {}s",
            selected.len(),
            duration
        ));

        let log_path = dir.join(FFMPEG_LOG);
        let normalized = self.normalize_all(&selected, &dir, &log_path).await?;

        let artifact = dir.join(ARTIFACT_FILE);
        if let Err(e) = self
            .encoder
            .concat(&normalized, &artifact, Some(&log_path))
            .await
        {
            let _ = tokio::fs::remove_file(&artifact).await;
            return Err(WorkerError::encode_all("concat", e));
        }

        let game_name = self.game_name(&request.game_id).await;
        let result = CompilationResult {
            process_id: process_id.clone(),
            clip_ids: selected.iter().map(|c| c.id.clone()).collect(),
            duration_seconds: duration,
            clip_count: selected.len(),
            title: compilation_title(&game_name, request.start, request.end),
            description: chapter_description(&selected),
            artifact_path: artifact.to_string_lossy().into_owned(),
            errors,
        };
        write_json(&dir.join(RESULT_FILE), &result).await?;
        Ok(result)
    }

    /// Walk candidates in order, downloading each taken clip.
    async fn select(
        &self,
        request: &CompileRequest,
        candidates: &[Clip],
        dir: &Path,
        errors: &mut Vec<SoftError>,
        logger: &CompileLogger,
    ) -> Selection {
        let mut selection = Selection::new(request.policy.clone(), &self.blacklist);
        for clip in candidates {
            if let Verdict::Skip(reason) = selection.consider(clip) {
                debug!(clip_id = %clip.id, broadcaster = %clip.broadcaster.name, reason = reason.as_str(), "Skipping clip");
                continue;
            }

            let dest = dir.join(clip.file_name());
            match self.fetcher.fetch(clip, &dest).await {
                Ok(bytes) => {
                    debug!(clip_id = %clip.id, bytes, "Downloaded clip");
                    selection.accept(clip.clone());
                }
                Err(e) => {
                    logger.log_skip(&clip.id, "download", &e.to_string());
                    record_soft_error("download");
                    errors.push(SoftError::new(&clip.id, "download", e.to_string()));
                    continue;
                }
            }

            if selection.is_full() {
                break;
            }
        }
        selection
    }

    /// Normalize every selected clip on the bounded FFmpeg pool.
    ///
    /// Outputs are returned in selection order regardless of completion order.
    async fn normalize_all(
        &self,
        selected: &[Clip],
        dir: &Path,
        log_path: &Path,
    ) -> WorkerResult<Vec<PathBuf>> {
        let futures: Vec<_> = selected
            .iter()
            .map(|clip| {
                let job = NormalizeJob {
                    input: dir.join(clip.file_name()),
                    output: dir.join(format!("{}_norm.mp4", clip.id)),
                    credit: clip.broadcaster.name.clone(),
                };
                let semaphore = Arc::clone(&self.ffmpeg_semaphore);
                let encoder = Arc::clone(&self.encoder);

                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| WorkerError::encode("normalize", &clip.id, MediaError::Cancelled))?;
                    encoder
                        .normalize(&job, Some(log_path))
                        .await
                        .map_err(|e| WorkerError::encode("normalize", &clip.id, e))?;
                    Ok::<PathBuf, WorkerError>(job.output)
                }
            })
            .collect();

        join_all(futures).await.into_iter().collect()
    }

    async fn game_name(&self, game_id: &str) -> String {
        match &self.game_source {
            Some(source) => self.games.resolve_name(source.as_ref(), game_id).await,
            None => self
                .games
                .name(game_id)
                .await
                .unwrap_or_else(|| game_id.to_string()),
        }
    }
}

async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> WorkerResult<()> {
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body)
        .await
        .map_err(|e| WorkerError::work_dir(path, e))
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use clipreel_catalog::{CatalogError, CatalogResult};
    use clipreel_media::MediaResult;

    use super::*;

    /// Returns a fixed clip list, or an upstream failure.
    pub struct FakeClips {
        pub clips: Vec<Clip>,
        pub fail: bool,
    }

    impl FakeClips {
        pub fn new(clips: Vec<Clip>) -> Self {
            Self { clips, fail: false }
        }
    }

    #[async_trait]
    impl ClipSource for FakeClips {
        async fn clips_by_game(
            &self,
            _game_id: &str,
            _range: TimeRange,
            cap: usize,
        ) -> CatalogResult<Vec<Clip>> {
            if self.fail {
                return Err(CatalogError::upstream(503, "unavailable"));
            }
            Ok(self.clips.iter().take(cap).cloned().collect())
        }
    }

    /// Writes a small body for every clip except those listed in `fail`.
    #[derive(Default)]
    pub struct FakeFetcher {
        pub fail: HashSet<String>,
        pub fetched: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn failing(ids: &[&str]) -> Self {
            Self {
                fail: ids.iter().map(|s| s.to_string()).collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClipFetcher for FakeFetcher {
        async fn fetch(&self, clip: &Clip, dest: &Path) -> CatalogResult<u64> {
            self.fetched.lock().unwrap().push(clip.id.clone());
            if self.fail.contains(&clip.id) {
                return Err(CatalogError::download(&clip.id, "media returned 404"));
            }
            tokio::fs::write(dest, clip.id.as_bytes()).await?;
            Ok(clip.id.len() as u64)
        }
    }

    /// Copies inputs to outputs; records concat order.
    #[derive(Default)]
    pub struct FakeEncoder {
        pub fail_normalize: Option<String>,
        pub concat_inputs: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn normalize(&self, job: &NormalizeJob, _log_path: Option<&Path>) -> MediaResult<()> {
            let is_target = self
                .fail_normalize
                .as_deref()
                .map(|id| job.input.ends_with(format!("{id}.mp4")))
                .unwrap_or(false);
            if is_target {
                return Err(MediaError::ffmpeg_failed("exit 1", Some("bad input".into()), Some(1)));
            }
            tokio::fs::copy(&job.input, &job.output).await?;
            Ok(())
        }

        async fn concat(&self, inputs: &[PathBuf], output: &Path, _log_path: Option<&Path>) -> MediaResult<()> {
            *self.concat_inputs.lock().unwrap() = inputs.to_vec();
            tokio::fs::write(output, b"compiled").await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::selection::fixtures::clip;
    use chrono::TimeZone;
    use clipreel_models::Game;

    fn request(target: u32) -> CompileRequest {
        CompileRequest::new(
            "33214",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap(),
            SelectionPolicy::new(target),
        )
    }

    fn assembler(
        dir: &Path,
        clips: Vec<Clip>,
        fetcher: Arc<FakeFetcher>,
        encoder: Arc<FakeEncoder>,
    ) -> Assembler {
        Assembler::new(Arc::new(FakeClips::new(clips)), fetcher, encoder, dir)
    }

    #[tokio::test]
    async fn test_compile_selects_until_target_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::default());
        let clips = vec![clip("a", "x", 20), clip("b", "y", 20), clip("c", "z", 20)];
        let directory = Arc::new(GameDirectory::in_memory());
        directory.merge(&[Game::new("33214", "Fortnite")]).await;

        let assembler = assembler(dir.path(), clips, Arc::new(FakeFetcher::default()), encoder.clone())
            .with_games(directory, None)
            .with_max_ffmpeg(2);
        let result = assembler.compile(request(30)).await.unwrap();

        assert_eq!(result.clip_ids, vec!["a", "b"]);
        assert_eq!(result.clip_count, 2);
        assert_eq!(result.duration_seconds, 40);
        assert_eq!(result.title, "Top Fortnite Twitch Clips 01/01/24 - 01/07/24");
        assert_eq!(result.description, "clip a x (00:00)\nclip b y (00:20)\n");
        assert!(result.errors.is_empty());

        let run_dir = dir.path().join(result.process_id.as_str());
        assert_eq!(PathBuf::from(&result.artifact_path), run_dir.join(ARTIFACT_FILE));
        assert!(run_dir.join(ARTIFACT_FILE).exists());
        assert!(run_dir.join(CLIPS_FILE).exists());
        assert!(run_dir.join(RESULT_FILE).exists());

        let order = encoder.concat_inputs.lock().unwrap().clone();
        assert_eq!(order, vec![run_dir.join("a_norm.mp4"), run_dir.join("b_norm.mp4")]);
    }

    #[tokio::test]
    async fn test_download_failure_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::failing(&["a"]));
        let clips = vec![clip("a", "x", 20), clip("b", "y", 20), clip("c", "z", 20)];

        let result = assembler(dir.path(), clips, fetcher, Arc::new(FakeEncoder::default()))
            .compile(request(30))
            .await
            .unwrap();

        assert_eq!(result.clip_ids, vec!["b", "c"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].clip_id, "a");
        assert_eq!(result.errors[0].stage, "download");
        // Unknown game falls back to its id.
        assert!(result.title.starts_with("Top 33214 "));
    }

    #[tokio::test]
    async fn test_failed_download_still_claims_broadcaster() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::failing(&["a1"]));
        let clips = vec![clip("a1", "A", 10), clip("a2", "A", 10), clip("b1", "B", 10)];
        let mut req = request(600);
        req.policy.repeat_broadcaster = false;

        let result = assembler(dir.path(), clips, fetcher.clone(), Arc::new(FakeEncoder::default()))
            .compile(req)
            .await
            .unwrap();

        assert_eq!(result.clip_ids, vec!["b1"]);
        assert_eq!(*fetcher.fetched.lock().unwrap(), vec!["a1", "b1"]);
    }

    #[tokio::test]
    async fn test_normalize_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder {
            fail_normalize: Some("b".into()),
            ..Default::default()
        });
        let clips = vec![clip("a", "x", 20), clip("b", "y", 20)];

        let err = assembler(dir.path(), clips, Arc::new(FakeFetcher::default()), encoder.clone())
            .compile(request(30))
            .await
            .unwrap_err();

        match err {
            WorkerError::Encode { stage, clip_id, .. } => {
                assert_eq!(stage, "normalize");
                assert_eq!(clip_id.as_deref(), Some("b"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(encoder.concat_inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_selected() {
        let dir = tempfile::tempdir().unwrap();
        let clips = vec![clip("a", "banned", 20)];
        let blacklist: Blacklist = ["banned"].into_iter().collect();

        let err = assembler(dir.path(), clips, Arc::new(FakeFetcher::default()), Arc::new(FakeEncoder::default()))
            .with_blacklist(Arc::new(blacklist))
            .compile(request(30))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoClips(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeClips {
            clips: Vec::new(),
            fail: true,
        };
        let assembler = Assembler::new(
            Arc::new(source),
            Arc::new(FakeFetcher::default()),
            Arc::new(FakeEncoder::default()),
            dir.path(),
        );

        let err = assembler.compile(request(30)).await.unwrap_err();
        assert!(matches!(err, WorkerError::Fetch { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_compile_window_requires_game() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = Schedule::new(
            clipreel_models::ScheduleId(1),
            "",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            7,
            30,
        );
        let window = Window::new(schedule.id, schedule.start_date, schedule.start_date + schedule.cadence());

        let err = assembler(dir.path(), Vec::new(), Arc::new(FakeFetcher::default()), Arc::new(FakeEncoder::default()))
            .compile_window(&window, &schedule)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidSchedule(_)));
    }
}
