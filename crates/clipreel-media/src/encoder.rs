//! Encoder seam used by the compilation assembler.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::concat::prepare_concat;
use crate::error::MediaResult;
use crate::filters::{normalize_chain, NormalizeProfile};

/// One normalization job.
#[derive(Debug, Clone)]
pub struct NormalizeJob {
    /// Downloaded clip body
    pub input: PathBuf,
    /// Normalized output
    pub output: PathBuf,
    /// Text burned into the credit overlay
    pub credit: String,
}

/// External encoder operations.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encoder name for logging.
    fn name(&self) -> &'static str;

    /// Re-encode one clip to the shared profile with its credit overlay.
    async fn normalize(&self, job: &NormalizeJob, log_path: Option<&Path>) -> MediaResult<()>;

    /// Splice normalized clips, in order, into `output`.
    async fn concat(&self, inputs: &[PathBuf], output: &Path, log_path: Option<&Path>) -> MediaResult<()>;
}

/// FFmpeg-backed encoder.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    profile: NormalizeProfile,
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(NormalizeProfile::default())
    }
}

impl FfmpegEncoder {
    pub fn new(profile: NormalizeProfile) -> Self {
        Self {
            profile,
            timeout_secs: None,
            cancel_rx: None,
        }
    }

    /// Kill any single invocation that runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn profile(&self) -> &NormalizeProfile {
        &self.profile
    }

    /// Command for one normalization job.
    pub fn normalize_command(&self, job: &NormalizeJob) -> FfmpegCommand {
        FfmpegCommand::new(&job.input, &job.output)
            .log_level("info")
            .video_filter(normalize_chain(&self.profile, Some(&job.credit)))
            .video_codec(self.profile.video_codec)
            .audio_codec(self.profile.audio_codec)
    }

    fn runner(&self, log_path: Option<&Path>) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }
        if let Some(path) = log_path {
            runner = runner.with_log_file(path);
        }
        runner
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn normalize(&self, job: &NormalizeJob, log_path: Option<&Path>) -> MediaResult<()> {
        let cmd = self.normalize_command(job);
        let started = Instant::now();
        debug!(input = %job.input.display(), credit = %job.credit, "Normalizing clip");

        let result = self.runner(log_path).run(&cmd).await;
        record_invocation("normalize", started, result.is_ok());
        result
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path, log_path: Option<&Path>) -> MediaResult<()> {
        let cmd = prepare_concat(inputs, output).await?.log_level("info");
        let started = Instant::now();
        info!(clips = inputs.len(), output = %output.display(), "Concatenating clips");

        let result = self.runner(log_path).run(&cmd).await;
        record_invocation("concat", started, result.is_ok());
        result
    }
}

fn record_invocation(op: &'static str, started: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!("clipreel_ffmpeg_invocations_total", "op" => op, "status" => status)
        .increment(1);
    metrics::histogram!("clipreel_ffmpeg_duration_seconds", "op" => op)
        .record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_command() {
        let encoder = FfmpegEncoder::default();
        let job = NormalizeJob {
            input: PathBuf::from("/w/clip.mp4"),
            output: PathBuf::from("/w/clip.norm.mp4"),
            credit: "summit1g".to_string(),
        };
        let args = encoder.normalize_command(&job).build_args();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].starts_with("format=pix_fmts=yuv420p,scale=1280x720,fps=fps=30,"));
        assert!(args[vf + 1].contains("text='summit1g'"));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert_eq!(args.last().map(String::as_str), Some("/w/clip.norm.mp4"));
    }
}
