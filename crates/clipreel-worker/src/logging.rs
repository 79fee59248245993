//! Structured compile logging.
//!
//! Every lifecycle event of one compile carries the process ID and the
//! window it was started for, so a run can be followed across log lines.

use tracing::{error, info, warn, Span};

use clipreel_models::ProcessId;

/// Logger bound to one compile run.
#[derive(Debug, Clone)]
pub struct CompileLogger {
    process_id: String,
    window: String,
}

impl CompileLogger {
    /// Create a logger for `process_id` compiling `window`.
    ///
    /// `window` is a human-readable label such as `Window::label()`.
    pub fn new(process_id: &ProcessId, window: impl Into<String>) -> Self {
        Self {
            process_id: process_id.to_string(),
            window: window.into(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            process_id = %self.process_id,
            window = %self.window,
            "Compile started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            process_id = %self.process_id,
            window = %self.window,
            "Compile progress: {}", message
        );
    }

    /// Log a soft failure tied to one clip.
    pub fn log_skip(&self, clip_id: &str, stage: &str, message: &str) {
        warn!(
            process_id = %self.process_id,
            window = %self.window,
            clip_id = %clip_id,
            stage = %stage,
            "Clip skipped: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            process_id = %self.process_id,
            window = %self.window,
            "Compile warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            process_id = %self.process_id,
            window = %self.window,
            "Compile error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            process_id = %self.process_id,
            window = %self.window,
            "Compile completed: {}", message
        );
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn window(&self) -> &str {
        &self.window
    }

    /// Span wrapping the whole compile.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "compile",
            process_id = %self.process_id,
            window = %self.window
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_logger_creation() {
        let process_id = ProcessId::from_string("run-1");
        let logger = CompileLogger::new(&process_id, "schedule 3 [a .. b]");

        assert_eq!(logger.process_id(), "run-1");
        assert_eq!(logger.window(), "schedule 3 [a .. b]");
    }
}
