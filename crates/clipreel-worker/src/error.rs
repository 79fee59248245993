//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

use clipreel_catalog::CatalogError;
use clipreel_media::MediaError;

use crate::store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Clip fetch failed for {window}: {source}")]
    Fetch {
        window: String,
        #[source]
        source: CatalogError,
    },

    #[error("Encode failed at {stage} (clip {}): {source}", .clip_id.as_deref().unwrap_or("all"))]
    Encode {
        stage: &'static str,
        clip_id: Option<String>,
        #[source]
        source: MediaError,
    },

    #[error("Working directory {path} unavailable: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No clips selected for {0}")]
    NoClips(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn fetch(window: impl Into<String>, source: CatalogError) -> Self {
        Self::Fetch {
            window: window.into(),
            source,
        }
    }

    pub fn encode(stage: &'static str, clip_id: impl Into<String>, source: MediaError) -> Self {
        Self::Encode {
            stage,
            clip_id: Some(clip_id.into()),
            source,
        }
    }

    /// Encode failure not tied to a single clip.
    pub fn encode_all(stage: &'static str, source: MediaError) -> Self {
        Self::Encode {
            stage,
            clip_id: None,
            source,
        }
    }

    pub fn work_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WorkDir {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Pipeline stage the error belongs to, for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::Fetch { .. } | WorkerError::Catalog(_) => "fetch",
            WorkerError::Encode { stage, .. } => *stage,
            WorkerError::Media(_) => "encode",
            WorkerError::WorkDir { .. } | WorkerError::Io(_) | WorkerError::Serialization(_) => {
                "workdir"
            }
            WorkerError::NoClips(_) => "select",
            WorkerError::InvalidSchedule(_) | WorkerError::Config(_) => "config",
            WorkerError::Persistence(_) => "persist",
        }
    }

    /// Check if a later pass may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Fetch { source, .. } | WorkerError::Catalog(source) => {
                !matches!(source, CatalogError::Config(_))
            }
            WorkerError::Encode { .. }
            | WorkerError::Media(_)
            | WorkerError::WorkDir { .. }
            | WorkerError::NoClips(_)
            | WorkerError::Persistence(_)
            | WorkerError::Io(_) => true,
            WorkerError::InvalidSchedule(_)
            | WorkerError::Config(_)
            | WorkerError::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_retry() {
        let err = WorkerError::encode("normalize", "clip-1", MediaError::Cancelled);
        assert_eq!(err.stage(), "normalize");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("clip-1"));

        let err = WorkerError::fetch("schedule 1", CatalogError::config_error("game id is empty"));
        assert_eq!(err.stage(), "fetch");
        assert!(!err.is_retryable());

        assert!(!WorkerError::invalid_schedule("no game").is_retryable());

        let err = WorkerError::encode_all("concat", MediaError::EmptyConcat);
        assert!(err.to_string().contains("clip all"));
    }
}
