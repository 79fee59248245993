//! Compilation run identifiers and results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one compilation run; also names its working directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProcessId(pub String);

impl ProcessId {
    /// Generate a new random process ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProcessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProcessId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A non-fatal failure recorded during a compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SoftError {
    /// Clip the failure relates to
    pub clip_id: String,
    /// Pipeline stage (e.g. "download")
    pub stage: String,
    /// Human-readable message
    pub message: String,
}

impl SoftError {
    pub fn new(
        clip_id: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            clip_id: clip_id.into(),
            stage: stage.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SoftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.clip_id, self.stage, self.message)
    }
}

/// Output of one compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompilationResult {
    /// Run identifier
    pub process_id: ProcessId,

    /// Included clip IDs in selection order
    pub clip_ids: Vec<String>,

    /// Sum of the included clips' original durations, in seconds
    pub duration_seconds: u32,

    /// Number of included clips
    pub clip_count: usize,

    /// Human-readable title
    pub title: String,

    /// Chaptered description
    pub description: String,

    /// Path of the concatenated artifact
    pub artifact_path: String,

    /// Soft errors that did not abort the run
    #[serde(default)]
    pub errors: Vec<SoftError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_unique() {
        let a = ProcessId::new();
        let b = ProcessId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_soft_error_display() {
        let err = SoftError::new("AwkwardClip", "download", "status 404");
        assert_eq!(err.to_string(), "AwkwardClip (download): status 404");
    }
}
