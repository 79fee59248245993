//! Clip catalog error types.

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur talking to the clip catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unauthorized after re-authentication: {operation}")]
    Unauthorized { operation: String },

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Download of clip {clip_id} failed: {message}")]
    Download { clip_id: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl CatalogError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn download(clip_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Download {
            clip_id: clip_id.into(),
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// HTTP status associated with the error, for metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            CatalogError::Upstream { status, .. } => Some(*status),
            CatalogError::Unauthorized { .. } => Some(401),
            CatalogError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Download failures are recorded and skipped rather than aborting a compile.
    pub fn is_soft(&self) -> bool {
        matches!(self, CatalogError::Download { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(CatalogError::upstream(503, "busy").http_status(), Some(503));
        assert_eq!(
            CatalogError::Unauthorized {
                operation: "clips".into()
            }
            .http_status(),
            Some(401)
        );
        assert_eq!(CatalogError::decode("eof").http_status(), None);
    }

    #[test]
    fn test_only_download_is_soft() {
        assert!(CatalogError::download("c1", "404").is_soft());
        assert!(!CatalogError::upstream(500, "").is_soft());
        assert!(!CatalogError::auth_error("nope").is_soft());
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err: CatalogError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, CatalogError::Decode(_)));
    }
}
