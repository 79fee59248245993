//! Source clip models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Thumbnail asset marker used by the newer clip storage layout.
pub const V2_THUMBNAIL_MARKER: &str = "twitch-clips-thumbnails-prod";

/// Account reference (broadcaster or clipper).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Storage layout version of a clip's media, selecting the download strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum SourceVersion {
    /// Media lives next to the thumbnail and can be fetched directly.
    #[default]
    #[serde(rename = "1")]
    V1,
    /// Media must be resolved through a lookup service first.
    #[serde(rename = "2")]
    V2,
}

impl SourceVersion {
    /// Detect the version from a thumbnail URL.
    pub fn from_thumbnail_url(url: &str) -> Self {
        if url.contains(V2_THUMBNAIL_MARKER) {
            SourceVersion::V2
        } else {
            SourceVersion::V1
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceVersion::V1 => "1",
            SourceVersion::V2 => "2",
        }
    }
}

impl fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source clip as returned by the clip catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Catalog clip ID
    pub id: String,

    /// Public page URL
    pub url: String,

    /// Broadcaster the clip was cut from
    pub broadcaster: User,

    /// Account that cut the clip
    pub clipper: User,

    /// Source VOD, if any
    #[serde(default)]
    pub video_id: String,

    /// Game (category) ID
    pub game_id: String,

    /// Broadcast language
    #[serde(default)]
    pub language: String,

    /// Clip title
    pub title: String,

    /// View count at fetch time
    #[serde(default)]
    pub view_count: u64,

    /// Capture instant
    pub created_at: DateTime<Utc>,

    /// Duration in whole seconds
    pub duration: u32,

    /// Thumbnail URL
    pub thumbnail_url: String,

    /// Direct media URL derived from the thumbnail (v1 layout only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Media storage layout
    #[serde(default)]
    pub source_version: SourceVersion,
}

impl Clip {
    /// True if both clips come from the same broadcaster.
    pub fn same_broadcaster(&self, other: &Clip) -> bool {
        self.broadcaster.id == other.broadcaster.id
    }

    /// Absolute distance between the capture instants, in seconds.
    pub fn seconds_apart(&self, other: &Clip) -> i64 {
        (self.created_at - other.created_at).num_seconds().abs()
    }

    /// Local file name for the downloaded clip body.
    pub fn file_name(&self) -> String {
        format!("{}.mp4", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_detection() {
        assert_eq!(
            SourceVersion::from_thumbnail_url(
                "https://static-cdn.jtvnw.net/twitch-clips-thumbnails-prod/Slug/abc/preview-480x272.jpg"
            ),
            SourceVersion::V2
        );
        assert_eq!(
            SourceVersion::from_thumbnail_url(
                "https://clips-media-assets2.twitch.tv/AT-cm%7C123-preview-480x272.jpg"
            ),
            SourceVersion::V1
        );
    }

    #[test]
    fn test_version_serializes_as_digit() {
        assert_eq!(serde_json::to_string(&SourceVersion::V2).unwrap(), "\"2\"");
        let v: SourceVersion = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(v, SourceVersion::V1);
    }
}
