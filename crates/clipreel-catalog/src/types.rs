//! Catalog wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clipreel_models::{Clip, Game, SourceVersion, User};

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Continuation cursor; empty or missing on the last page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Pagination {
    pub fn next_cursor(self) -> Option<String> {
        self.cursor.filter(|c| !c.is_empty())
    }
}

/// Clip as served by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipRecord {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub embed_url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub duration: f64,
}

impl From<ClipRecord> for Clip {
    fn from(r: ClipRecord) -> Self {
        let source_version = SourceVersion::from_thumbnail_url(&r.thumbnail_url);
        let video_url = match source_version {
            SourceVersion::V1 => derive_video_url(&r.thumbnail_url),
            SourceVersion::V2 => None,
        };
        Clip {
            id: r.id,
            url: r.url,
            broadcaster: User::new(r.broadcaster_id, r.broadcaster_name),
            clipper: User::new(r.creator_id, r.creator_name),
            video_id: r.video_id,
            game_id: r.game_id,
            language: r.language,
            title: r.title,
            view_count: r.view_count,
            created_at: r.created_at,
            duration: whole_seconds(r.duration),
            thumbnail_url: r.thumbnail_url,
            video_url,
            source_version,
        }
    }
}

/// Truncate a catalog duration to whole seconds.
///
/// Selection and chapter offsets add up these truncated values, never the
/// raw fractions.
pub fn whole_seconds(duration: f64) -> u32 {
    if duration.is_finite() && duration > 0.0 {
        duration as u32
    } else {
        0
    }
}

/// Media URL for v1 clips: the thumbnail URL up to `-preview`, with `.mp4`.
pub fn derive_video_url(thumbnail_url: &str) -> Option<String> {
    thumbnail_url
        .find("-preview")
        .map(|idx| format!("{}.mp4", &thumbnail_url[..idx]))
}

/// Game as served by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub box_art_url: String,
}

impl From<GameRecord> for Game {
    fn from(r: GameRecord) -> Self {
        Game {
            id: r.id,
            name: r.name,
            box_art_url: r.box_art_url,
        }
    }
}

/// Token endpoint response, also the on-disk cache format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub token_type: String,
}

/// v2 media lookup response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverResponse {
    #[serde(default)]
    pub data: Vec<ResolvedMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedMedia {
    pub video_url: String,
}
