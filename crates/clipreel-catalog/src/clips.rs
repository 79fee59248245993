//! Clip lookups with cursor pagination and near-duplicate suppression.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use clipreel_models::{Clip, TimeRange};

use crate::client::{CatalogClient, QueryParams};
use crate::error::{CatalogError, CatalogResult};
use crate::metrics::record_suppressed;
use crate::types::ClipRecord;

/// Two clips from one broadcaster captured closer than this are the same moment.
pub const DUPLICATE_WINDOW_SECS: i64 = 180;

/// Which clips to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipQuery {
    Game(String),
    Broadcaster(String),
    Id(String),
}

impl ClipQuery {
    fn operation(&self) -> &'static str {
        match self {
            ClipQuery::Game(_) => "clips_by_game",
            ClipQuery::Broadcaster(_) => "clips_by_broadcaster",
            ClipQuery::Id(_) => "clip_by_id",
        }
    }

    fn params(&self, page_size: u32, range: &TimeRange) -> QueryParams {
        let mut params: QueryParams = match self {
            ClipQuery::Game(id) => vec![("game_id", id.clone())],
            ClipQuery::Broadcaster(id) => vec![("broadcaster_id", id.clone())],
            ClipQuery::Id(id) => return vec![("id", id.clone())],
        };
        params.push(("first", page_size.to_string()));
        params.extend(range.query_pairs());
        params
    }
}

/// Fold a page into the accumulator, dropping near-duplicates.
///
/// A clip is dropped when a clip from the same broadcaster, captured less
/// than `DUPLICATE_WINDOW_SECS` apart, is already accumulated. That includes
/// clips accepted earlier on the same page but never clips from pages not
/// yet fetched, so the result depends on page order. Returns the number of
/// clips dropped.
pub fn absorb_page(acc: &mut Vec<Clip>, records: Vec<ClipRecord>) -> usize {
    let mut suppressed = 0;
    for record in records {
        let clip: Clip = record.into();
        let duplicate_of = acc.iter().find(|kept| {
            kept.same_broadcaster(&clip) && kept.seconds_apart(&clip) < DUPLICATE_WINDOW_SECS
        });
        if let Some(kept) = duplicate_of {
            debug!(
                clip_id = %clip.id,
                kept = %kept.id,
                broadcaster = %clip.broadcaster.name,
                "Suppressing near-duplicate clip"
            );
            suppressed += 1;
            continue;
        }
        acc.push(clip);
    }
    suppressed
}

impl CatalogClient {
    /// List clips matching `query` within `range`, up to `cap` results.
    ///
    /// Cancellation through `cancel` returns the partial list, not an error.
    pub async fn fetch_clips(
        &self,
        query: &ClipQuery,
        range: TimeRange,
        cap: usize,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> CatalogResult<Vec<Clip>> {
        let page_size = self.config().page_size.min(cap.max(1) as u32);
        let params = query.params(page_size, &range);

        let mut clips: Vec<Clip> = Vec::new();
        let mut suppressed = 0usize;
        let walk = self
            .paginate::<ClipRecord, _>(query.operation(), "/clips", params, cap, cancel, |records| {
                suppressed += absorb_page(&mut clips, records);
                clips.len()
            })
            .await?;

        clips.truncate(cap);
        record_suppressed(suppressed);
        info!(
            query = ?query,
            clips = clips.len(),
            pages = walk.pages,
            suppressed,
            cancelled = walk.cancelled,
            "Fetched clips"
        );
        Ok(clips)
    }

    /// Clips for a game, using the client's cancel signal.
    pub async fn clips_by_game(
        &self,
        game_id: &str,
        range: TimeRange,
        cap: usize,
    ) -> CatalogResult<Vec<Clip>> {
        self.fetch_clips(&ClipQuery::Game(game_id.to_string()), range, cap, self.cancel_signal())
            .await
    }

    /// Clips for a broadcaster, using the client's cancel signal.
    pub async fn clips_by_broadcaster(
        &self,
        broadcaster_id: &str,
        range: TimeRange,
        cap: usize,
    ) -> CatalogResult<Vec<Clip>> {
        self.fetch_clips(
            &ClipQuery::Broadcaster(broadcaster_id.to_string()),
            range,
            cap,
            self.cancel_signal(),
        )
        .await
    }

    /// A single clip by ID.
    pub async fn clip_by_id(&self, id: &str) -> CatalogResult<Option<Clip>> {
        let clips = self
            .fetch_clips(&ClipQuery::Id(id.to_string()), TimeRange::Unbounded, 1, None)
            .await?;
        Ok(clips.into_iter().next())
    }
}

/// Source of candidate clips for a compilation.
#[async_trait]
pub trait ClipSource: Send + Sync {
    async fn clips_by_game(
        &self,
        game_id: &str,
        range: TimeRange,
        cap: usize,
    ) -> CatalogResult<Vec<Clip>>;
}

#[async_trait]
impl ClipSource for CatalogClient {
    async fn clips_by_game(
        &self,
        game_id: &str,
        range: TimeRange,
        cap: usize,
    ) -> CatalogResult<Vec<Clip>> {
        if game_id.trim().is_empty() {
            return Err(CatalogError::config_error("game id is empty"));
        }
        CatalogClient::clips_by_game(self, game_id, range, cap).await
    }
}
