//! Process-wide wiring shared by the worker and API binaries.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use clipreel_catalog::{CatalogClient, ClipDownloader, GameDirectory, GameSource};
use clipreel_media::FfmpegEncoder;

use crate::assembler::Assembler;
use crate::blacklist::Blacklist;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pass::SchedulePass;
use crate::store::{JsonFileStore, WindowStore};

/// Long-lived state loaded once at startup.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub catalog: Arc<CatalogClient>,
    pub games: Arc<GameDirectory>,
    pub store: Arc<dyn WindowStore>,
    pub assembler: Arc<Assembler>,
}

impl WorkerContext {
    /// Load catalog credentials, the blacklist, the game list and the store.
    ///
    /// `cancel_rx` stops in-flight pagination and FFmpeg invocations.
    pub async fn from_env(config: WorkerConfig, cancel_rx: watch::Receiver<bool>) -> WorkerResult<Self> {
        let catalog = CatalogClient::from_env()?.with_cancel(cancel_rx.clone());
        let catalog = Arc::new(catalog);

        let blacklist = Blacklist::load(&config.blacklist_path)
            .await
            .map_err(|e| WorkerError::config_error(format!("blacklist {}: {e}", config.blacklist_path.display())))?;
        let games = Arc::new(GameDirectory::load(&config.game_list_path).await?);
        let store: Arc<dyn WindowStore> = Arc::new(JsonFileStore::open(&config.store_path).await?);

        tokio::fs::create_dir_all(&config.work_dir)
            .await
            .map_err(|e| WorkerError::work_dir(&config.work_dir, e))?;

        let downloader = ClipDownloader::new(catalog.http().clone(), catalog.config().resolver_url.clone());
        let encoder = FfmpegEncoder::default()
            .with_timeout(config.ffmpeg_timeout.as_secs())
            .with_cancel(cancel_rx);

        let assembler = Assembler::new(
            catalog.clone(),
            Arc::new(downloader),
            Arc::new(encoder),
            config.work_dir.clone(),
        )
        .with_games(games.clone(), Some(catalog.clone() as Arc<dyn GameSource>))
        .with_blacklist(Arc::new(blacklist))
        .with_fetch_cap(config.clip_fetch_cap)
        .with_max_ffmpeg(config.max_ffmpeg_processes);

        info!(
            work_dir = %config.work_dir.display(),
            store = %config.store_path.display(),
            "Worker context ready"
        );

        Ok(Self {
            config,
            catalog,
            games,
            store,
            assembler: Arc::new(assembler),
        })
    }

    pub fn schedule_pass(&self) -> SchedulePass {
        SchedulePass::new(self.store.clone(), self.assembler.clone())
    }
}
