//! Game lookups and the local game directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use clipreel_models::Game;

use crate::client::{CatalogClient, QueryParams};
use crate::config::MAX_PAGE_SIZE;
use crate::error::CatalogResult;
use crate::types::{GameRecord, Page};

impl CatalogClient {
    /// Most-watched games, up to `cap`.
    pub async fn top_games(&self, cap: usize) -> CatalogResult<Vec<Game>> {
        let params: QueryParams = vec![("first", MAX_PAGE_SIZE.min(cap.max(1) as u32).to_string())];
        let mut games: Vec<Game> = Vec::new();
        self.paginate::<GameRecord, _>("top_games", "/games/top", params, cap, self.cancel_signal(), |records| {
            games.extend(records.into_iter().map(Game::from));
            games.len()
        })
        .await?;
        games.truncate(cap);
        Ok(games)
    }

    /// Games by ID, batched to the catalog's page size.
    pub async fn games_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Game>> {
        let mut games = Vec::new();
        for chunk in ids.chunks(MAX_PAGE_SIZE as usize) {
            let params: QueryParams = chunk.iter().map(|id| ("id", id.clone())).collect();
            let page: Page<GameRecord> = self.get_json("games_by_ids", "/games", &params).await?;
            games.extend(page.data.into_iter().map(Game::from));
        }
        Ok(games)
    }
}

/// Source of game metadata.
#[async_trait]
pub trait GameSource: Send + Sync {
    async fn games_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Game>>;
    async fn top_games(&self, cap: usize) -> CatalogResult<Vec<Game>>;
}

#[async_trait]
impl GameSource for CatalogClient {
    async fn games_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Game>> {
        CatalogClient::games_by_ids(self, ids).await
    }

    async fn top_games(&self, cap: usize) -> CatalogResult<Vec<Game>> {
        CatalogClient::top_games(self, cap).await
    }
}

/// Game ID to name map, optionally backed by a JSON file.
pub struct GameDirectory {
    path: Option<PathBuf>,
    names: RwLock<HashMap<String, String>>,
}

impl GameDirectory {
    /// An empty in-memory directory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Load from `path`; a missing file yields an empty directory.
    pub async fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        let names = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, String>>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), games = names.len(), "Loaded game directory");
        Ok(Self {
            path: Some(path),
            names: RwLock::new(names),
        })
    }

    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }

    pub async fn name(&self, id: &str) -> Option<String> {
        self.names.read().await.get(id).cloned()
    }

    /// Insert or overwrite entries.
    pub async fn merge(&self, games: &[Game]) {
        let mut names = self.names.write().await;
        for game in games {
            names.insert(game.id.clone(), game.name.clone());
        }
    }

    /// All entries.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.names.read().await.clone()
    }

    /// Persist to the backing file, if any.
    pub async fn save(&self) -> CatalogResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let body = {
            let names = self.names.read().await;
            serde_json::to_vec_pretty(&*names)?
        };
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Name for `id`, looking it up in `source` when unknown.
    ///
    /// Falls back to the ID itself when the lookup fails or finds nothing.
    pub async fn resolve_name(&self, source: &dyn GameSource, id: &str) -> String {
        if let Some(name) = self.name(id).await {
            return name;
        }
        match source.games_by_ids(&[id.to_string()]).await {
            Ok(games) if !games.is_empty() => {
                self.merge(&games).await;
                if let Err(e) = self.save().await {
                    warn!(error = %e, "Failed to persist game directory");
                }
                self.name(id).await.unwrap_or_else(|| id.to_string())
            }
            Ok(_) => id.to_string(),
            Err(e) => {
                warn!(game_id = %id, error = %e, "Game lookup failed, using id as name");
                id.to_string()
            }
        }
    }

    /// Replace known names with the current top games and persist.
    pub async fn refresh_top(&self, source: &dyn GameSource, cap: usize) -> CatalogResult<Vec<Game>> {
        let games = source.top_games(cap).await?;
        self.merge(&games).await;
        self.save().await?;
        info!(games = games.len(), "Refreshed game directory");
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    struct FixedGames(Vec<Game>);

    #[async_trait]
    impl GameSource for FixedGames {
        async fn games_by_ids(&self, ids: &[String]) -> CatalogResult<Vec<Game>> {
            Ok(self
                .0
                .iter()
                .filter(|g| ids.contains(&g.id))
                .cloned()
                .collect())
        }

        async fn top_games(&self, cap: usize) -> CatalogResult<Vec<Game>> {
            Ok(self.0.iter().take(cap).cloned().collect())
        }
    }

    struct FailingGames;

    #[async_trait]
    impl GameSource for FailingGames {
        async fn games_by_ids(&self, _ids: &[String]) -> CatalogResult<Vec<Game>> {
            Err(CatalogError::upstream(503, "down"))
        }

        async fn top_games(&self, _cap: usize) -> CatalogResult<Vec<Game>> {
            Err(CatalogError::upstream(503, "down"))
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let directory = GameDirectory::load(dir.path().join("game-list.json")).await.unwrap();
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_resolve_name_fetches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game-list.json");
        let directory = GameDirectory::load(&path).await.unwrap();
        let source = FixedGames(vec![Game::new("21779", "League of Legends")]);

        assert_eq!(
            directory.resolve_name(&source, "21779").await,
            "League of Legends"
        );

        let reloaded = GameDirectory::load(&path).await.unwrap();
        assert_eq!(
            reloaded.name("21779").await.as_deref(),
            Some("League of Legends")
        );
    }

    #[tokio::test]
    async fn test_resolve_name_falls_back_to_id() {
        let directory = GameDirectory::in_memory();
        assert_eq!(directory.resolve_name(&FailingGames, "999").await, "999");
        assert_eq!(directory.resolve_name(&FixedGames(vec![]), "998").await, "998");
    }

    #[tokio::test]
    async fn test_refresh_top() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game-list.json");
        let directory = GameDirectory::load(&path).await.unwrap();
        let source = FixedGames(vec![Game::new("1", "One"), Game::new("2", "Two")]);

        let games = directory.refresh_top(&source, 1).await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(directory.len().await, 1);
        assert!(path.exists());
    }
}
