//! Schedule and window storage.
//!
//! The worker only needs a handful of reads and writes; any backend that
//! implements [`WindowStore`] can sit behind the scheduler. Two are provided:
//! an in-memory store and a store persisted as one JSON document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use clipreel_models::{Schedule, ScheduleId, Window};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Window not found: schedule {schedule_id} starting {start}")]
    WindowNotFound {
        schedule_id: ScheduleId,
        start: DateTime<Utc>,
    },

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence operations the scheduler depends on.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>>;

    async fn count_windows(&self, schedule_id: ScheduleId) -> StoreResult<usize>;

    /// Windows of one schedule, most recent first.
    async fn list_windows(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Window>>;

    async fn insert_windows(&self, windows: &[Window]) -> StoreResult<()>;

    /// Record the artifact of the window identified by schedule and start.
    async fn set_artifact_location(
        &self,
        schedule_id: ScheduleId,
        window_start: DateTime<Utc>,
        location: &str,
    ) -> StoreResult<()>;
}

/// Document shared by both stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl StoreState {
    fn put_schedule(&mut self, schedule: Schedule) {
        match self.schedules.iter_mut().find(|s| s.id == schedule.id) {
            Some(existing) => *existing = schedule,
            None => self.schedules.push(schedule),
        }
    }

    fn count(&self, schedule_id: ScheduleId) -> usize {
        self.windows
            .iter()
            .filter(|w| w.schedule_id == schedule_id)
            .count()
    }

    fn list(&self, schedule_id: ScheduleId) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .windows
            .iter()
            .filter(|w| w.schedule_id == schedule_id)
            .cloned()
            .collect();
        windows.sort_by(|a, b| b.start.cmp(&a.start));
        windows
    }

    fn insert(&mut self, windows: &[Window]) {
        for window in windows {
            let exists = self
                .windows
                .iter()
                .any(|w| w.schedule_id == window.schedule_id && w.start == window.start);
            if !exists {
                self.windows.push(window.clone());
            }
        }
    }

    fn set_artifact(
        &mut self,
        schedule_id: ScheduleId,
        start: DateTime<Utc>,
        location: &str,
    ) -> StoreResult<()> {
        let window = self
            .windows
            .iter_mut()
            .find(|w| w.schedule_id == schedule_id && w.start == start)
            .ok_or(StoreError::WindowNotFound { schedule_id, start })?;
        window.cache_destination = Some(location.to_string());
        Ok(())
    }
}

/// Store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedules(schedules: Vec<Schedule>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                schedules,
                windows: Vec::new(),
            }),
        }
    }

    pub async fn put_schedule(&self, schedule: Schedule) {
        self.state.write().await.put_schedule(schedule);
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        Ok(self.state.read().await.schedules.clone())
    }

    async fn count_windows(&self, schedule_id: ScheduleId) -> StoreResult<usize> {
        Ok(self.state.read().await.count(schedule_id))
    }

    async fn list_windows(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Window>> {
        Ok(self.state.read().await.list(schedule_id))
    }

    async fn insert_windows(&self, windows: &[Window]) -> StoreResult<()> {
        self.state.write().await.insert(windows);
        Ok(())
    }

    async fn set_artifact_location(
        &self,
        schedule_id: ScheduleId,
        window_start: DateTime<Utc>,
        location: &str,
    ) -> StoreResult<()> {
        self.state
            .write()
            .await
            .set_artifact(schedule_id, window_start, location)
    }
}

/// Store persisted as a single JSON file, rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Open `path`; a missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(
            path = %path.display(),
            schedules = state.schedules.len(),
            windows = state.windows.len(),
            "Opened window store"
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn put_schedule(&self, schedule: Schedule) -> StoreResult<()> {
        self.update(|state| {
            state.put_schedule(schedule);
            Ok(())
        })
        .await
    }

    /// Apply `change` to a copy, persist it, then make it current.
    ///
    /// A failed write leaves the in-memory state matching the file.
    async fn update<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoreState) -> StoreResult<()>,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl WindowStore for JsonFileStore {
    async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
        Ok(self.state.lock().await.schedules.clone())
    }

    async fn count_windows(&self, schedule_id: ScheduleId) -> StoreResult<usize> {
        Ok(self.state.lock().await.count(schedule_id))
    }

    async fn list_windows(&self, schedule_id: ScheduleId) -> StoreResult<Vec<Window>> {
        Ok(self.state.lock().await.list(schedule_id))
    }

    async fn insert_windows(&self, windows: &[Window]) -> StoreResult<()> {
        if windows.is_empty() {
            return Ok(());
        }
        self.update(|state| {
            state.insert(windows);
            Ok(())
        })
        .await
    }

    async fn set_artifact_location(
        &self,
        schedule_id: ScheduleId,
        window_start: DateTime<Utc>,
        location: &str,
    ) -> StoreResult<()> {
        self.update(|state| state.set_artifact(schedule_id, window_start, location))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn schedule() -> Schedule {
        Schedule::new(
            ScheduleId(7),
            "33214",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            7,
            600,
        )
    }

    fn windows() -> Vec<Window> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..3)
            .map(|i| {
                let s = start + Duration::days(7 * i);
                Window::new(ScheduleId(7), s, s + Duration::days(7) - Duration::seconds(1))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_memory_store_lists_most_recent_first() {
        let store = MemoryStore::with_schedules(vec![schedule()]);
        store.insert_windows(&windows()).await.unwrap();

        assert_eq!(store.count_windows(ScheduleId(7)).await.unwrap(), 3);
        assert_eq!(store.count_windows(ScheduleId(8)).await.unwrap(), 0);
        let listed = store.list_windows(ScheduleId(7)).await.unwrap();
        assert!(listed[0].start > listed[1].start);
        assert!(listed[1].start > listed[2].start);
    }

    #[tokio::test]
    async fn test_insert_ignores_existing_windows() {
        let store = MemoryStore::new();
        store.insert_windows(&windows()).await.unwrap();
        store.insert_windows(&windows()).await.unwrap();
        assert_eq!(store.count_windows(ScheduleId(7)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_set_artifact_location() {
        let store = MemoryStore::new();
        let all = windows();
        store.insert_windows(&all).await.unwrap();

        store
            .set_artifact_location(ScheduleId(7), all[1].start, "/work/p/compilation.mp4")
            .await
            .unwrap();
        let listed = store.list_windows(ScheduleId(7)).await.unwrap();
        assert_eq!(listed[1].cache_destination.as_deref(), Some("/work/p/compilation.mp4"));
        assert!(listed[0].is_pending());

        let missing = store
            .set_artifact_location(ScheduleId(9), all[0].start, "x")
            .await;
        assert!(matches!(missing, Err(StoreError::WindowNotFound { .. })));
    }

    #[tokio::test]
    async fn test_json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.put_schedule(schedule()).await.unwrap();
        let all = windows();
        store.insert_windows(&all).await.unwrap();
        store
            .set_artifact_location(ScheduleId(7), all[0].start, "/work/a/compilation.mp4")
            .await
            .unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_schedules().await.unwrap().len(), 1);
        let listed = reopened.list_windows(ScheduleId(7)).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(
            listed.last().unwrap().cache_destination.as_deref(),
            Some("/work/a/compilation.mp4")
        );
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_in_step_with_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        tokio::fs::create_dir(&data_dir).await.unwrap();
        let store = JsonFileStore::open(data_dir.join("store.json")).await.unwrap();
        let all = windows();
        store.insert_windows(&all).await.unwrap();

        // Writes now fail: the directory holding the file is gone
        tokio::fs::remove_dir_all(&data_dir).await.unwrap();

        let result = store
            .set_artifact_location(ScheduleId(7), all[0].start, "/work/a/compilation.mp4")
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        let listed = store.list_windows(ScheduleId(7)).await.unwrap();
        assert!(listed.iter().all(|w| w.is_pending()));

        let extra = Window::new(
            ScheduleId(8),
            all[0].start,
            all[0].end,
        );
        assert!(store.insert_windows(&[extra]).await.is_err());
        assert_eq!(store.count_windows(ScheduleId(8)).await.unwrap(), 0);
    }
}
