//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-compile working directories
    pub work_dir: PathBuf,
    /// Global broadcaster blacklist, one name per line
    pub blacklist_path: PathBuf,
    /// Game ID to name map
    pub game_list_path: PathBuf,
    /// JSON file holding schedules and windows
    pub store_path: PathBuf,
    /// Upper bound on clips fetched per compile
    pub clip_fetch_cap: usize,
    /// Maximum concurrent FFmpeg processes per compile
    pub max_ffmpeg_processes: usize,
    /// Kill a single FFmpeg invocation after this long
    pub ffmpeg_timeout: Duration,
    /// Time between scheduling passes
    pub schedule_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/clipreel"),
            blacklist_path: PathBuf::from("blacklist.txt"),
            game_list_path: PathBuf::from("game-list.json"),
            store_path: PathBuf::from("clipreel-store.json"),
            clip_fetch_cap: 1000,
            max_ffmpeg_processes: 4,
            ffmpeg_timeout: Duration::from_secs(1800),
            schedule_interval: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            blacklist_path: std::env::var("BLACKLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.blacklist_path),
            game_list_path: std::env::var("GAME_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.game_list_path),
            store_path: std::env::var("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            clip_fetch_cap: std::env::var("CLIP_FETCH_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|cap| *cap > 0)
                .unwrap_or(defaults.clip_fetch_cap),
            max_ffmpeg_processes: std::env::var("WORKER_MAX_FFMPEG")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_ffmpeg_processes),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            schedule_interval: Duration::from_secs(
                std::env::var("SCHEDULE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for key in [
            "WORKER_WORK_DIR",
            "BLACKLIST_PATH",
            "GAME_LIST_PATH",
            "STORE_PATH",
            "CLIP_FETCH_CAP",
            "WORKER_MAX_FFMPEG",
            "FFMPEG_TIMEOUT_SECS",
            "SCHEDULE_INTERVAL_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = WorkerConfig::from_env();
        assert_eq!(config.clip_fetch_cap, 1000);
        assert_eq!(config.max_ffmpeg_processes, 4);
        assert_eq!(config.work_dir, PathBuf::from("/tmp/clipreel"));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("WORKER_WORK_DIR", "/var/clipreel");
        std::env::set_var("CLIP_FETCH_CAP", "250");
        std::env::set_var("WORKER_MAX_FFMPEG", "0");
        std::env::set_var("SCHEDULE_INTERVAL_SECS", "60");

        let config = WorkerConfig::from_env();
        assert_eq!(config.work_dir, PathBuf::from("/var/clipreel"));
        assert_eq!(config.clip_fetch_cap, 250);
        assert_eq!(config.max_ffmpeg_processes, 4);
        assert_eq!(config.schedule_interval, Duration::from_secs(60));
        clear();
    }
}
