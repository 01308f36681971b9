use std::path::{Path, PathBuf};

use crate::foundation::error::{StrataError, StrataResult};
use crate::playback::timer::MIN_FPS;

/// Budget and location of one [`ContentCache`](crate::ContentCache).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheOpts {
    /// Maximum bytes held by the memory tier.
    pub max_memory_bytes: u64,
    /// Maximum bytes held by the disk tier. `0` disables the disk tier.
    pub max_disk_bytes: u64,
    /// Root directory of the disk tier. `None` keeps the cache memory-only.
    pub disk_root: Option<PathBuf>,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self {
            max_memory_bytes: 512 * 1024 * 1024,
            max_disk_bytes: 0,
            disk_root: None,
        }
    }
}

impl CacheOpts {
    pub fn memory_only(max_memory_bytes: u64) -> Self {
        Self {
            max_memory_bytes,
            max_disk_bytes: 0,
            disk_root: None,
        }
    }

    pub fn with_disk(
        max_memory_bytes: u64,
        max_disk_bytes: u64,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            max_memory_bytes,
            max_disk_bytes,
            disk_root: Some(root.into()),
        }
    }

    pub fn disk_enabled(&self) -> bool {
        self.max_disk_bytes > 0 && self.disk_root.is_some()
    }
}

/// Engine-wide settings: cache budgets, tile parallelism and playback behavior.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Cache of per-node rendered images (heap-backed entries).
    pub node_cache: CacheOpts,
    /// Cache of final output frames (file-backed entries when a disk root is set).
    pub frame_cache: CacheOpts,
    /// Worker threads for tile fan-out. `None` uses rayon defaults.
    pub tile_threads: Option<usize>,
    /// Run playback on a dedicated scheduler thread. When `false` every `start` runs the
    /// whole sequence on the caller's thread.
    pub threaded_playback: bool,
    /// Number of views rendered per frame.
    pub views: u32,
    /// Playback pacing target.
    pub desired_fps: f64,
    /// Timeline bounds `[first, last]` used when the output does not constrain time.
    pub timeline_first: i64,
    pub timeline_last: i64,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            node_cache: CacheOpts::default(),
            frame_cache: CacheOpts {
                max_memory_bytes: 256 * 1024 * 1024,
                max_disk_bytes: 2 * 1024 * 1024 * 1024,
                disk_root: None,
            },
            tile_threads: None,
            threaded_playback: true,
            views: 1,
            desired_fps: 24.0,
            timeline_first: 1,
            timeline_last: 100,
        }
    }
}

impl EngineOpts {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> StrataResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| StrataError::io(path, e))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> StrataResult<Self> {
        let opts: Self = serde_json::from_str(text).map_err(|e| StrataError::serde(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> StrataResult<()> {
        if self.views == 0 {
            return Err(StrataError::validation("views must be >= 1"));
        }
        if !self.desired_fps.is_finite() || self.desired_fps < MIN_FPS {
            return Err(StrataError::validation(format!(
                "desired_fps must be finite and >= {MIN_FPS}"
            )));
        }
        if self.tile_threads == Some(0) {
            return Err(StrataError::validation(
                "tile_threads must be >= 1 when set",
            ));
        }
        if self.timeline_first > self.timeline_last {
            return Err(StrataError::validation(
                "timeline_first must be <= timeline_last",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
