use crate::analytics::state::AnalyticsState;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot is not valid analytics data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable backing for the analytics state.
///
/// `load` returns `Ok(None)` when nothing has been saved yet. Callers decide what a
/// failure means; the event store treats every failure as "no durable data this call".
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<AnalyticsState>, PersistenceError>;
    fn save(&self, state: &AnalyticsState) -> Result<(), PersistenceError>;

    /// Short name for log lines.
    fn describe(&self) -> String;
}

/// JSON snapshot on the local filesystem.
///
/// Saves write a sibling temp file and rename it over the target, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "analytics".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io { path: self.path.clone(), source }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<AnalyticsState>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let state = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    fn save(&self, state: &AnalyticsState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Keeps the last saved snapshot in memory. Stands in for a real backend where
/// restart survival is not needed, and lets tests inspect what was written.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<AnalyticsState>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AnalyticsState) -> Self {
        Self { slot: Mutex::new(Some(state)) }
    }

    /// Overwrites the backing data as if another process had saved it.
    pub fn replace(&self, state: AnalyticsState) {
        *self.slot.lock() = Some(state);
    }

    pub fn saved(&self) -> Option<AnalyticsState> {
        self.slot.lock().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<AnalyticsState>, PersistenceError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, state: &AnalyticsState) -> Result<(), PersistenceError> {
        *self.slot.lock() = Some(state.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
