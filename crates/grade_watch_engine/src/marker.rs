use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use grade_watch_core::JobId;
use serde::{Deserialize, Serialize};
use watch_logging::{watch_info, watch_warn};

use crate::persist::{ensure_state_dir, AtomicFileWriter, PersistError};

/// Records which jobs the user has already been told about.
///
/// Each key is read and written atomically; different keys never interfere.
pub trait CompletionMarkerStore: Send + Sync {
    fn is_marked(&self, job_id: &str) -> bool;

    /// Sets the marker. Marking an id twice is not an error.
    fn mark(&self, job_id: &str) -> Result<(), PersistError>;

    fn marked_ids(&self) -> Vec<JobId>;
}

fn lock(set: &Mutex<BTreeSet<JobId>>) -> MutexGuard<'_, BTreeSet<JobId>> {
    // A panic while holding the lock cannot leave the set half-updated.
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Markers that live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    marked: Mutex<BTreeSet<JobId>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marked(ids: impl IntoIterator<Item = JobId>) -> Self {
        Self {
            marked: Mutex::new(ids.into_iter().collect()),
        }
    }
}

impl CompletionMarkerStore for MemoryMarkerStore {
    fn is_marked(&self, job_id: &str) -> bool {
        lock(&self.marked).contains(job_id)
    }

    fn mark(&self, job_id: &str) -> Result<(), PersistError> {
        lock(&self.marked).insert(job_id.to_string());
        Ok(())
    }

    fn marked_ids(&self) -> Vec<JobId> {
        lock(&self.marked).iter().cloned().collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MarkerFile {
    completed: BTreeSet<JobId>,
}

/// Markers kept in `{dir}/{session}.markers.json`, so a restarted watcher for
/// the same session does not notify twice.
pub struct FileMarkerStore {
    filename: String,
    path: PathBuf,
    writer: AtomicFileWriter,
    marked: Mutex<BTreeSet<JobId>>,
}

impl FileMarkerStore {
    pub fn open(dir: &Path, session: &str) -> Result<Self, PersistError> {
        ensure_state_dir(dir)?;
        let filename = format!("{session}.markers.json");
        let path = dir.join(&filename);
        let marked = load_markers(&path)?;
        if !marked.is_empty() {
            watch_info!("Restored {} completion markers from {:?}", marked.len(), path);
        }
        Ok(Self {
            filename,
            path,
            writer: AtomicFileWriter::new(dir.to_path_buf()),
            marked: Mutex::new(marked),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forgets every marker, in memory and on disk.
    pub fn clear(&self) -> Result<(), PersistError> {
        let mut marked = lock(&self.marked);
        self.writer.remove(&self.filename)?;
        marked.clear();
        Ok(())
    }
}

impl CompletionMarkerStore for FileMarkerStore {
    fn is_marked(&self, job_id: &str) -> bool {
        lock(&self.marked).contains(job_id)
    }

    fn mark(&self, job_id: &str) -> Result<(), PersistError> {
        let mut marked = lock(&self.marked);
        if !marked.insert(job_id.to_string()) {
            return Ok(());
        }
        // The in-memory marker stays set even if the write fails, so this
        // process still never notifies twice.
        let content = serde_json::to_vec_pretty(&MarkerFile {
            completed: marked.clone(),
        })?;
        self.writer.write(&self.filename, &content)?;
        Ok(())
    }

    fn marked_ids(&self) -> Vec<JobId> {
        lock(&self.marked).iter().cloned().collect()
    }
}

fn load_markers(path: &Path) -> Result<BTreeSet<JobId>, PersistError> {
    let content = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => return Err(err.into()),
    };
    match serde_json::from_slice::<MarkerFile>(&content) {
        Ok(file) => Ok(file.completed),
        Err(err) => {
            watch_warn!("Ignoring unreadable marker file {:?}: {}", path, err);
            Ok(BTreeSet::new())
        }
    }
}
