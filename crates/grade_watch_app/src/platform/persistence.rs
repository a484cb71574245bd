use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use grade_watch_core::{JobId, JobRecord, JobRegistry};
use grade_watch_engine::FileMarkerStore;
use watch_logging::{watch_info, watch_warn};

use super::config::AppConfig;

/// Loads the jobs file written by the submission flow.
///
/// The file is a JSON object keyed by job id, the same shape the web front end
/// keeps in its session store.
pub(crate) fn load_registry(path: &Path) -> Result<JobRegistry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading jobs file {}", path.display()))?;
    let entries = parse_jobs(&content)
        .with_context(|| format!("parsing jobs file {}", path.display()))?;
    let total = entries.len();

    let registry = JobRegistry::from_entries(entries);
    if registry.len() < total {
        watch_warn!(
            "{} of {} jobs in {:?} were skipped",
            total - registry.len(),
            total,
            path
        );
    }
    watch_info!("Loaded {} jobs from {:?}", registry.len(), path);
    Ok(registry)
}

fn parse_jobs(content: &str) -> Result<BTreeMap<JobId, JobRecord>> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(content)?)
}

pub(crate) fn open_marker_store(config: &AppConfig) -> Result<FileMarkerStore> {
    FileMarkerStore::open(&config.state_dir, &config.session).with_context(|| {
        format!(
            "opening marker store for session {:?} in {}",
            config.session,
            config.state_dir.display()
        )
    })
}
