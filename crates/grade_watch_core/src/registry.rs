use std::collections::BTreeMap;

use thiserror::Error;
use watch_logging::watch_warn;

use crate::{JobId, JobRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("job id is empty")]
    EmptyId,
    #[error("job id {0:?} contains characters that cannot appear in a status path")]
    InvalidId(String),
}

/// Session-scoped set of watched jobs, keyed by id.
///
/// Iteration order is ascending by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobRegistry {
    jobs: BTreeMap<JobId, JobRecord>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load, skipping entries whose id fails validation.
    pub fn from_entries(entries: impl IntoIterator<Item = (JobId, JobRecord)>) -> Self {
        let mut registry = Self::new();
        for (job_id, record) in entries {
            if let Err(err) = registry.insert(job_id, record) {
                watch_warn!("Skipping job from bulk load: {}", err);
            }
        }
        registry
    }

    /// Inserts or replaces a job. Returns the previous record for that id.
    pub fn insert(
        &mut self,
        job_id: impl Into<JobId>,
        record: JobRecord,
    ) -> Result<Option<JobRecord>, RegistryError> {
        let job_id = job_id.into();
        validate_job_id(&job_id)?;
        Ok(self.jobs.insert(job_id, record.normalized()))
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.jobs.get(job_id)
    }

    pub fn get_all(&self) -> &BTreeMap<JobId, JobRecord> {
        &self.jobs
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Ids end up as a path segment of the status URL.
pub fn validate_job_id(job_id: &str) -> Result<(), RegistryError> {
    if job_id.is_empty() {
        return Err(RegistryError::EmptyId);
    }
    let bad = job_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'));
    if bad {
        return Err(RegistryError::InvalidId(job_id.to_string()));
    }
    Ok(())
}
