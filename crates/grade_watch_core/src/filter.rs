use std::collections::BTreeMap;

use crate::{JobId, JobRecord, SYNTHETIC_ID_PREFIX};

pub fn has_synthetic_prefix(job_id: &str) -> bool {
    job_id.starts_with(SYNTHETIC_ID_PREFIX)
}

pub fn is_marked_mock(record: &JobRecord) -> bool {
    record.is_mock
}

/// A job is polled only when neither the id prefix nor the mock flag marks it
/// as a demo entry. Either check alone excludes it.
pub fn is_pollable(job_id: &str, record: &JobRecord) -> bool {
    !(has_synthetic_prefix(job_id) || is_marked_mock(record))
}

/// Subset of `jobs` that should be polled. Empty means there is nothing to do.
pub fn select_pollable(jobs: &BTreeMap<JobId, JobRecord>) -> BTreeMap<JobId, JobRecord> {
    jobs.iter()
        .filter(|(job_id, record)| is_pollable(job_id, record))
        .map(|(job_id, record)| (job_id.clone(), record.clone()))
        .collect()
}
