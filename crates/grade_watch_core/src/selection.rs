use std::collections::BTreeMap;

use crate::filter::has_synthetic_prefix;
use crate::job::truncated_id;
use crate::{JobId, JobRecord, MOCK_BASELINE_ID};

/// Sort key used for jobs that carry no submission time.
const MISSING_SUBMITTED_AT: &str = "0";
const FALLBACK_LABEL_ID_CHARS: usize = 8;

/// The pre-loaded demonstration dataset, offered ahead of real jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBaseline {
    pub assignment_name: String,
}

impl MockBaseline {
    pub fn new(assignment_name: impl Into<String>) -> Self {
        Self {
            assignment_name: assignment_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub job_id: JobId,
    pub label: String,
}

/// Builds the list shown in job pickers: the demo baseline (if any) first,
/// then real jobs newest first by `submitted_at` string order.
pub fn build_selection_list(
    jobs: &BTreeMap<JobId, JobRecord>,
    baseline: Option<&MockBaseline>,
) -> Vec<SelectionEntry> {
    let mut entries = Vec::with_capacity(jobs.len() + 1);

    if let Some(baseline) = baseline {
        entries.push(SelectionEntry {
            job_id: MOCK_BASELINE_ID.to_string(),
            label: format!("[Demo data] {}", baseline.assignment_name),
        });
    }

    let mut real: Vec<(&JobId, &JobRecord)> = jobs
        .iter()
        .filter(|(job_id, _)| !has_synthetic_prefix(job_id))
        .collect();
    // Stable sort keeps ascending id order among equal timestamps.
    real.sort_by(|(_, a), (_, b)| sort_key(b).cmp(sort_key(a)));

    entries.extend(real.into_iter().map(|(job_id, record)| SelectionEntry {
        job_id: job_id.clone(),
        label: selection_label(job_id, record),
    }));
    entries
}

pub fn selection_label(job_id: &str, record: &JobRecord) -> String {
    match record.name.as_deref() {
        Some(name) => name.to_string(),
        None => format!("Task-{}", truncated_id(job_id, FALLBACK_LABEL_ID_CHARS)),
    }
}

fn sort_key(record: &JobRecord) -> &str {
    record
        .submitted_at
        .as_deref()
        .unwrap_or(MISSING_SUBMITTED_AT)
}
