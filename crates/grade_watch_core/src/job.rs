use serde::{Deserialize, Serialize};

pub type JobId = String;

/// Id prefix reserved for locally fabricated demo jobs.
pub const SYNTHETIC_ID_PREFIX: &str = "MOCK_JOB_";

/// Id under which the demo dataset appears in selection lists.
pub const MOCK_BASELINE_ID: &str = "MOCK_JOB_001";

/// Metadata the submission flow records for a grading job.
///
/// The remote status is never stored here; it is fetched on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub is_mock: bool,
}

impl JobRecord {
    pub fn new(name: Option<&str>, submitted_at: Option<&str>, is_mock: bool) -> Self {
        Self {
            name: name.map(str::to_string),
            submitted_at: submitted_at.map(str::to_string),
            is_mock,
        }
        .normalized()
    }

    pub fn mock() -> Self {
        Self {
            is_mock: true,
            ..Self::default()
        }
    }

    /// Blank optional fields count as missing.
    pub(crate) fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
            submitted_at: non_blank(self.submitted_at),
            is_mock: self.is_mock,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// First `max_chars` characters of a job id, never splitting a code point.
pub fn truncated_id(job_id: &str, max_chars: usize) -> &str {
    match job_id.char_indices().nth(max_chars) {
        Some((idx, _)) => &job_id[..idx],
        None => job_id,
    }
}
