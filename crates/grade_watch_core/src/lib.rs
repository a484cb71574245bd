//! Grade-watch core: job data, demo-job filtering, selection lists and the
//! pure session state machine.
mod effect;
mod filter;
mod job;
mod msg;
mod notice;
mod registry;
mod selection;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use filter::{has_synthetic_prefix, is_marked_mock, is_pollable, select_pollable};
pub use job::{truncated_id, JobId, JobRecord, MOCK_BASELINE_ID, SYNTHETIC_ID_PREFIX};
pub use msg::Msg;
pub use notice::{CompletionNotice, UNKNOWN_TIME, UNTITLED_TASK};
pub use registry::{validate_job_id, JobRegistry, RegistryError};
pub use selection::{build_selection_list, selection_label, MockBaseline, SelectionEntry};
pub use state::{LoopEndReason, LoopGeneration, PollPhase, TickOutcome, WatchState};
pub use update::update;
pub use view_model::{JobRowView, WatchViewModel};
