//! Grade-watch engine: status checks, poll loops and completion notices.
mod check;
mod marker;
mod notifier;
mod persist;
mod scheduler;
mod types;

pub use check::{
    normalize_backend_url, parse_status, status_url, CheckSettings, ReqwestStatusChecker,
    StatusChecker, STATUS_PATH,
};
pub use marker::{CompletionMarkerStore, FileMarkerStore, MemoryMarkerStore};
pub use notifier::{CompletionNotifier, NoticeReceiver};
pub use persist::{ensure_state_dir, AtomicFileWriter, PersistError};
pub use scheduler::{PollSettings, PollerScheduler, StartOutcome};
pub use types::{CheckError, EngineEvent, FailureKind, LoopExit, PollStatus};
