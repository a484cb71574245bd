use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use grade_watch_core::{CompletionNotice, JobId, JobRecord};
use tokio::sync::mpsc;
use watch_logging::{watch_info, watch_warn};

use crate::marker::CompletionMarkerStore;

/// Emits a [`CompletionNotice`] at most once per job id.
///
/// Notices go onto a channel; whoever holds the [`NoticeReceiver`] decides how
/// to show them and calls [`NoticeReceiver::acknowledge`] once the user has
/// seen one. Only then is the marker set, so a notice lost before display is
/// repeated in a later session.
#[derive(Clone)]
pub struct CompletionNotifier {
    store: Arc<dyn CompletionMarkerStore>,
    queued: Arc<Mutex<HashSet<JobId>>>,
    notice_tx: mpsc::UnboundedSender<CompletionNotice>,
}

impl CompletionNotifier {
    pub fn channel(store: Arc<dyn CompletionMarkerStore>) -> (Self, NoticeReceiver) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let receiver = NoticeReceiver {
            notice_rx,
            store: store.clone(),
        };
        let notifier = Self {
            store,
            queued: Arc::default(),
            notice_tx,
        };
        (notifier, receiver)
    }

    /// True once a notice for `job_id` was queued in this process or
    /// acknowledged in any earlier one.
    pub fn is_notified(&self, job_id: &str) -> bool {
        self.store.is_marked(job_id) || self.queued_ids().contains(job_id)
    }

    /// Queues a notice unless one was already emitted for `job_id`.
    /// Returns whether a notice was queued.
    pub fn notify_if_new(&self, job_id: &str, record: &JobRecord) -> bool {
        if self.store.is_marked(job_id) {
            return false;
        }
        let mut queued = self.queued_ids();
        if queued.contains(job_id) {
            return false;
        }

        let notice = CompletionNotice::new(job_id, record);
        if self.notice_tx.send(notice).is_err() {
            // Leave the marker unset so a later session can still tell the user.
            watch_warn!(job = job_id; "notice receiver is gone; completion not delivered");
            return false;
        }
        queued.insert(job_id.to_string());
        watch_info!(job = job_id; "completion notice queued");
        true
    }

    fn queued_ids(&self) -> std::sync::MutexGuard<'_, HashSet<JobId>> {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of a [`CompletionNotifier`].
pub struct NoticeReceiver {
    notice_rx: mpsc::UnboundedReceiver<CompletionNotice>,
    store: Arc<dyn CompletionMarkerStore>,
}

impl NoticeReceiver {
    /// Next queued notice; `None` once every notifier handle is dropped.
    pub async fn recv(&mut self) -> Option<CompletionNotice> {
        self.notice_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CompletionNotice> {
        self.notice_rx.try_recv().ok()
    }

    /// Records that the user has seen `notice`. Returns whether the marker
    /// was stored; a failed write only means one repeat after a reload.
    pub fn acknowledge(&self, notice: &CompletionNotice) -> bool {
        match self.store.mark(&notice.job_id) {
            Ok(()) => {
                watch_info!(job = notice.job_id; "completion acknowledged");
                true
            }
            Err(err) => {
                watch_warn!(job = notice.job_id; "could not persist completion marker: {}", err);
                false
            }
        }
    }
}
