use std::io::{self, BufRead, Write};

use grade_watch_core::CompletionNotice;
use grade_watch_engine::NoticeReceiver;
use tokio::task::JoinHandle;
use watch_logging::watch_warn;

/// Consumes completion notices and shows them on the terminal.
///
/// With `acknowledge` set, each notice blocks until the user presses Enter.
/// The wait runs on the blocking pool so poll loops keep ticking. A notice is
/// only acknowledged to the marker store once it has been shown (and, if
/// required, confirmed); anything still queued at abort is shown next session.
pub struct NoticeSurface {
    handle: JoinHandle<()>,
}

impl NoticeSurface {
    pub fn spawn(mut notices: NoticeReceiver, acknowledge: bool) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                let text = render_notice(&notice);
                if acknowledge {
                    let shown = tokio::task::spawn_blocking(move || show_and_wait(&text)).await;
                    if !matches!(shown, Ok(Ok(()))) {
                        watch_warn!(job = notice.job_id; "could not wait for acknowledgement");
                        continue;
                    }
                } else {
                    println!("{text}");
                }
                notices.acknowledge(&notice);
            }
        });
        Self { handle }
    }

    /// Waits until every queued notice has been shown. Returns once all
    /// notifier handles are dropped.
    pub async fn finish(self) {
        let _ = self.handle.await;
    }

    pub fn abort(self) {
        self.handle.abort();
    }
}

fn show_and_wait(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")?;
    write!(stdout, "Press Enter to continue...")?;
    stdout.flush()?;
    drop(stdout);

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

pub fn render_notice(notice: &CompletionNotice) -> String {
    let body = notice.message();
    let width = body.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let rule = "=".repeat(width);
    format!("{rule}\n{body}\n{rule}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use grade_watch_core::JobRecord;
    use grade_watch_engine::{CompletionMarkerStore, CompletionNotifier, MemoryMarkerStore};

    #[tokio::test]
    async fn shown_notices_are_marked() {
        let store = Arc::new(MemoryMarkerStore::new());
        let (notifier, notices) = CompletionNotifier::channel(store.clone());
        assert!(notifier.notify_if_new("J1", &JobRecord::new(Some("HW1"), None, false)));
        drop(notifier);

        NoticeSurface::spawn(notices, false).finish().await;
        assert!(store.is_marked("J1"));
    }

    #[tokio::test]
    async fn aborted_surface_leaves_queued_notices_unmarked() {
        let store = Arc::new(MemoryMarkerStore::new());
        let (notifier, notices) = CompletionNotifier::channel(store.clone());
        assert!(notifier.notify_if_new("J1", &JobRecord::new(Some("HW1"), None, false)));

        // Current-thread runtime: the surface task has not run yet.
        NoticeSurface::spawn(notices, false).abort();
        tokio::task::yield_now().await;

        assert!(!store.is_marked("J1"));
        assert!(notifier.is_notified("J1"));
    }

    #[test]
    fn notice_is_framed_by_rules() {
        let notice = CompletionNotice::new("J1", &JobRecord::new(Some("HW1"), Some("t1"), false));
        let text = render_notice(&notice);
        let lines: Vec<_> = text.lines().collect();

        assert!(lines.first().unwrap().chars().all(|c| c == '='));
        assert_eq!(lines.first(), lines.last());
        assert!(text.contains("\"HW1\""));
    }
}
