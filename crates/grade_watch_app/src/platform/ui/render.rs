use chrono::Local;
use grade_watch_core::{JobRowView, PollPhase, SelectionEntry, WatchViewModel};

pub fn render(view: &WatchViewModel) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.jobs.len() + 1);
    lines.push(format!(
        "[{}] {} | jobs: {} | polling: {} | completed: {}",
        Local::now().format("%H:%M:%S"),
        if view.watching { "Watching" } else { "Idle" },
        view.job_count,
        view.active_count,
        view.completed_count
    ));
    lines.extend(view.jobs.iter().map(render_row));
    lines
}

fn render_row(row: &JobRowView) -> String {
    let mut line = format!(
        "  {:<10} {:<24} {:<20} {}",
        phase_label(row.phase),
        row.label,
        row.submitted_at.as_deref().unwrap_or("-"),
        row.job_id
    );
    if row.ticks > 0 {
        line.push_str(&format!("  checks: {}", row.ticks));
    }
    if row.failures > 0 {
        line.push_str(&format!(" (failed: {})", row.failures));
    }
    line
}

fn phase_label(phase: PollPhase) -> &'static str {
    match phase {
        PollPhase::Waiting => "waiting",
        PollPhase::Polling => "polling",
        PollPhase::Completed => "completed",
        PollPhase::Stopped => "stopped",
        PollPhase::Expired => "expired",
        PollPhase::Demo => "demo",
    }
}

pub fn render_selection(entries: &[SelectionEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| format!("{}\t{}", entry.job_id, entry.label))
        .collect()
}
