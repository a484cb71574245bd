use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use grade_watch_core::{build_selection_list, update, MockBaseline, Msg, WatchState};
use grade_watch_engine::{
    CompletionMarkerStore, CompletionNotifier, PollerScheduler, ReqwestStatusChecker,
};
use watch_logging::watch_info;

use super::cli::{Cli, Command};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::logging;
use super::persistence::{load_registry, open_marker_store};
use super::ui::notice::NoticeSurface;
use super::ui::render::{render, render_selection};

pub fn run_app() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?.apply_cli(&cli)?;
    logging::initialize(config.log, config.verbose);

    match &cli.command {
        Command::Watch { jobs, .. } => {
            // Poll loops are cooperative tasks on a single thread.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            let result = runtime.block_on(watch(&config, jobs));
            // A pending acknowledgement prompt must not keep the process alive.
            runtime.shutdown_timeout(Duration::from_millis(200));
            result
        }
        Command::List { jobs, demo } => list(jobs, demo.as_deref()),
        Command::Reset => reset(&config),
    }
}

async fn watch(config: &AppConfig, jobs_path: &Path) -> Result<()> {
    config.log_summary();
    let registry = load_registry(jobs_path)?;
    let store = Arc::new(open_marker_store(config)?);
    let checker = ReqwestStatusChecker::new(&config.backend_url, config.check_settings())
        .with_context(|| format!("backend URL {:?}", config.backend_url))?;

    let restored = store.marked_ids();
    let (notifier, notices) = CompletionNotifier::channel(store);
    let scheduler = PollerScheduler::new(config.poll_settings(), Arc::new(checker), notifier);
    let mut runner = EffectRunner::new(scheduler);
    let surface = NoticeSurface::spawn(notices, config.acknowledge_notices());

    let mut state = WatchState::with_registry(registry);
    state = dispatch(state, Msg::MarkersRestored(restored), &mut runner);
    state = dispatch(state, Msg::StartWatching, &mut runner);
    print_if_dirty(&mut state);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while state.active_count() > 0 {
        tokio::select! {
            _ = &mut ctrl_c => {
                watch_info!("Interrupted; stopping poll loops");
                interrupted = true;
                break;
            }
            msg = runner.next_msg() => match msg {
                Some(msg) => state = dispatch(state, msg, &mut runner),
                None => break,
            },
        }
        print_if_dirty(&mut state);
    }

    if !interrupted && state.view().job_count > 0 {
        watch_info!("No jobs left to poll");
    }
    runner.shutdown().await;
    if interrupted {
        surface.abort();
    } else {
        surface.finish().await;
    }
    Ok(())
}

fn dispatch(state: WatchState, msg: Msg, runner: &mut EffectRunner) -> WatchState {
    let (state, effects) = update(state, msg);
    runner.apply(effects);
    state
}

fn print_if_dirty(state: &mut WatchState) {
    if state.consume_dirty() {
        for line in render(&state.view()) {
            println!("{line}");
        }
    }
}

fn list(jobs_path: &Path, demo: Option<&str>) -> Result<()> {
    let registry = load_registry(jobs_path)?;
    let baseline = demo.map(MockBaseline::new);
    let entries = build_selection_list(registry.get_all(), baseline.as_ref());
    for line in render_selection(&entries) {
        println!("{line}");
    }
    Ok(())
}

fn reset(config: &AppConfig) -> Result<()> {
    let store = open_marker_store(config)?;
    let forgotten = store.marked_ids().len();
    store
        .clear()
        .with_context(|| format!("clearing {}", store.path().display()))?;
    watch_info!(
        "Forgot {} completion markers for session {:?}",
        forgotten,
        config.session
    );
    Ok(())
}
