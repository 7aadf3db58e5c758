//! File watcher: builds on startup, then rebuilds from scratch on every change.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};
use tracing::{debug, info};

use crate::commands::{self, OutputFormat};
use crate::config::Config;
use crate::context::BuildSession;
use crate::diagnostics;
use crate::error::Error;

/// Debounce delay between filesystem events and rebuild.
const DEBOUNCE_MS: u64 = 100;

/// Directories a build depends on: the docs tree plus every directory the
/// preprocessor asked to watch (module sources and corpus files).
fn collect_watch_dirs(root: &Path, config: &Config, session: Option<&BuildSession>) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    dirs.insert(root.join(&config.docs));
    for corpus in &config.corpus {
        if let Some(parent) = root.join(corpus).parent() {
            dirs.insert(parent.to_path_buf());
        }
    }
    if let Some(session) = session {
        dirs.extend(session.watched.iter().cloned());
    }
    return dirs;
}

/// Create a filesystem watcher that sends events on the given channel.
/// Events under `output` are ignored so writing results does not retrigger a build.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
    output: PathBuf,
) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
            && event.paths.iter().any(|path| return !path.starts_with(&output))
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Start watching every directory in `dirs` not already in `watched`.
fn watch_new_dirs(watcher: &mut notify::RecommendedWatcher, dirs: &BTreeSet<PathBuf>, watched: &mut BTreeSet<PathBuf>) {
    for dir in dirs {
        if watched.contains(dir) || !dir.exists() {
            continue;
        }
        match watcher.watch(dir, RecursiveMode::Recursive) {
            Ok(()) => {
                debug!("watching {}", dir.display());
                watched.insert(dir.clone());
            },
            Err(e) => debug!("cannot watch {}: {e}", dir.display()),
        }
    }
}

/// Entry point for the watch command.
///
/// Runs an initial build, then watches docs and API sources and rebuilds on
/// changes. Each rebuild reloads both suites and starts with empty scope tables.
///
/// # Errors
///
/// Returns errors from reading the working directory, config loading, or
/// watcher setup. Build failures are printed and watching continues.
pub fn run() -> Result<ExitCode, Error> {
    let root = std::env::current_dir()?;
    let config = Config::load(&root)?;

    info!("watch: initial build");
    let session = run_build(&root);
    let mut last_code = if session.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx, root.join(&config.output))?;
    let mut watched = BTreeSet::new();
    watch_new_dirs(&mut watcher, &collect_watch_dirs(&root, &config, session.as_ref()), &mut watched);

    let dir_count = watched.len();
    eprintln!("watch: monitoring {dir_count} directories, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, rebuilding...");

        let session = run_build(&root);
        last_code = if session.is_some() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(2)
        };
        watch_new_dirs(&mut watcher, &collect_watch_dirs(&root, &config, session.as_ref()), &mut watched);
    }

    return Ok(last_code);
}

/// Run one build and print its summary. Returns the session, or `None` if the
/// build failed.
fn run_build(root: &Path) -> Option<BuildSession> {
    let result = commands::run_build(root).and_then(|(summary, session)| {
        commands::print_summary(&summary, OutputFormat::Text)?;
        return Ok(session);
    });
    return match result {
        Ok(session) => Some(session),
        Err(e) => {
            diagnostics::print_error(&e);
            None
        },
    };
}
