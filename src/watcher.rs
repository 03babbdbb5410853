//! File-system watching — keeps the model in sync with on-disk edits.
//!
//! Debounced change notifications are classified per path: a C# file that
//! still exists is reparsed, a vanished one has its contribution dropped.
//! The handler runs on the watcher's own thread and only forwards commands;
//! all model mutation stays with the single-writer service.

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind, Debouncer};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::parser;
use crate::service::ModelService;
use crate::workspace::scan;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

/// Watch a workspace root and forward source-file changes to the service.
pub fn start(root: &Path, service: ModelService) -> Result<FileWatcher> {
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            for event in events {
                // AnyContinuous means writes are still arriving; the final
                // Any event for the path will follow.
                if event.kind != DebouncedEventKind::Any {
                    continue;
                }
                let path = event.path;
                if !parser::is_source_file(&path) || scan::in_build_output(&path) {
                    continue;
                }
                if path.exists() {
                    service.blocking_file_changed(path);
                } else {
                    service.blocking_file_removed(path);
                }
            }
        }
        Err(err) => warn!(?err, "watch notification error"),
    })
    .map_err(|e| ModelError::Watch(e.to_string()))?;

    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| ModelError::Watch(e.to_string()))?;
    info!(root = %root.display(), "watching for source changes");

    Ok(FileWatcher {
        _debouncer: debouncer,
    })
}
