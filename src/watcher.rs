// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Watch coordination: one directory watch per distinct source directory

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::dispatch::{Dispatcher, Outcome};
use crate::rules::{group_by_source, Rule, RuleGroup};
use crate::Result;

/// Events delivered to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An entry in a watched source directory was created, renamed or removed
    Changed { source: String, path: PathBuf },
    /// Watcher error
    Error(String),
}

/// Something that can open a live, non-recursive watch on a directory.
///
/// The returned handle keeps the watch alive; dropping it closes the watch.
pub trait WatchBackend {
    type Handle;

    fn watch(
        &mut self,
        dir: &Path,
        source: &str,
        events: Sender<WatchEvent>,
    ) -> Result<Self::Handle>;
}

/// Backend using the platform's native notification API
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

impl WatchBackend for NotifyBackend {
    type Handle = RecommendedWatcher;

    fn watch(
        &mut self,
        dir: &Path,
        source: &str,
        events: Sender<WatchEvent>,
    ) -> Result<Self::Handle> {
        let source = source.to_string();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                for event in convert_event(&source, result) {
                    // Receiver gone means the coordinator was dropped
                    let _ = events.send(event);
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

/// Convert notify event to our event type
fn convert_event(source: &str, result: notify::Result<Event>) -> Vec<WatchEvent> {
    let event = match result {
        Ok(event) => event,
        Err(e) => return vec![WatchEvent::Error(e.to_string())],
    };

    match event.kind {
        // Inotify follows the `To` half of a rename with a `Both` summary of
        // the same rename; routing both would dispatch the new name twice
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            event
                .paths
                .into_iter()
                .map(|path| WatchEvent::Changed {
                    source: source.to_string(),
                    path,
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

struct ActiveWatch<H> {
    group: RuleGroup,
    _handle: H,
}

/// Owns every active watch and routes change events to the dispatcher
pub struct WatchCoordinator<B: WatchBackend = NotifyBackend> {
    backend: B,
    dispatcher: Dispatcher,
    watches: Vec<ActiveWatch<B::Handle>>,
    event_tx: Sender<WatchEvent>,
    event_rx: Receiver<WatchEvent>,
}

impl WatchCoordinator<NotifyBackend> {
    /// Create a coordinator using native filesystem notifications
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_backend(NotifyBackend, dispatcher)
    }
}

impl<B: WatchBackend> WatchCoordinator<B> {
    pub fn with_backend(backend: B, dispatcher: Dispatcher) -> Self {
        let (event_tx, event_rx) = channel();
        Self {
            backend,
            dispatcher,
            watches: Vec::new(),
            event_tx,
            event_rx,
        }
    }

    /// Replace all active watches with one watch per distinct source
    /// directory in `rules`.
    ///
    /// Missing directories are logged and skipped; they are only retried on
    /// the next call.
    pub fn watch_files(&mut self, rules: &[Rule]) {
        self.unwatch_all();
        let log = self.dispatcher.log();

        for group in group_by_source(rules) {
            let dir = Path::new(&group.source);

            if !dir.exists() {
                log.record(format!("Directory does not exist: {}", group.source));
                continue;
            }

            match self.backend.watch(dir, &group.source, self.event_tx.clone()) {
                Ok(handle) => {
                    log.record(format!("Watching directory: {}", group.source));
                    self.watches.push(ActiveWatch {
                        group,
                        _handle: handle,
                    });
                }
                Err(e) => {
                    log.record(format!("Error watching directory {}: {}", group.source, e));
                }
            }
        }
    }

    /// Close every active watch. Calling this with nothing watched is a no-op.
    pub fn unwatch_all(&mut self) {
        if !self.watches.is_empty() {
            info!("Stopped watching {} directories", self.watches.len());
            self.watches.clear();
        }

        // Events queued by the closed watches are stale
        while self.event_rx.try_recv().is_ok() {}
    }

    /// Source directories currently watched, in establishment order
    pub fn watched_sources(&self) -> Vec<&str> {
        self.watches.iter().map(|w| w.group.source.as_str()).collect()
    }

    pub fn is_watching(&self) -> bool {
        !self.watches.is_empty()
    }

    /// Sender for injecting events, as a backend would
    pub fn sender(&self) -> Sender<WatchEvent> {
        self.event_tx.clone()
    }

    /// Get the next event (blocking with timeout)
    pub fn next_event(&self, timeout: Duration) -> Option<WatchEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(WatchEvent::Error("Watcher disconnected".to_string()))
            }
        }
    }

    /// Resolve a change event to the full path it refers to, if that path
    /// belongs to a watched directory and still exists.
    pub fn resolve(&self, event: &WatchEvent) -> Option<PathBuf> {
        let (watch, path) = self.locate(event)?;
        let full_path = Path::new(&watch.group.source).join(path.file_name()?);

        // A rename event also fires for deletions
        if full_path.exists() {
            Some(full_path)
        } else {
            debug!("Entry no longer exists: {:?}", full_path);
            None
        }
    }

    /// Route one event to the dispatcher with the rules of its directory
    pub fn handle_event(&self, event: WatchEvent) -> Vec<Outcome> {
        if let WatchEvent::Error(e) = &event {
            warn!("Watch error: {}", e);
            return Vec::new();
        }

        match (self.locate(&event), self.resolve(&event)) {
            (Some((watch, _)), Some(full_path)) => {
                self.dispatcher.process_file(&full_path, &watch.group.rules)
            }
            _ => Vec::new(),
        }
    }

    fn locate<'a>(
        &'a self,
        event: &'a WatchEvent,
    ) -> Option<(&'a ActiveWatch<B::Handle>, &'a Path)> {
        let WatchEvent::Changed { source, path } = event else {
            return None;
        };

        match self.watches.iter().find(|w| &w.group.source == source) {
            Some(watch) => Some((watch, path.as_path())),
            None => {
                debug!("Event for unwatched directory {}: {:?}", source, path);
                None
            }
        }
    }
}

/// Wait for file to be stable (not being written)
pub async fn wait_for_stable(path: &Path, check_interval: Duration, max_wait: Duration) -> bool {
    let start = Instant::now();

    let mut last_size = match std::fs::metadata(path) {
        Ok(m) => m.len(),
        Err(_) => return false,
    };

    loop {
        tokio::time::sleep(check_interval).await;

        // Check if we've exceeded max wait time
        if start.elapsed() > max_wait {
            warn!("File stability check timed out for {:?}", path);
            return true; // Proceed anyway
        }

        // Check if file still exists
        let current_size = match std::fs::metadata(path) {
            Ok(m) => m.len(),
            Err(_) => return false, // File was deleted
        };

        // If size hasn't changed, file is stable
        if current_size == last_size {
            return true;
        }

        last_size = current_size;
        debug!("File {:?} still being written, size: {}", path, current_size);
    }
}
