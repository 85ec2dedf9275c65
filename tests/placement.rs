// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end placement through the public API

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Duration;
use tempfile::TempDir;

use fdt::watcher::WatchBackend;
use fdt::{
    scan_all, ActionLog, Dispatcher, Operation, Outcome, Rule, RuleStore, WatchCoordinator,
    WatchEvent,
};

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn dir(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    fn log(&self) -> ActionLog {
        ActionLog::new(self.root.path().join("logs.txt"))
    }
}

fn s(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Backend that accepts every directory without an OS watch
struct InertBackend;

impl WatchBackend for InertBackend {
    type Handle = ();

    fn watch(
        &mut self,
        _dir: &Path,
        _source: &str,
        _events: Sender<WatchEvent>,
    ) -> fdt::Result<()> {
        Ok(())
    }
}

#[test]
fn scan_places_files_from_saved_rules() {
    let ws = Workspace::new();
    let inbox = ws.dir("inbox");
    let archive = ws.dir("archive");
    let photos = ws.dir("photos");

    fs::write(inbox.join("acme-invoice-001.pdf"), b"invoice").unwrap();
    fs::write(inbox.join("beach.jpg"), b"jpeg").unwrap();
    fs::write(inbox.join("readme.md"), b"text").unwrap();
    fs::create_dir(inbox.join("nested.pdf")).unwrap();

    let config_path = ws.root.path().join("config.json");
    let mut store = RuleStore::new(config_path.clone());
    let invoices = r"^([a-z]+)-invoice-\d+\.pdf$";
    store.add_rule(Rule::new(s(&inbox), s(&archive), invoices).with_subfolders());
    store.add_rule(Rule::new(s(&inbox), s(&photos), r"\.jpg$").with_operation(Operation::Move));
    store.save().unwrap();

    let log = ws.log();
    let store = RuleStore::load(config_path, &log);
    assert_eq!(store.rules().len(), 2);

    let dispatcher = Dispatcher::new(log.clone());
    let diagnostics = scan_all(&dispatcher, store.rules());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
    assert_eq!(
        fs::read(archive.join("acme").join("acme-invoice-001.pdf")).unwrap(),
        b"invoice"
    );
    assert!(inbox.join("acme-invoice-001.pdf").exists());
    assert_eq!(fs::read(photos.join("beach.jpg")).unwrap(), b"jpeg");
    assert!(!inbox.join("beach.jpg").exists());
    assert!(inbox.join("readme.md").exists());
    assert!(!archive.join("nested.pdf").exists());

    let line = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}  \S").unwrap();
    let content = log.read_all().unwrap();
    assert!(content.lines().all(|l| line.is_match(l)));
    assert!(content.contains("[MOVE "));
    assert!(content.contains("subfolder=acme"));
}

#[test]
fn scan_reports_missing_directory_without_touching_it() {
    let ws = Workspace::new();
    let missing = ws.root.path().join("nowhere");
    let dst = ws.dir("dst");

    let dispatcher = Dispatcher::new(ws.log());
    let diagnostics = scan_all(&dispatcher, &[Rule::new(s(&missing), s(&dst), ".*")]);

    assert_eq!(diagnostics, vec![format!("Directory does not exist: {}", s(&missing))]);
    assert!(!missing.exists());
    assert!(fs::read_dir(&dst).unwrap().next().is_none());
}

#[test]
fn watch_routes_events_to_rules_of_their_directory() {
    let ws = Workspace::new();
    let a = ws.dir("a");
    let b = ws.dir("b");
    let out_a = ws.dir("out-a");
    let out_b = ws.dir("out-b");

    let rules = vec![
        Rule::new(s(&a), s(&out_a), r"\.txt$"),
        Rule::new(s(&a), s(&out_a), r"\.log$"),
        Rule::new(s(&b), s(&out_b), r"\.txt$"),
    ];

    let mut coordinator = WatchCoordinator::with_backend(InertBackend, Dispatcher::new(ws.log()));
    coordinator.watch_files(&rules);
    assert_eq!(coordinator.watched_sources().len(), 2);

    fs::write(b.join("note.txt"), b"b-side").unwrap();
    coordinator
        .sender()
        .send(WatchEvent::Changed {
            source: s(&b),
            path: b.join("note.txt"),
        })
        .unwrap();

    let event = coordinator.next_event(Duration::from_secs(1)).unwrap();
    let outcomes = coordinator.handle_event(event);

    assert_eq!(
        outcomes,
        vec![Outcome::Copied {
            destination: out_b.join("note.txt"),
        }]
    );
    assert!(!out_a.join("note.txt").exists());

    coordinator.unwatch_all();
    coordinator.unwatch_all();
    assert!(!coordinator.is_watching());
}

#[test]
fn rules_added_after_watch_apply_on_next_watch() {
    let ws = Workspace::new();
    let src = ws.dir("src");
    let dst = ws.dir("dst");
    fs::write(src.join("late.csv"), b"1,2").unwrap();

    let mut store = RuleStore::new(ws.root.path().join("config.json"));
    store.add_rule(Rule::new(s(&src), s(&dst), r"\.txt$"));

    let mut coordinator = WatchCoordinator::with_backend(InertBackend, Dispatcher::new(ws.log()));
    coordinator.watch_files(store.rules());
    store.add_rule(Rule::new(s(&src), s(&dst), r"\.csv$"));

    let event = WatchEvent::Changed {
        source: s(&src),
        path: src.join("late.csv"),
    };
    assert_eq!(coordinator.handle_event(event.clone()), vec![Outcome::Skipped]);

    coordinator.watch_files(store.rules());
    let outcomes = coordinator.handle_event(event);
    assert_eq!(outcomes[1], Outcome::Copied { destination: dst.join("late.csv") });
}
