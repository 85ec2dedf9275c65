// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! One-shot scan of every source directory

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::rules::{group_by_source, Rule, RuleGroup};
use crate::Result;

/// Dispatch every regular file directly inside each rule's source directory.
///
/// Returns only problem messages (missing or unreadable directories).
/// Successful operations go to the action log.
pub fn scan_all(dispatcher: &Dispatcher, rules: &[Rule]) -> Vec<String> {
    let log = dispatcher.log();
    let mut diagnostics = Vec::new();
    log.record("Manual scan started");

    for group in group_by_source(rules) {
        let source = Path::new(&group.source);

        if !source.exists() {
            let message = format!("Directory does not exist: {}", group.source);
            log.record(&message);
            diagnostics.push(message);
            continue;
        }

        if let Err(e) = scan_directory(dispatcher, source, &group) {
            let message = format!("Error scanning directory {}: {}", group.source, e);
            log.record(&message);
            diagnostics.push(message);
        }
    }

    log.record("Manual scan finished");
    diagnostics
}

fn scan_directory(dispatcher: &Dispatcher, source: &Path, group: &RuleGroup) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let path = entry?.path();

        // Subdirectories are not recursed into
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                dispatcher.process_file(&path, &group.rules);
            }
            Ok(_) => debug!("Skipping non-file entry: {:?}", path),
            Err(e) => warn!("Entry vanished during scan {:?}: {}", path, e),
        }
    }

    Ok(())
}
