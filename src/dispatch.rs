// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Dispatch of a single file against the rules of its source directory

use std::fs;
use std::path::{Path, PathBuf};

use crate::action_log::ActionLog;
use crate::pattern::RulePattern;
use crate::rules::{Operation, Rule};
use crate::{FdtError, Result};

/// Result of applying one rule to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The filename did not match the rule's pattern
    Skipped,
    /// The file was copied to `destination`
    Copied { destination: PathBuf },
    /// The file was copied to `destination` and the source removed
    Moved { destination: PathBuf },
    /// Dry run: the operation that would have been performed
    DryRun {
        operation: Operation,
        destination: PathBuf,
    },
    /// The rule failed for this file; the message was logged
    Failed(String),
}

impl Outcome {
    /// Whether the rule matched the file, regardless of what happened next
    pub fn is_match(&self) -> bool {
        !matches!(self, Outcome::Skipped)
    }
}

/// Applies rules to files, performing copies and moves
#[derive(Debug, Clone)]
pub struct Dispatcher {
    log: ActionLog,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(log: ActionLog) -> Self {
        Self {
            log,
            dry_run: false,
        }
    }

    /// In dry-run mode destinations are computed and logged, but nothing
    /// on disk is created, copied or deleted.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    /// Evaluate every rule, in order, against the file at `path`.
    ///
    /// Each matching rule acts on the file independently. A failing rule is
    /// logged and never stops the rules after it.
    pub fn process_file(&self, path: &Path, rules: &[Rule]) -> Vec<Outcome> {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => {
                self.log
                    .record(format!("Cannot process {:?}: no usable file name", path));
                return Vec::new();
            }
        };

        rules
            .iter()
            .map(|rule| match self.apply_rule(path, file_name, rule) {
                Ok(outcome) => outcome,
                Err(e) => {
                    let message = match &e {
                        FdtError::Pattern(_) => {
                            format!("Invalid pattern '{}': {}", rule.pattern, e)
                        }
                        _ => format!(
                            "Error processing '{}' (pattern='{}'): {}",
                            path.display(),
                            rule.pattern,
                            e
                        ),
                    };
                    self.log.record(&message);
                    Outcome::Failed(message)
                }
            })
            .collect()
    }

    fn apply_rule(&self, path: &Path, file_name: &str, rule: &Rule) -> Result<Outcome> {
        let pattern = RulePattern::compile(&rule.pattern)?;

        if !pattern.is_match(file_name) {
            self.log.record(format!(
                "(skipped) '{}' does not match pattern '{}'",
                file_name, rule.pattern
            ));
            return Ok(Outcome::Skipped);
        }

        let mut dest_base = PathBuf::from(&rule.destination);
        let mut subfolder = None;

        if rule.create_subfolders {
            if let Some(name) = pattern.subfolder_name(file_name) {
                let subfolder_path = dest_base.join(&name);
                if !subfolder_path.exists() {
                    if self.dry_run {
                        self.log.record(format!(
                            "[DRY RUN] Would create subfolder: {}",
                            subfolder_path.display()
                        ));
                    } else {
                        fs::create_dir_all(&subfolder_path)?;
                        self.log.record(format!(
                            "Created subfolder: {}",
                            subfolder_path.display()
                        ));
                    }
                }
                dest_base = subfolder_path;
                subfolder = Some(name);
            }
        }

        let destination = dest_base.join(file_name);

        if is_same_file(path, &destination) {
            return Err(FdtError::Dispatch(format!(
                "destination {} is the source file itself",
                destination.display()
            )));
        }

        let summary = format!(
            "[{} {} -> {}] '{}' (pattern='{}'{})",
            rule.operation,
            rule.source,
            dest_base.display(),
            file_name,
            rule.pattern,
            subfolder
                .map(|s| format!(", subfolder={}", s))
                .unwrap_or_default()
        );

        if self.dry_run {
            self.log.record(format!("[DRY RUN] {}", summary));
            return Ok(Outcome::DryRun {
                operation: rule.operation,
                destination,
            });
        }

        // The source is only deleted after the copy has fully succeeded
        fs::copy(path, &destination)?;

        match rule.operation {
            Operation::Copy => {
                self.log.record(summary);
                Ok(Outcome::Copied { destination })
            }
            Operation::Move => {
                fs::remove_file(path)?;
                self.log.record(summary);
                Ok(Outcome::Moved { destination })
            }
        }
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
