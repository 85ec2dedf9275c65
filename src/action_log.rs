// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Append-only action log of matches, skips, operations and errors

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// Timestamp layout used for every entry
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format one log line (without the trailing newline)
pub fn format_entry(timestamp: DateTime<Utc>, message: &str) -> String {
    format!("{}  {}", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// Action log backed by a UTF-8 text file, one entry per line
#[derive(Debug, Clone)]
pub struct ActionLog {
    path: PathBuf,
}

impl ActionLog {
    /// Create an action log writing to `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append a timestamped entry and return the formatted line.
    ///
    /// A write failure goes to the tracing error channel and is never
    /// returned, so logging cannot abort a dispatch.
    pub fn record(&self, message: impl AsRef<str>) -> String {
        let line = format_entry(Utc::now(), message.as_ref());
        tracing::info!("{}", message.as_ref());

        if let Err(e) = self.append(&line) {
            tracing::error!("Failed to write action log {:?}: {}", self.path, e);
        }

        line
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read the accumulated log text. A log that was never written is empty.
    pub fn read_all(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the most recent `count` lines, oldest first
    pub fn tail(&self, count: usize) -> Result<Vec<String>> {
        let content = self.read_all()?;
        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(count);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }

    /// Get log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
