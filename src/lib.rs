// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! fdt: File Directory Transfer
//!
//! Watches source directories and copies or moves every file whose name
//! matches a rule's regular expression into the rule's destination,
//! optionally sorted into subfolders named after the match.

pub mod action_log;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pattern;
pub mod rules;
pub mod scanner;
pub mod watcher;

pub use action_log::ActionLog;
pub use config::{RuleConfig, RuleStore};
pub use dispatch::{Dispatcher, Outcome};
pub use error::{FdtError, Result};
pub use rules::{Operation, Rule};
pub use scanner::scan_all;
pub use watcher::{WatchCoordinator, WatchEvent};
