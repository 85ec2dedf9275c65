// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Filename pattern matching and subfolder name derivation
//!
//! Patterns are unanchored regular expressions tested against the base
//! filename only. When a rule asks for subfolders, the folder name is taken
//! from the match in this order of preference:
//!
//! 1. the first capturing group, if it participated and is non-empty
//! 2. the first run of characters in the full match that contains no `-`
//! 3. the full match text

use regex::Regex;
use std::path::Path;

use crate::Result;

/// A compiled rule pattern
#[derive(Debug, Clone)]
pub struct RulePattern {
    regex: Regex,
}

impl RulePattern {
    /// Compile a pattern, reporting syntax errors as [`crate::FdtError::Pattern`]
    pub fn compile(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Test the pattern against a base filename
    pub fn is_match(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }

    /// Derive a subfolder name from the match, or `None` if the pattern does
    /// not match or the derived name is empty.
    pub fn subfolder_name(&self, filename: &str) -> Option<String> {
        let caps = self.regex.captures(filename)?;
        let full = caps.get(0)?.as_str();

        if let Some(group) = caps.get(1).map(|m| m.as_str()).filter(|g| !g.is_empty()) {
            return Some(group.to_string());
        }

        let name = full
            .split('-')
            .find(|part| !part.is_empty())
            .unwrap_or(full);

        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Strip directory components, leaving the base filename
pub fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
}

/// Test `pattern` against the base name of `filename`
pub fn matches(filename: &str, pattern: &str) -> Result<bool> {
    Ok(RulePattern::compile(pattern)?.is_match(base_name(filename)))
}

/// Derive the subfolder name for `filename` under `pattern`
pub fn extract_group(filename: &str, pattern: &str) -> Result<Option<String>> {
    Ok(RulePattern::compile(pattern)?.subfolder_name(base_name(filename)))
}
