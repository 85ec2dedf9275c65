// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rule configuration and the in-memory rule store

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::action_log::ActionLog;
use crate::rules::Rule;

/// Default rule file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Persisted rule configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RuleConfig {
    /// Rules in insertion order
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::FdtError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, starting with no rules", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Owner of the rule list for the lifetime of the process.
///
/// The store is the only mutator of the rules; persistence happens only on
/// an explicit [`RuleStore::save`].
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
    config: RuleConfig,
}

impl RuleStore {
    /// Create an empty store that saves to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: RuleConfig::default(),
        }
    }

    /// Load the store from `path`.
    ///
    /// An unreadable or malformed file yields an empty rule list and an
    /// action log entry.
    pub fn load(path: PathBuf, log: &ActionLog) -> Self {
        let config = match RuleConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Discarding rules from {:?}: {}", path, e);
                log.record(format!("Error loading config: {}", e));
                RuleConfig::default()
            }
        };

        Self { path, config }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.config.rules
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.config.rules.push(rule);
    }

    /// Remove the rule at `index`. Out-of-range indices leave the list
    /// unchanged.
    pub fn remove_rule(&mut self, index: usize) -> Option<Rule> {
        if index < self.config.rules.len() {
            Some(self.config.rules.remove(index))
        } else {
            None
        }
    }

    /// Persist the current rule list
    pub fn save(&self) -> crate::Result<()> {
        self.config.save(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Operation;
    use tempfile::TempDir;

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::new("/src1", "/dst1", r"\.txt$"),
            Rule::new("/src2", "/dst2", r"\.pdf$"),
            Rule::new("/src3", "/dst3", r"\.png$"),
        ]
    }

    #[test]
    fn test_missing_file_gives_empty_store() {
        let dir = TempDir::new().unwrap();
        let log = ActionLog::new(dir.path().join("logs.txt"));
        let store = RuleStore::load(dir.path().join("config.json"), &log);
        assert!(store.rules().is_empty());
    }

    #[test]
    fn test_malformed_file_gives_empty_store_and_logs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "invalid json that will cause an error").unwrap();
        let log = ActionLog::new(dir.path().join("logs.txt"));

        let store = RuleStore::load(path, &log);

        assert!(store.rules().is_empty());
        assert!(log.read_all().unwrap().contains("Error loading config"));
    }

    #[test]
    fn test_missing_rules_field_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(RuleConfig::load(&path).unwrap().rules.is_empty());
    }

    #[test]
    fn test_remove_rule_by_index() {
        let mut store = RuleStore::new(PathBuf::from("unused.json"));
        for rule in sample_rules() {
            store.add_rule(rule);
        }

        let removed = store.remove_rule(1);

        assert_eq!(removed.map(|r| r.source), Some("/src2".to_string()));
        let sources: Vec<&str> = store.rules().iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["/src1", "/src3"]);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut store = RuleStore::new(PathBuf::from("unused.json"));
        store.add_rule(Rule::new("/src1", "/dst1", "x"));
        let before = store.rules().to_vec();

        assert!(store.remove_rule(1).is_none());
        assert!(store.remove_rule(5).is_none());
        assert!(store.remove_rule(usize::MAX).is_none());
        assert_eq!(store.rules(), before.as_slice());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let log = ActionLog::new(dir.path().join("logs.txt"));

        let mut store = RuleStore::new(path.clone());
        store.add_rule(Rule::new("/a", "/b", r"(\w+)-.*").with_subfolders());
        store.add_rule(Rule::new("/a", "/c", "x").with_operation(Operation::Move));
        store.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"rules\": ["));

        let reloaded = RuleStore::load(path, &log);
        assert_eq!(reloaded.rules(), store.rules());
    }
}
