// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Placement rules and grouping by source directory

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with a matched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Copy the file, leaving the source untouched
    #[default]
    Copy,
    /// Copy the file, then delete the source once the copy succeeded
    Move,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Copy => write!(f, "COPY"),
            Operation::Move => write!(f, "MOVE"),
        }
    }
}

/// A single placement rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Directory to watch and scan
    pub source: String,

    /// Directory matched files are placed into
    pub destination: String,

    /// Regular expression tested against the base filename
    pub pattern: String,

    /// Place files into a subfolder derived from the match
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub create_subfolders: bool,

    /// Copy or move matched files
    #[serde(default, skip_serializing_if = "is_copy")]
    pub operation: Operation,
}

fn is_copy(op: &Operation) -> bool {
    *op == Operation::Copy
}

impl Rule {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            pattern: pattern.into(),
            create_subfolders: false,
            operation: Operation::Copy,
        }
    }

    pub fn with_subfolders(mut self) -> Self {
        self.create_subfolders = true;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }
}

/// Rules sharing one source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroup {
    pub source: String,
    pub rules: Vec<Rule>,
}

/// Group rules by their `source` field.
///
/// Groups come out in first-appearance order of each source directory, and
/// rules keep their relative order inside a group.
pub fn group_by_source(rules: &[Rule]) -> Vec<RuleGroup> {
    let mut groups: Vec<RuleGroup> = Vec::new();

    for rule in rules {
        match groups.iter_mut().find(|g| g.source == rule.source) {
            Some(group) => group.rules.push(rule.clone()),
            None => groups.push(RuleGroup {
                source: rule.source.clone(),
                rules: vec![rule.clone()],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_source_keeps_first_appearance_order() {
        let rules = vec![
            Rule::new("/b", "/d1", "a"),
            Rule::new("/a", "/d2", "b"),
            Rule::new("/b", "/d3", "c"),
        ];

        let groups = group_by_source(&rules);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source, "/b");
        assert_eq!(groups[0].rules.len(), 2);
        assert_eq!(groups[0].rules[1].destination, "/d3");
        assert_eq!(groups[1].source, "/a");
    }

    #[test]
    fn test_group_by_source_empty() {
        assert!(group_by_source(&[]).is_empty());
    }

    #[test]
    fn test_rule_defaults_when_fields_absent() {
        let rule: Rule = serde_json::from_str(
            r#"{"source":"/src","destination":"/dst","pattern":"\\.jpg$"}"#,
        )
        .unwrap();

        assert!(!rule.create_subfolders);
        assert_eq!(rule.operation, Operation::Copy);
    }

    #[test]
    fn test_rule_camel_case_fields() {
        let rule: Rule = serde_json::from_str(
            r#"{"source":"/s","destination":"/d","pattern":"x",
                "createSubfolders":true,"operation":"move"}"#,
        )
        .unwrap();

        assert!(rule.create_subfolders);
        assert_eq!(rule.operation, Operation::Move);

        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"createSubfolders\":true"));
        assert!(json.contains("\"operation\":\"move\""));
    }

    #[test]
    fn test_default_fields_omitted_on_save() {
        let json = serde_json::to_string(&Rule::new("/s", "/d", "x")).unwrap();
        assert!(!json.contains("createSubfolders"));
        assert!(!json.contains("operation"));
    }
}
