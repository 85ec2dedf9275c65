// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use fdt::pattern::RulePattern;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    pattern: &'a str,
    filename: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    if let Ok(pattern) = RulePattern::compile(input.pattern) {
        let matched = pattern.is_match(input.filename);
        if let Some(name) = pattern.subfolder_name(input.filename) {
            assert!(matched);
            assert!(!name.is_empty());
        }
    }
});
