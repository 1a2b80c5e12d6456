// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "fix it", "fix it" },
    single = { "{target}", "demo" },
    embedded = { "fix {count} issue(s) in {target}", "fix 2 issue(s) in demo" },
    unknown_kept = { "{nope}", "{nope}" },
    lone_brace = { "a{b", "a{b" },
    not_a_name = { "{1x} {a-b} {}", "{1x} {a-b} {}" },
    doubled = { "{{target}}", "{demo}" },
)]
fn interpolates_known_names(template: &str, expected: &str) {
    assert_eq!(interpolate(template, &[("target", "demo"), ("count", "2")]), expected);
}

#[test]
fn values_are_not_rescanned() {
    assert_eq!(interpolate("{a}", &[("a", "{b}"), ("b", "x")]), "{b}");
}
