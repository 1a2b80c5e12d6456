// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::TempDir;

const OVERRIDES: [&str; 3] =
    ["AUTOFIX_AGENT_PROGRAM", "AUTOFIX_DEFAULT_MODEL", "AUTOFIX_MAX_CONCURRENT_JOBS"];

fn clear_overrides() {
    for key in OVERRIDES {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let config = Config::load(None, dir.path()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.reports_dir(dir.path()), dir.path().join("reports"));
}

#[test]
#[serial]
fn state_dir_file_is_picked_up() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"
[automation]
max_concurrent_jobs = 3
per_loop_cap = 5

[agent]
program = "fixer"
args = ["--model", "{model}", "{prompt}"]

[violations]
reports_dir = "/srv/reports"

[scan]
command = ["scanner", "{target}", "{type}"]
"#,
    )
    .unwrap();

    let config = Config::load(None, dir.path()).unwrap();
    assert_eq!(config.automation.max_concurrent_jobs, 3);
    assert_eq!(config.automation.per_loop_cap, 5);
    assert_eq!(config.automation.agent_capacity, AutomationSettings::default().agent_capacity);
    assert_eq!(config.agent.program, "fixer");
    assert_eq!(config.agent.default_model, AgentSettings::default().default_model);
    assert_eq!(config.reports_dir(dir.path()), PathBuf::from("/srv/reports"));
    assert_eq!(config.scan.command, vec!["scanner", "{target}", "{type}"]);
}

#[test]
#[serial]
fn explicit_path_must_exist() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
#[serial]
fn invalid_toml_names_the_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[automation]\nmax_concurrent_jobs = \"many\"\n").unwrap();

    let err = Config::load(Some(&path), dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("bad.toml"));
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "[agent]\nprogram = \"fixer\"\n").unwrap();
    std::env::set_var("AUTOFIX_AGENT_PROGRAM", "other-fixer");
    std::env::set_var("AUTOFIX_DEFAULT_MODEL", "anthropic/claude-sonnet");
    std::env::set_var("AUTOFIX_MAX_CONCURRENT_JOBS", "4");

    let config = Config::load(None, dir.path()).unwrap();
    clear_overrides();

    assert_eq!(config.agent.program, "other-fixer");
    assert_eq!(config.agent.default_model, "anthropic/claude-sonnet");
    assert_eq!(config.automation.max_concurrent_jobs, 4);
}

#[test]
#[serial]
fn unusable_job_limit_override_is_ignored() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    for value in ["0", "-2", "lots"] {
        std::env::set_var("AUTOFIX_MAX_CONCURRENT_JOBS", value);
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.automation.max_concurrent_jobs, 1, "value {value:?}");
    }
    clear_overrides();
}
