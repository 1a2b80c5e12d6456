// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness for driving the `af` binary against a scratch state directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Environment variables that would leak the developer's setup into a run
const SCRUBBED_ENV: [&str; 5] = [
    "AUTOFIX_AGENT_PROGRAM",
    "AUTOFIX_DEFAULT_MODEL",
    "AUTOFIX_MAX_CONCURRENT_JOBS",
    "AUTOFIX_LOG",
    "XDG_STATE_HOME",
];

pub fn cli() -> CliBuilder {
    let mut cmd = Command::cargo_bin("af").unwrap();
    cmd.env("NO_COLOR", "1");
    for key in SCRUBBED_ENV {
        cmd.env_remove(key);
    }
    CliBuilder { cmd }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and require exit code 0.
    pub fn passes(self) -> RunAssert {
        self.expect_code(0)
    }

    /// Run and require a non-zero exit code.
    pub fn fails(mut self) -> RunAssert {
        let result = RunAssert::from_output(self.cmd.output().unwrap());
        assert_ne!(result.code, 0, "expected failure\n{}", result.describe());
        result
    }

    pub fn expect_code(mut self, code: i32) -> RunAssert {
        let result = RunAssert::from_output(self.cmd.output().unwrap());
        assert_eq!(result.code, code, "unexpected exit code\n{}", result.describe());
        result
    }
}

pub struct RunAssert {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunAssert {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    fn describe(&self) -> String {
        format!("--- stdout ---\n{}\n--- stderr ---\n{}", self.stdout, self.stderr)
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}\n{}", self.describe());
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout.contains(needle), "stdout has {needle:?}\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}\n{}", self.describe());
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON: {e}\n{}", self.describe()))
    }
}

/// Scratch state directory with reports, config and a work dir for agents.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let project = Self { dir: TempDir::new().unwrap() };
        std::fs::create_dir_all(project.work_dir()).unwrap();
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path().join("state")
    }

    /// Working directory handed to agent processes
    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap_or_default()
    }

    /// Scanner report for one target and type, as `(id, severity)` pairs.
    pub fn report(&self, target: &str, violation_type: &str, pairs: &[(&str, &str)]) {
        let list: Vec<serde_json::Value> = pairs
            .iter()
            .map(|(id, severity)| serde_json::json!({ "id": id, "severity": severity }))
            .collect();
        self.file(
            &format!("state/reports/{target}/{violation_type}.json"),
            &serde_json::Value::Array(list).to_string(),
        );
    }

    /// Config with fast polling and `sh -c <script>` as the agent.
    pub fn agent_script(&self, script: &str) {
        self.file(
            "state/autofix.toml",
            &format!(
                r#"
[automation]
agent_poll_interval_ms = 20
scan_poll_interval_ms = 20

[agent]
program = "sh"
args = ["-c", '{script}']
working_dir = '{}'
"#,
                self.work_dir().display()
            ),
        );
    }

    pub fn af(&self) -> CliBuilder {
        cli().env("AUTOFIX_STATE_DIR", self.state_dir()).env("AUTOFIX_LOG", "warn")
    }
}
