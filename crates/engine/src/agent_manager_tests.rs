// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use af_adapters::{FakeHistorySink, FakeScript, FakeSpawner};
use af_core::FakeClock;
use tempfile::TempDir;
use yare::parameterized;

struct Harness {
    manager: AgentManager<FakeClock>,
    spawner: FakeSpawner,
    sink: FakeHistorySink,
    _dir: TempDir,
}

fn harness_with(settings: AgentSettings) -> Harness {
    let dir = TempDir::new().unwrap();
    let spawner = FakeSpawner::new();
    let sink = FakeHistorySink::new();
    let manager = AgentManager::new(
        AgentManagerConfig { settings, log_dir: dir.path().to_path_buf() },
        Arc::new(spawner.clone()),
        Arc::new(sink.clone()),
        FakeClock::new(),
    );
    Harness { manager, spawner, sink, _dir: dir }
}

fn harness() -> Harness {
    harness_with(AgentSettings::default())
}

fn config(issues: &[&str]) -> AgentConfig {
    AgentConfig::new("demo", "fix the issues")
        .name("fix-standards-high")
        .violation_type(ViolationType::Standards)
        .issue_ids(issues.iter().map(|s| s.to_string()).collect())
}

/// Budget covers the longest agent timeout exercised here plus the log drain.
async fn wait_terminal(manager: &AgentManager<FakeClock>, id: &AgentId) -> AgentRecord {
    let wait = async {
        loop {
            if let Some(record) = manager.get_agent(id) {
                if record.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    match tokio::time::timeout(Duration::from_secs(60), wait).await {
        Ok(record) => record,
        Err(_) => panic!("agent {id} never finished"),
    }
}

#[parameterized(
    bare_pair = { "x-ai/grok-code-fast-1", "openrouter/x-ai/grok-code-fast-1" },
    namespaced = { "openrouter/x-ai/grok", "openrouter/x-ai/grok" },
    no_slash = { "gpt-5", "gpt-5" },
    trimmed = { " a/b ", "openrouter/a/b" },
)]
fn model_normalization(input: &str, expected: &str) {
    assert_eq!(normalize_model(input, "openrouter"), expected);
}

#[test]
fn empty_namespace_leaves_model_alone() {
    assert_eq!(normalize_model("a/b", ""), "a/b");
}

#[parameterized(
    one = { 1, 35, 720 },
    ten = { 10, 80, 1_800 },
    capped = { 100, 200, 3_600 },
    none = { 0, 30, 600 },
)]
fn limits_scale_with_issue_count(issues: usize, turns: u32, secs: u64) {
    let (max_turns, timeout) = scaled_limits(&AgentSettings::default(), issues);
    assert_eq!(max_turns, turns);
    assert_eq!(timeout, Duration::from_secs(secs));
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let h = harness();
    let err = h.manager.start_agent(AgentConfig::new("demo", "  ")).await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyPrompt));
    assert!(h.spawner.calls().is_empty());
}

#[tokio::test]
async fn start_builds_argv_env_and_log() {
    let h = harness();
    let record = h.manager.start_agent(config(&["s1", "s2"]).model("x-ai/grok")).await.unwrap();

    assert_eq!(record.status, AgentStatus::Running);
    assert_eq!(record.model, "openrouter/x-ai/grok");
    assert!(h.manager.is_active(&record.id));
    assert_eq!(record.log_path, h.manager.agent_log_path(&record.id));

    let call = &h.spawner.calls()[0];
    assert_eq!(call.program, "opencode");
    assert_eq!(call.args, vec!["run", "--model", "openrouter/x-ai/grok", "fix the issues"]);
    let env: HashMap<_, _> = call.env.iter().cloned().collect();
    assert_eq!(env["AUTOFIX_AGENT_ID"], record.id.as_str());
    assert_eq!(env["AUTOFIX_ISSUE_IDS"], "s1,s2");
    assert_eq!(env["AUTOFIX_MAX_TURNS"], "40");

    let log = std::fs::read_to_string(&record.log_path).unwrap();
    assert!(log.starts_with(&format!("# agent {}", record.id)));
}

#[tokio::test]
async fn default_model_is_used_when_unset() {
    let h = harness();
    let record = h.manager.start_agent(config(&["s1"])).await.unwrap();
    assert_eq!(record.model, "openrouter/x-ai/grok-code-fast-1");
}

#[tokio::test]
async fn argument_template_placeholders() {
    let settings = AgentSettings {
        program: "agent".to_string(),
        args: ["--id={agent_id}", "--turns={max_turns}", "{target}"].map(String::from).to_vec(),
        ..AgentSettings::default()
    };
    let h = harness_with(settings);
    let record = h.manager.start_agent(config(&["s1"]).max_turns(7u32)).await.unwrap();
    let call = &h.spawner.calls()[0];
    assert_eq!(call.args, vec![format!("--id={}", record.id), "--turns=7".into(), "demo".into()]);
}

#[tokio::test]
async fn completed_agent_moves_to_history_with_output() {
    let h = harness();
    h.spawner.push(FakeScript::success().stdout(&["working", "done"]).stderr(&["warn: slow"]));
    let record = h.manager.start_agent(config(&["s1"])).await.unwrap();

    let done = wait_terminal(&h.manager, &record.id).await;
    assert_eq!(done.status, AgentStatus::Completed);
    assert_eq!(done.exit_code, Some(0));
    assert!(done.error.is_none());
    assert!(!h.manager.is_active(&record.id));
    assert!(h.manager.list_agents().is_empty());
    assert_eq!(h.manager.agent_history()[0].id, record.id);

    let log = std::fs::read_to_string(&done.log_path).unwrap();
    assert!(log.contains("working\n"));
    assert!(log.contains("done\n"));
    assert!(log.contains("warn: slow\n"));
    assert_eq!(h.sink.completions(), vec![(record.id.clone(), true)]);
}

#[tokio::test]
async fn failed_agent_is_classified_from_log() {
    let h = harness();
    h.spawner.push(FakeScript::exit(1).stdout(&[
        "loading model",
        "ProviderModelNotFoundError modelID=x-ai/grok-code-fast-1",
    ]));
    let record = h.manager.start_agent(config(&["s1"])).await.unwrap();

    let done = wait_terminal(&h.manager, &record.id).await;
    assert_eq!(done.status, AgentStatus::Failed);
    assert_eq!(done.exit_code, Some(1));
    let error = done.error.unwrap();
    assert!(error.starts_with("exited with code 1: model `x-ai/grok-code-fast-1`"), "{error}");
    assert_eq!(h.sink.completions(), vec![(record.id, false)]);
}

#[tokio::test]
async fn stop_agent_kills_and_records_stopped() {
    let h = harness();
    h.spawner.push(FakeScript::hang());
    let record = h.manager.start_agent(config(&["s1"])).await.unwrap();

    let stopping = h.manager.stop_agent(&record.id).unwrap();
    assert_eq!(stopping.status, AgentStatus::Stopping);

    let done = wait_terminal(&h.manager, &record.id).await;
    assert_eq!(done.status, AgentStatus::Stopped);
    assert!(done.error.is_none());
    assert_eq!(h.spawner.kills(), 1);

    // Stopping a finished agent is a no-op
    assert_eq!(h.manager.stop_agent(&record.id).unwrap().status, AgentStatus::Stopped);
}

#[tokio::test]
async fn stop_unknown_agent_is_not_found() {
    let h = harness();
    let err = h.manager.stop_agent(&AgentId::from_string("agt-missing")).unwrap_err();
    assert!(matches!(err, AgentError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn timeout_kills_and_fails() {
    let h = harness();
    h.spawner.push(FakeScript::hang().stderr(&["Error: still thinking"]));
    let record =
        h.manager.start_agent(config(&["s1"]).timeout(Duration::from_secs(5))).await.unwrap();

    let done = wait_terminal(&h.manager, &record.id).await;
    assert_eq!(done.status, AgentStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("timed out after 5s: Error: still thinking"));
    assert_eq!(h.spawner.kills(), 1);
}

#[tokio::test]
async fn spawn_failure_leaves_no_active_record() {
    let h = harness();
    h.spawner.fail_spawns("sandbox full");
    let err = h.manager.start_agent(config(&["s1"])).await.unwrap_err();
    assert!(matches!(err, AgentError::Spawn(_)));
    assert!(h.manager.list_agents().is_empty());
}

#[tokio::test]
async fn history_is_bounded_and_keeps_newest() {
    let h = harness_with(AgentSettings { history_cap: 2, ..AgentSettings::default() });
    let mut ids = Vec::new();
    for _ in 0..3 {
        let record = h.manager.start_agent(config(&["s1"])).await.unwrap();
        wait_terminal(&h.manager, &record.id).await;
        ids.push(record.id);
    }

    let history: Vec<AgentId> = h.manager.agent_history().into_iter().map(|r| r.id).collect();
    assert_eq!(history, vec![ids[2].clone(), ids[1].clone()]);
    assert!(h.manager.get_agent(&ids[0]).is_none());
}

#[tokio::test(start_paused = true)]
async fn watch_keeps_final_record_after_eviction() {
    let h = harness_with(AgentSettings { history_cap: 1, ..AgentSettings::default() });
    h.spawner.push(FakeScript::exit(2).stderr(&["Error: merge conflict"]));
    h.spawner.push(FakeScript::success().run_for(Duration::from_millis(50)));

    let (first, watch) = h.manager.start_agent_watched(config(&["s1"])).await.unwrap();
    assert_eq!(watch.id(), &first.id);
    assert_eq!(watch.outcome(), AgentOutcome::Running);
    let second = h.manager.start_agent(config(&["s2"])).await.unwrap();
    wait_terminal(&h.manager, &second.id).await;

    assert!(h.manager.get_agent(&first.id).is_none());
    match watch.outcome() {
        AgentOutcome::Finished(record) => {
            assert_eq!(record.id, first.id);
            assert_eq!(record.status, AgentStatus::Failed);
            assert_eq!(record.exit_code, Some(2));
        }
        other => panic!("expected a finished record, got {other:?}"),
    }
}

#[tokio::test]
async fn running_agents_report_live_duration() {
    let settings = AgentSettings::default();
    let dir = TempDir::new().unwrap();
    let spawner = FakeSpawner::new();
    spawner.push(FakeScript::hang());
    let clock = FakeClock::new();
    let manager = AgentManager::new(
        AgentManagerConfig { settings, log_dir: dir.path().to_path_buf() },
        Arc::new(spawner),
        Arc::new(FakeHistorySink::new()),
        clock.clone(),
    );
    let record = manager.start_agent(config(&["s1"])).await.unwrap();

    clock.advance(Duration::from_secs(3));
    assert_eq!(manager.get_agent(&record.id).unwrap().duration_ms, 3_000);
    assert_eq!(manager.list_agents()[0].duration_ms, 3_000);
    manager.stop_agent(&record.id).unwrap();
}
