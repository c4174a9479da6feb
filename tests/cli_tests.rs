mod common;

use common::*;
use std::io::Write;
use std::process::{Command, Stdio};

fn cli_command(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_agentflow"));
    // Keeps a stray ./engine.yaml out of the run
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_cli_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run node-based workflow graphs"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("nodes"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_cli_version() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agentflow"));
}

#[test]
fn test_cli_run_help() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["run", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run a job file, or every job in a directory"));
    assert!(stdout.contains("--trigger-data"));
    assert!(stdout.contains("--events"));
}

#[test]
fn test_cli_nodes() {
    let dir = create_test_dir();
    let output = cli_command(dir.path()).arg("nodes").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in [
        "manualTrigger",
        "webhookTrigger",
        "httpRequest",
        "shellCommand",
        "setData",
        "aiAgent",
        "openAiChatModel",
        "httpRequestTool",
    ] {
        assert!(stdout.contains(name), "missing {}: {}", name, stdout);
    }
}

#[test]
fn test_cli_run_single_job() {
    let dir = create_test_dir();
    write_job(dir.path(), "hello.yaml", &simple_job("hello"));

    let output = cli_command(dir.path())
        .args(["run", "hello.yaml"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ hello"));
    assert!(stdout.contains("\"message\": \"hello\""));
}

#[test]
fn test_cli_run_directory() {
    let dir = create_test_dir();
    write_job(dir.path(), "a.yaml", &simple_job("job-a"));
    write_job(dir.path(), "b.yaml", &simple_job("job-b"));

    let output = cli_command(dir.path())
        .args(["run", "."])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ job-a"));
    assert!(stdout.contains("✓ job-b"));
}

#[test]
fn test_cli_run_with_events() {
    let dir = create_test_dir();
    write_job(dir.path(), "hello.yaml", &simple_job("hello"));

    let output = cli_command(dir.path())
        .args(["run", "hello.yaml", "--events"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("event line is JSON"))
        .collect();

    // start and greet each report executing and success, then the run ends
    assert_eq!(events.len(), 5);
    assert_eq!(events[0]["nodeId"], "start");
    assert_eq!(events[0]["nodeStatus"], "executing");
    let last = events.last().unwrap();
    assert_eq!(last["status"], "Success");
    assert!(last.get("nodeId").is_none());
    assert_eq!(last["json"]["greet"]["json"]["message"], "hello");

    // The summary moves to stderr so stdout stays parseable
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("✓ hello"));
}

#[test]
fn test_cli_run_trigger_data() {
    let dir = create_test_dir();
    write_job(
        dir.path(),
        "echo.yaml",
        r#"
workflowId: echo
nodes:
  - { id: hook, kind: trigger, name: webhookTrigger }
  - id: reply
    kind: action
    name: setData
    parameters:
      values:
        name: "{{ hook.json.body.name }}"
edges:
  - { id: e1, source: hook, target: reply }
"#,
    );

    let output = cli_command(dir.path())
        .args(["run", "echo.yaml", "-t", r#"{"name": "Ada"}"#])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"name\": \"Ada\""));
}

#[test]
fn test_cli_run_failing_job() {
    let dir = create_test_dir();
    write_job(dir.path(), "boom.yaml", &failing_job("boom"));

    let output = cli_command(dir.path())
        .args(["run", "boom.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("✗ boom"));
}

#[test]
fn test_cli_run_missing_path() {
    let dir = create_test_dir();
    let output = cli_command(dir.path())
        .args(["run", "nope.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_run_bad_trigger_data() {
    let dir = create_test_dir();
    write_job(dir.path(), "hello.yaml", &simple_job("hello"));

    let output = cli_command(dir.path())
        .args(["run", "hello.yaml", "-t", "{not json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_validate() {
    let dir = create_test_dir();
    write_job(dir.path(), "ok.yaml", &simple_job("ok"));

    let output = cli_command(dir.path())
        .args(["validate", "ok.yaml"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ ok"));
}

#[test]
fn test_cli_validate_reports_issues() {
    let dir = create_test_dir();
    write_job(dir.path(), "bad.yaml", &triggerless_job("bad"));

    let output = cli_command(dir.path())
        .args(["validate", "bad.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✗ bad"));
    assert!(stdout.contains("error:"));
}

#[test]
fn test_cli_config_credentials() {
    let dir = create_test_dir();
    std::fs::write(
        dir.path().join("engine.yaml"),
        "workers: 1\ncredentials:\n  local:\n    token: abc\n",
    )
    .unwrap();
    write_job(dir.path(), "hello.yaml", &simple_job("hello"));

    let output = cli_command(dir.path())
        .args(["run", "hello.yaml"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = cli_command(dir.path())
        .args(["--config", "missing.yaml", "run", "hello.yaml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_serve_reads_stdin() {
    let dir = create_test_dir();
    let mut child = cli_command(dir.path())
        .args(["serve", "--workers", "2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let stdin = child.stdin.as_mut().unwrap();
        for n in 0..3 {
            let job = serde_json::json!({
                "workflowId": format!("wf-{}", n),
                "executionId": format!("exec-{}", n),
                "nodes": [
                    { "id": "t", "kind": "trigger", "name": "manualTrigger" },
                    { "id": "a", "kind": "action", "name": "setData",
                      "parameters": { "values": { "n": n } } }
                ],
                "edges": [ { "id": "e", "source": "t", "target": "a" } ]
            });
            writeln!(stdin, "{}", job).unwrap();
        }
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let terminal: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|event| event.get("nodeId").is_none())
        .collect();
    assert_eq!(terminal.len(), 3);
    assert!(terminal.iter().all(|e| e["status"] == "Success"));
}

#[test]
fn test_cli_serve_rejects_malformed_lines() {
    let dir = create_test_dir();
    let mut child = cli_command(dir.path())
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"this is not a job\n")
        .unwrap();
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}
