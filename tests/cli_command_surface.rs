use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fusion"))
        .args(args)
        .env("HOME", home)
        .output()
        .expect("run fusion")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_ok(output: &Output) {
    assert!(
        output.status.success(),
        "stdout:\n{}\nstderr:\n{}",
        stdout(output),
        stderr(output)
    );
}

fn assert_err_contains(output: &Output, needle: &str) {
    assert!(
        !output.status.success(),
        "expected failure, stdout:\n{}\nstderr:\n{}",
        stdout(output),
        stderr(output)
    );
    let combined = format!("{}{}", stdout(output), stderr(output));
    assert!(
        combined.contains(needle),
        "expected `{needle}` in output:\n{combined}"
    );
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind")
        .local_addr()
        .expect("addr")
        .port()
}

fn write_graph(dir: &Path, sentry_secret: &str) -> String {
    let path = dir.join("graph.yaml");
    fs::write(
        &path,
        format!(
            r#"
composites: [c1]
services:
  - id: cache
    kind: redis
    secret: redis://x
  - id: errors
    kind: sentry
    secret: "{sentry_secret}"
  - id: extra
    kind: supabase
    secret: key
edges:
  - from: c1
    to: cache
  - from: c1
    to: errors
  - from: c1
    to: extra
"#
        ),
    )
    .expect("write graph");
    path.display().to_string()
}

#[test]
fn help_lists_every_command() {
    let dir = tempdir().expect("tempdir");
    let output = run(dir.path(), &["help"]);
    assert_ok(&output);
    let text = stdout(&output);
    for command in ["serve", "start", "stop", "status", "launch", "validate", "chat"] {
        assert!(text.contains(command), "missing {command} in help");
    }

    let bare = run(dir.path(), &[]);
    assert_ok(&bare);
    assert!(stdout(&bare).starts_with("Usage: fusion"));
}

#[test]
fn unknown_command_and_missing_args_fail() {
    let dir = tempdir().expect("tempdir");
    assert_err_contains(&run(dir.path(), &["restart"]), "unknown command `restart`");
    assert_err_contains(&run(dir.path(), &["stop"]), "missing required argument <server-id>");
    assert_err_contains(&run(dir.path(), &["status", ""]), "invalid server id");
}

#[test]
fn validate_reports_flags_without_secrets() {
    let dir = tempdir().expect("tempdir");
    let graph = write_graph(dir.path(), "sentry-token");

    let output = run(dir.path(), &["validate", &graph, "c1"]);
    assert_ok(&output);
    let text = stdout(&output);
    assert!(text.contains("valid"));
    assert!(text.contains("services=3"));
    assert!(text.contains("flag=--REDIS_URL"));
    assert!(text.contains("flag=--SENTRY_AUTH_TOKEN"));
    assert!(text.contains("unknown_kind=supabase"));
    assert!(!text.contains("redis://x"));
    assert!(!text.contains("sentry-token"));
}

#[test]
fn validate_rejects_incomplete_configuration() {
    let dir = tempdir().expect("tempdir");
    let graph = write_graph(dir.path(), "");

    let output = run(dir.path(), &["validate", &graph, "c1"]);
    assert_err_contains(&output, "incomplete configuration");
    assert_err_contains(&output, "errors");
}

#[test]
fn client_commands_report_unreachable_endpoint() {
    let dir = tempdir().expect("tempdir");
    let endpoint = format!("http://127.0.0.1:{}/api/server", free_port());

    let output = run(dir.path(), &["--endpoint", &endpoint, "status", "c1"]);
    assert_err_contains(&output, "control endpoint request failed");
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("bad.yaml");
    fs::write(&config, "ports: { start: 9000, end: 8000 }\n").expect("write config");

    let output = run(
        dir.path(),
        &["--config", &config.display().to_string(), "status", "c1"],
    );
    assert_err_contains(&output, "settings validation failed");
}

#[cfg(unix)]
struct ServeGuard(Child);

#[cfg(unix)]
impl Drop for ServeGuard {
    fn drop(&mut self) {
        let _ = Command::new("kill")
            .arg("-INT")
            .arg(self.0.id().to_string())
            .status();
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.0.try_wait() {
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[cfg(unix)]
#[test]
fn serve_start_status_stop_round_trip() {
    let home = tempdir().expect("tempdir");
    let port = free_port();
    let state_dir = home.path().join(".fusion");
    fs::create_dir_all(&state_dir).expect("state dir");
    fs::write(
        state_dir.join("config.yaml"),
        format!(
            r#"
listen: 127.0.0.1:{port}
companion:
  working_dir: {home}
  program: /bin/sh
  args: ["-c", "exec sleep 30", "companion"]
readiness:
  mode: fixed_delay
  delay_ms: 0
"#,
            home = home.path().display()
        ),
    )
    .expect("write config");

    let child = Command::new(env!("CARGO_BIN_EXE_fusion"))
        .arg("serve")
        .env("HOME", home.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn serve");
    let _guard = ServeGuard(child);

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut status = run(home.path(), &["status", "c1"]);
    while !status.status.success() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
        status = run(home.path(), &["status", "c1"]);
    }
    assert_ok(&status);
    assert!(stdout(&status).contains("running=false"));

    let started = run(home.path(), &["start", "c1", "--service", "redis=redis://x"]);
    assert_ok(&started);
    assert!(stdout(&started).contains("url=http://localhost:"));

    let status = run(home.path(), &["status", "c1"]);
    assert_ok(&status);
    assert!(stdout(&status).contains("running=true"));

    let stopped = run(home.path(), &["stop", "c1"]);
    assert_ok(&stopped);
    assert!(stdout(&stopped).contains("success=true"));

    let status = run(home.path(), &["status", "c1"]);
    assert!(stdout(&status).contains("running=false"));

    let log = fs::read_to_string(state_dir.join("logs/runtime.log")).expect("runtime log");
    assert!(log.contains("control.listening"));
    assert!(log.contains("--REDIS_URL=redis://x"));
}
