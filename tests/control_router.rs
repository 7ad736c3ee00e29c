#![cfg(unix)]

use fusion::config::{CompanionSettings, PortRange};
use fusion::control::{ControlRequest, RequestRouter};
use fusion::runtime::{
    ProcessSupervisor, Readiness, RuntimeLog, SupervisorConfig, DEFAULT_KILL_PROGRAM,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn router(dir: &Path, program: &str) -> RequestRouter {
    let config = SupervisorConfig {
        companion: CompanionSettings {
            working_dir: dir.to_path_buf(),
            program: program.to_string(),
            args: vec![
                "-c".to_string(),
                "exec sleep 30".to_string(),
                "companion".to_string(),
            ],
            env: Default::default(),
        },
        ports: PortRange {
            start: 8000,
            end: 9000,
        },
        host: "localhost".to_string(),
        readiness: Readiness::immediate(),
        kill_program: DEFAULT_KILL_PROGRAM.to_string(),
    };
    let supervisor = ProcessSupervisor::new(config, RuntimeLog::at(dir.join("runtime.log")));
    RequestRouter::new(Arc::new(supervisor))
}

fn post(router: &RequestRouter, body: Value) -> (u16, Value) {
    let reply = router.handle_body(body.to_string().as_bytes());
    (reply.status, reply.body)
}

#[test]
fn unknown_action_is_a_bad_request() {
    let dir = tempdir().expect("tempdir");
    let router = router(dir.path(), "/bin/sh");

    let (status, body) = post(&router, json!({"action": "restart", "serverId": "c1"}));
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "Invalid action"}));
}

#[test]
fn malformed_bodies_and_missing_ids_are_bad_requests() {
    let dir = tempdir().expect("tempdir");
    let router = router(dir.path(), "/bin/sh");

    let reply = router.handle_body(b"{not json");
    assert_eq!(reply.status, 400);
    assert!(reply.body["error"].is_string());

    let (status, _) = post(&router, json!({"action": "status"}));
    assert_eq!(status, 400);

    let (status, body) = post(&router, json!({"action": "status", "serverId": ""}));
    assert_eq!(status, 400);
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("server id"));
}

#[test]
fn free_form_server_ids_are_accepted() {
    let dir = tempdir().expect("tempdir");
    let router = router(dir.path(), "/bin/sh");

    let (status, body) = post(&router, json!({"action": "status", "serverId": "My Server"}));
    assert_eq!(status, 200);
    assert_eq!(body, json!({"running": false, "url": null}));

    let (status, body) = post(&router, json!({"action": "stop", "serverId": "srv/1"}));
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": false}));

    let (status, body) = post(&router, json!({"action": "start", "serverId": "../c 1"}));
    assert_eq!(status, 200);
    assert!(body["url"].as_str().expect("url").starts_with("http://localhost:"));
    let (_, running) = post(&router, json!({"action": "status", "serverId": "../c 1"}));
    assert_eq!(running["running"], json!(true));
    let (_, stopped) = post(&router, json!({"action": "stop", "serverId": "../c 1"}));
    assert_eq!(stopped, json!({"success": true}));
}

#[test]
fn unknown_server_reports_not_running_and_unsuccessful_stop() {
    let dir = tempdir().expect("tempdir");
    let router = router(dir.path(), "/bin/sh");

    let (status, body) = post(&router, json!({"action": "status", "serverId": "c9"}));
    assert_eq!(status, 200);
    assert_eq!(body, json!({"running": false, "url": null}));

    let (status, body) = post(&router, json!({"action": "stop", "serverId": "c9"}));
    assert_eq!(status, 200);
    assert_eq!(body, json!({"success": false}));
}

#[test]
fn start_status_stop_round_through_the_supervisor() {
    let dir = tempdir().expect("tempdir");
    let router = router(dir.path(), "/bin/sh");

    let (status, started) = post(
        &router,
        json!({
            "action": "start",
            "serverId": "c1",
            "services": [{"name": "redis", "config": "redis://x"}],
        }),
    );
    assert_eq!(status, 200);
    let url = started["url"].as_str().expect("url").to_string();
    assert!(url.starts_with("http://localhost:"));

    let (_, again) = post(&router, json!({"action": "start", "serverId": "c1"}));
    assert_eq!(again["url"], url.as_str());

    let (_, running) = post(&router, json!({"action": "status", "serverId": "c1"}));
    assert_eq!(running, json!({"running": true, "url": url}));

    let (_, stopped) = post(&router, json!({"action": "stop", "serverId": "c1"}));
    assert_eq!(stopped, json!({"success": true}));

    let (_, after) = post(&router, json!({"action": "status", "serverId": "c1"}));
    assert_eq!(after, json!({"running": false, "url": null}));
}

#[test]
fn spawn_failure_is_a_server_error() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("no-such-companion");
    let router = router(dir.path(), &missing.display().to_string());

    let reply = router.dispatch(ControlRequest::start("c1", &[]));
    assert_eq!(reply.status, 500);
    assert!(reply.body["error"]
        .as_str()
        .expect("error message")
        .starts_with("Failed to start server"));
    assert!(!router.supervisor().status("c1").running);
}
