use super::*;
use boxci_core::SystemClock;
use boxci_journal::JournalPaths;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn config(service: String) -> AgentConfig {
    AgentConfig {
        project_id: boxci_core::ProjectId::new("Ptest123"),
        key: "secret".to_string(),
        machine_name: None,
        ssh_host: None,
        silent: true,
        service,
    }
}

fn runtime(service_port: u16) -> (AgentRuntime<SystemClock>, tempfile::TempDir) {
    let journal_dir = tempdir().unwrap();
    let journal = Journal::new(JournalPaths::resolve_at(journal_dir.path()), SystemClock);
    let http = Arc::new(HttpClient::new(format!("http://127.0.0.1:{service_port}"), "Ptest123", "secret"));
    let git = GitDriver::new(journal_dir.path().join("scratch"));
    (AgentRuntime { http, journal, git, clock: SystemClock }, journal_dir)
}

/// Reads one HTTP/1.1 request off `socket`, returns its request-line path.
async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = vec![0u8; 16 * 1024];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let text = String::from_utf8_lossy(&buf[..n]);
    text.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

async fn write_response(socket: &mut tokio::net::TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        _ => "X",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Serves a fixed `path -> (status, body)` map for every connection,
/// answering unmapped paths with a bare `200 {}` so unrelated best-effort
/// calls (e.g. `/agent-stopped`) never hang the test.
async fn serve(listener: TcpListener, routes: HashMap<&'static str, (u16, &'static str)>) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else { return };
        let path = read_request_path(&mut socket).await;
        let (status, body) = routes.get(path.as_str()).copied().unwrap_or((200, "{}"));
        write_response(&mut socket, status, body).await;
    }
}

async fn spawn_routes(routes: HashMap<&'static str, (u16, &'static str)>) -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(serve(listener, routes));
    (port, handle)
}

const OK_PROJECT: &str = r#"{"projectId":"Ptest123","gitRepoSshUrl":"git@github.com:acme/widgets.git","repoType":"git_hub"}"#;
const OK_MANIFEST: &str = r#"{"thisVersion":"0.1.0","latestVersion":"0.1.0","manifest":{}}"#;
const FATAL_MANIFEST: &str = r#"{"thisVersion":"0.1.0","latestVersion":"9.9.9","manifest":{"w":3,"is":["drop support for ancient clients"]}}"#;

#[tokio::test]
async fn fatal_auth_on_project_fetch_stops_the_agent() {
    let routes = HashMap::from([("/project", (401u16, "{}"))]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Fatal { reason: "invalid-creds" });
    server.abort();
}

#[tokio::test]
async fn forbidden_on_project_fetch_stops_the_agent_with_invalid_config() {
    let routes = HashMap::from([("/project", (403u16, "{}"))]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Fatal { reason: "invalid-config" });
    server.abort();
}

#[tokio::test]
async fn fatal_auth_on_get_build_poll_stops_the_agent() {
    let routes = HashMap::from([
        ("/project", (200u16, OK_PROJECT)),
        ("/manifest", (200u16, OK_MANIFEST)),
        ("/get-build", (401u16, "{}")),
    ]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Fatal { reason: "invalid-creds" });
    server.abort();
}

#[tokio::test]
async fn unsupported_version_manifest_is_fatal() {
    let routes = HashMap::from([
        ("/project", (200u16, OK_PROJECT)),
        ("/manifest", (200u16, FATAL_MANIFEST)),
    ]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Fatal { reason: "unsupported-version" });
    server.abort();
}

#[tokio::test]
async fn stop_file_present_before_first_poll_stops_cooperatively() {
    let routes = HashMap::from([
        ("/project", (200u16, OK_PROJECT)),
        ("/manifest", (200u16, OK_MANIFEST)),
    ]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, dir) = runtime(port);
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join("stop"), "").unwrap();

    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Stopped { reason: "stopped-from-cli" });
    server.abort();
}

#[tokio::test]
async fn server_requested_stop_via_get_build_stops_the_agent() {
    let routes = HashMap::from([
        ("/project", (200u16, OK_PROJECT)),
        ("/manifest", (200u16, OK_MANIFEST)),
        ("/get-build", (200u16, r#"{"__stop__agent":true}"#)),
        ("/agent-stopped", (200u16, "{}")),
    ]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let outcome = run_agent(config(format!("http://127.0.0.1:{port}")), rt).await;

    assert_eq!(outcome, AgentOutcome::Stopped { reason: "stopped-from-app" });
    server.abort();
}

#[tokio::test]
async fn invalid_build_from_get_build_is_skipped_not_fatal() {
    // agentName on the returned build never matches this agent's generated
    // name, so `ProjectBuild::is_valid` is false; the loop should keep
    // polling rather than panic or exit. Assert it's still alive after a
    // beat, then tear it down.
    let routes = HashMap::from([
        ("/project", (200u16, OK_PROJECT)),
        ("/manifest", (200u16, OK_MANIFEST)),
        (
            "/get-build",
            (
                200u16,
                r#"{"id":"Bxxxxxxxxxxx","gitCommit":"deadbeef","agentName":"agent-not-me","gitBranch":"main"}"#,
            ),
        ),
    ]);
    let (port, server) = spawn_routes(routes).await;

    let (rt, _dir) = runtime(port);
    let agent = tokio::spawn(run_agent(config(format!("http://127.0.0.1:{port}")), rt));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!agent.is_finished(), "agent should keep polling on an invalid build, not exit");

    agent.abort();
    server.abort();
}
