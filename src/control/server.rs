use super::router::{RequestRouter, RouterReply};
use crate::config::Settings;
use crate::runtime::{ProcessSupervisor, RuntimeLog, SupervisorConfig};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;

pub const CONTROL_PATH: &str = "/api/server";

#[derive(Clone)]
struct ControlState {
    router: Arc<RequestRouter>,
}

pub fn build_router(router: Arc<RequestRouter>) -> Router {
    Router::new()
        .route(CONTROL_PATH, post(control_handler))
        .with_state(ControlState { router })
}

async fn control_handler(State(state): State<ControlState>, body: Bytes) -> Response {
    let router = Arc::clone(&state.router);
    let reply = tokio::task::spawn_blocking(move || router.handle_body(&body))
        .await
        .unwrap_or_else(|err| RouterReply::server_error(format!("control task failed: {err}")));
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body)).into_response()
}

pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    router: Arc<RequestRouter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(router))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Runs the control endpoint until Ctrl-C, then terminates every tracked process.
pub fn run_control_server(settings: &Settings, log: RuntimeLog) -> Result<usize, String> {
    let addr = settings.listen_addr().map_err(|e| e.to_string())?;
    let supervisor = Arc::new(ProcessSupervisor::new(
        SupervisorConfig::from_settings(settings),
        log.clone(),
    ));
    let router = Arc::new(RequestRouter::new(Arc::clone(&supervisor)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| format!("bind {addr} failed: {e}"))?;
        log.info(
            "control.listening",
            &format!("addr={addr} path={CONTROL_PATH}"),
        );
        let shutdown = wait_for_shutdown_signal(tokio::signal::ctrl_c(), log.clone());
        serve(listener, router, shutdown)
            .await
            .map_err(|e| format!("control server failed: {e}"))
    });

    let terminated = supervisor.shutdown();
    log.info("control.shutdown", &format!("terminated={terminated}"));
    served.map(|()| terminated)
}

/// Resolves once `signal` fires. A signal that cannot be installed keeps the server up.
async fn wait_for_shutdown_signal<F>(signal: F, log: RuntimeLog)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        log.warn("control.signal_unavailable", &format!("error={err}"));
        std::future::pending::<()>().await;
    }
}
