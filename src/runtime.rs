use crate::config::Server;
use crate::engine::{parse_request, ExecutionResult, ExecutionService, RequestError};

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

/* ---------------- server ---------------- */

pub fn router(service: ExecutionService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/run-python", post(run_python))
        .with_state(service)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                }),
        )
}

pub async fn serve(server: &Server, service: ExecutionService) -> anyhow::Result<()> {
    let socket: SocketAddr = server.addr.parse()?;
    let listener = TcpListener::bind(socket).await?;

    tracing::info!(
        candidates = ?service.candidates(),
        "pyexec listening on http://{}",
        socket
    );

    let app = router(service.clone(), server.max_body_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(service))
        .await?;
    Ok(())
}

/// Resolves on ctrl-c. Queued runs are turned away with a 500 while
/// in-flight ones finish.
async fn shutdown_signal(service: ExecutionService) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
    service.shutdown();
}

/* ---------------- endpoints ---------------- */

async fn health() -> &'static str {
    "ok"
}

/// The body is taken raw, and its extraction failure kept, so malformed JSON
/// and oversized bodies get the same response shape as every other rejection.
async fn run_python(
    State(service): State<ExecutionService>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let parsed = match body {
        Ok(body) => parse_request(&body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(RequestError::TooLarge)
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "request body unreadable");
            Err(RequestError::Unreadable)
        }
    };

    let req = match parsed {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(reason = %e, "request rejected");
            return (rejection_status(&e), Json(ExecutionResult::from(&e))).into_response();
        }
    };

    match service.execute(&req).await {
        Ok(outcome) => (StatusCode::OK, Json(ExecutionResult::from(outcome))).into_response(),

        Err(e) => {
            tracing::error!(error = %e, "execution unavailable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecutionResult::from(&e)),
            )
                .into_response()
        }
    }
}

fn rejection_status(err: &RequestError) -> StatusCode {
    match err {
        RequestError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}
