use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use console::style;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::engine::FetchContext;
use crate::exporter::Exporter;

const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

pub fn router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthcheck", get(healthcheck))
        .with_state(exporter)
}

/// Serves the exporter until Ctrl-C.
pub async fn serve(exporter: Arc<Exporter>) -> anyhow::Result<()> {
    let address = exporter.config().listen_address;
    let listener = TcpListener::bind(address).await?;

    tracing::info!(
        url = %style(format!("http://{address}/metrics")).yellow(),
        "listening"
    );

    axum::serve(listener, router(exporter))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("couldn't listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn healthcheck() -> &'static str {
    "ok"
}

async fn metrics(State(exporter): State<Arc<Exporter>>, headers: HeaderMap) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("scrape", %request_id);

    // Cancelled once the handler is done, or dropped because the client went
    // away.
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    if let Some(timeout) = scrape_timeout(&headers) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(%request_id, ?timeout, "scrape deadline reached, cancelling");
                    token.cancel();
                }
            }
        });
    }

    let context = FetchContext::new(token);

    async move {
        tracing::info!("collecting metrics");

        let collected = exporter.collect(&context).await;
        let failed = collected.queries.iter().filter(|q| !q.success()).count();

        tracing::info!(
            queries = collected.queries.len(),
            failed,
            fetchers = collected.executions.len(),
            "collected metrics"
        );

        match exporter.render(&collected) {
            Ok(body) => (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(err) => {
                tracing::error!("couldn't render metrics: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
    .instrument(span)
    .await
}

fn scrape_timeout(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(SCRAPE_TIMEOUT_HEADER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
