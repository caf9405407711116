//! Metrics HTTP server
//!
//! Serves the scrape endpoint, a landing page and the readiness/health
//! endpoints used by process supervisors.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::Exporter;
use crate::config::WebConfig;
use crate::error::{ExporterError, Result};

/// Header Prometheus sends with the scrape timeout of the job
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// Health endpoint response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub probes: Vec<&'static str>,
}

/// Shared state for the metrics server
pub struct ServerState {
    pub exporter: Arc<Exporter>,
    pub telemetry_path: String,
    /// Configured upper bound for one cycle
    pub scrape_timeout: Option<Duration>,
    pub scrape_timeout_offset: Duration,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(exporter: Arc<Exporter>, web: &WebConfig) -> Self {
        Self {
            exporter,
            telemetry_path: web.telemetry_path.clone(),
            scrape_timeout: web.scrape_timeout(),
            scrape_timeout_offset: web.scrape_timeout_offset(),
            started_at: Utc::now(),
        }
    }

    /// Cycle budget for a request carrying `headers`
    fn budget(&self, headers: &HeaderMap) -> Option<Duration> {
        let requested = headers
            .get(SCRAPE_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok());
        scrape_budget(requested, self.scrape_timeout, self.scrape_timeout_offset)
    }
}

/// Derive the cycle budget from the Prometheus scrape timeout header.
///
/// The offset leaves room to encode and send the response; it is ignored when
/// it would consume the whole timeout. The configured timeout caps the result.
pub fn scrape_budget(
    requested: Option<&str>,
    configured: Option<Duration>,
    offset: Duration,
) -> Option<Duration> {
    let requested = requested
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(|timeout| {
            if timeout > offset {
                timeout - offset
            } else {
                timeout
            }
        });

    match (requested, configured) {
        (Some(r), Some(c)) => Some(r.min(c)),
        (r, c) => r.or(c),
    }
}

/// HTTP server exposing one exporter
pub struct MetricsServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(exporter: Arc<Exporter>, web: &WebConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(ServerState::new(exporter, web)),
            addr: web.listen_addr()?,
        })
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        info!(
            "Listening on {} (metrics at {})",
            self.addr, self.state.telemetry_path
        );

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ExporterError::Server(format!("metrics server error: {}", e)))?;

        Ok(())
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route(&state.telemetry_path, get(metrics_handler))
        .route("/-/ready", get(ready_handler))
        .route("/-/healthy", get(healthy_handler))
        .with_state(state)
}

/// Run one scrape cycle and expose its snapshot
async fn metrics_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let budget = state.budget(&headers);
    debug!(budget = ?budget, "scrape requested");

    let snapshot = state.exporter.collect_within(budget).await;
    match snapshot.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn landing_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>Harbor Exporter</title></head>
<body>
<h1>Harbor Exporter</h1>
<p><a href="{path}">Metrics</a></p>
<h2>Build</h2>
<pre>Name: {name}
Version: {version}
Target: {target}</pre>
</body>
</html>"#,
        path = state.telemetry_path,
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        target = state.exporter.target(),
    ))
}

async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn healthy_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: uptime,
        probes: state.exporter.probe_names(),
    })
}
