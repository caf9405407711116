//! In-process fake of the harbor API for integration tests

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use harbor_exporter::config::HarborConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `admin:password`, the default credentials
pub const DEFAULT_AUTH: &str = "Basic YWRtaW46cGFzc3dvcmQ=";

/// One request as seen by the fake
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<String, (StatusCode, String)>,
    delay: HashMap<String, Duration>,
    seen: Mutex<Vec<Seen>>,
}

/// Builder for a fake harbor instance
#[derive(Default)]
pub struct FakeHarbor {
    state: FakeState,
}

impl FakeHarbor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A harbor answering every endpoint of the default collectors
    pub fn healthy() -> Self {
        let mut fake = Self::new();
        for (path, body) in HEALTHY_ROUTES {
            fake = fake.ok(path, body);
        }
        fake
    }

    pub fn ok(self, path: &str, body: &str) -> Self {
        self.route(path, StatusCode::OK, body)
    }

    pub fn route(mut self, path: &str, status: StatusCode, body: &str) -> Self {
        self.state
            .routes
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    pub fn slow(mut self, path: &str, delay: Duration) -> Self {
        self.state.delay.insert(path.to_string(), delay);
        self
    }

    /// Serve on an ephemeral port; returns the API base URL and the request log.
    pub async fn spawn(self) -> (String, Arc<FakeHandle>) {
        let state = Arc::new(self.state);
        let app = Router::new()
            .fallback(handler)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api"), Arc::new(FakeHandle { state }))
    }
}

pub struct FakeHandle {
    state: Arc<FakeState>,
}

impl FakeHandle {
    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().unwrap().clone()
    }
}

async fn handler(State(state): State<Arc<FakeState>>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .trim_start_matches("/api")
        .to_string();
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.seen.lock().unwrap().push(Seen {
        path: path.clone(),
        user_agent: header_value(header::USER_AGENT),
        content_type: header_value(header::CONTENT_TYPE),
    });

    if let Some(delay) = state.delay.get(&path) {
        tokio::time::sleep(*delay).await;
    }

    if header_value(header::AUTHORIZATION).as_deref() != Some(DEFAULT_AUTH) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match state.routes.get(&path) {
        Some((status, body)) => (*status, body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn harbor_config(url: &str) -> HarborConfig {
    HarborConfig {
        url: url.to_string(),
        ..HarborConfig::default()
    }
}

pub const HEALTHY_ROUTES: [(&str, &str); 19] = [
    ("/configurations", r#"{"auth_mode": {"value": "db_auth"}}"#),
    (
        "/systeminfo",
        r#"{"registry_url": "harbor.local", "project_creation_restriction": "adminonly",
            "self_registration": false, "harbor_version": "v1.10.2-abc"}"#,
    ),
    (
        "/statistics",
        r#"{"private_project_count": 1, "private_repo_count": 2, "public_project_count": 1,
            "public_repo_count": 3, "total_project_count": 2, "total_repo_count": 5}"#,
    ),
    ("/systeminfo/volumes", r#"{"storage": {"total": 2000, "free": 500}}"#),
    (
        "/health",
        r#"{"status": "healthy", "components": [{"name": "core", "status": "healthy"},
            {"name": "registry", "status": "healthy"}]}"#,
    ),
    ("/projects?page_size=1", r#"[{"project_id": 1, "name": "library"}]"#),
    ("/projects/1", r#"{"project_id": 1, "name": "library"}"#),
    ("/projects/1/logs?page_size=1", r#"[{"log_id": 3, "project_id": 1}]"#),
    ("/projects/1/metadatas", r#"{"public": "true"}"#),
    ("/projects/1/metadatas/public", r#"{"public": "true"}"#),
    ("/projects/1/members", r#"[{"id": 1, "project_id": 1, "entity_name": "admin"}]"#),
    ("/projects/1/members/1", r#"{"id": 1, "project_id": 1}"#),
    ("/repositories?project_id=1&page_size=1", r#"[{"id": 1, "name": "library/redis"}]"#),
    ("/repositories/top?count=1", r#"[{"id": 1, "name": "library/redis"}]"#),
    ("/users?page_size=1", r#"[{"user_id": 1, "username": "admin"}]"#),
    ("/users/1", r#"{"user_id": 1, "username": "admin"}"#),
    ("/users/current", r#"{"user_id": 1, "username": "admin"}"#),
    ("/logs?page_size=1", r#"[{"log_id": 9, "operation": "create"}]"#),
    ("/system/gc", r#"[{"id": 4, "job_status": "finished"}]"#),
];
