mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{harbor_config, FakeHarbor};
use harbor_exporter::config::WebConfig;
use harbor_exporter::error::ExporterError;
use harbor_exporter::probes::ProbeRegistry;
use harbor_exporter::services::{router, Exporter, ServerState, Snapshot};
use harbor_exporter::HarborClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn exporter_for(url: &str, overrides: &HashMap<String, bool>) -> Exporter {
    let client = HarborClient::new(&harbor_config(url)).unwrap();
    let registry = ProbeRegistry::builtin(None).unwrap();
    let active = registry.resolve(overrides).unwrap();
    Exporter::new(Arc::new(client), &registry, active, url).unwrap()
}

fn ref_works(snapshot: &Snapshot) -> usize {
    [
        "harbor_ref_work_projects",
        "harbor_ref_work_repos",
        "harbor_ref_work_users",
        "harbor_ref_work_logs",
        "harbor_ref_work_gc",
    ]
    .iter()
    .map(|name| snapshot.series_count(name))
    .sum()
}

#[tokio::test]
async fn healthy_harbor_scrapes_cleanly() {
    let (url, _fake) = FakeHarbor::healthy().spawn().await;
    let exporter = exporter_for(&url, &HashMap::new());

    let snapshot = exporter.collect().await;

    assert_eq!(snapshot.value("harbor_up", &[]), Some(1.0));
    assert_eq!(snapshot.value("harbor_exporter_last_scrape_error", &[]), Some(0.0));
    assert_eq!(
        snapshot.value("harbor_version_info", &[("version", "v1.10.2-abc")]),
        Some(1.0)
    );
    assert_eq!(
        snapshot.value("harbor_system_volumes_bytes", &[("type", "used")]),
        Some(1500.0)
    );
    assert_eq!(snapshot.series_count("harbor_health"), 2);
    assert_eq!(ref_works(&snapshot), 9 + 3 + 1 + 1);
    // eight default collectors plus the liveness check
    assert_eq!(
        snapshot.series_count("harbor_exporter_collector_duration_seconds"),
        9
    );
}

#[tokio::test]
async fn broken_endpoint_fails_only_its_collector() {
    let (url, _fake) = FakeHarbor::healthy()
        .route("/health", StatusCode::INTERNAL_SERVER_ERROR, "")
        .spawn()
        .await;
    let exporter = exporter_for(&url, &HashMap::new());

    let snapshot = exporter.collect().await;

    assert_eq!(snapshot.value("harbor_up", &[]), Some(1.0));
    assert_eq!(snapshot.value("harbor_exporter_last_scrape_error", &[]), Some(1.0));
    assert_eq!(
        snapshot.value("harbor_exporter_scrape_errors_total", &[("collector", "health")]),
        Some(1.0)
    );
    assert_eq!(
        snapshot.value("harbor_exporter_scrape_errors_total", &[("collector", "users")]),
        Some(0.0)
    );
    assert_eq!(snapshot.series_count("harbor_health"), 0);
    assert_eq!(snapshot.series_count("harbor_project_count_total"), 3);
}

#[tokio::test]
async fn overrides_change_the_active_set() {
    let (url, fake) = FakeHarbor::healthy().spawn().await;
    let overrides = HashMap::from([
        ("projects".to_string(), false),
        ("users".to_string(), false),
        ("logs".to_string(), false),
        ("systemgc".to_string(), false),
        ("statistics".to_string(), false),
        ("systeminfoVolumes".to_string(), false),
        ("health".to_string(), false),
    ]);
    let exporter = exporter_for(&url, &overrides);
    assert_eq!(exporter.probe_names(), vec!["systeminfo"]);

    exporter.collect().await;

    let mut paths: Vec<String> = fake.seen().into_iter().map(|s| s.path).collect();
    paths.sort();
    assert_eq!(paths, vec!["/configurations", "/systeminfo"]);
}

#[test]
fn unknown_override_is_a_startup_error() {
    let registry = ProbeRegistry::builtin(None).unwrap();
    let overrides = HashMap::from([("quotas".to_string(), true)]);
    assert!(matches!(
        registry.resolve(&overrides),
        Err(ExporterError::UnknownProbe(name)) if name == "quotas"
    ));
}

#[tokio::test]
async fn scrape_header_bounds_the_cycle() {
    let (url, _fake) = FakeHarbor::healthy()
        .slow("/health", Duration::from_secs(10))
        .spawn()
        .await;
    let exporter = Arc::new(exporter_for(&url, &HashMap::new()));
    let web = WebConfig {
        scrape_timeout_offset_ms: 0,
        ..WebConfig::default()
    };
    let app = router(Arc::new(ServerState::new(exporter, &web)));

    let started = std::time::Instant::now();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .header("X-Prometheus-Scrape-Timeout-Seconds", "0.5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#"harbor_exporter_scrape_errors_total{collector="health"} 1"#));
    assert!(text.contains(r#"harbor_exporter_scrape_errors_total{collector="users"} 0"#));
    assert!(text.contains("harbor_up 1"));
}
