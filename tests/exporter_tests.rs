//! Integration tests for the Mandrill exporter
//!
//! These tests run the exporter against a local stub of the Mandrill API:
//! - Mapping of the tags payload onto the exported metrics
//! - Scrapes surviving upstream failures
//! - Liveness probe across the lifecycle
//! - Draining in-flight scrapes on shutdown

mod fixtures;

use axum::http::StatusCode;
use fixtures::{client, RunningExporter, StubMandrill, StubResponse};
use mandrill_exporter::upstream::{MandrillClient, TagStatisticsSource};
use mandrill_exporter::{ExporterError, HealthStatus, UpstreamError};
use std::time::Duration;

const WELCOME_PAYLOAD: &str =
    r#"[{"Tag":"welcome","Sent":100,"hard_bounces":2,"Opens":40,"Reputation":85}]"#;

#[tokio::test]
async fn test_client_posts_api_key_and_decodes_payload() {
    let stub = StubMandrill::start(StubResponse::ok(WELCOME_PAYLOAD)).await;
    let mandrill = MandrillClient::new(stub.url.clone(), "test-key");

    let stats = mandrill.fetch_tag_statistics().await.unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].tag, "welcome");
    assert_eq!(stats[0].sent, 100);
    assert_eq!(stats[0].clicks, 0);
    assert_eq!(stub.requests(), vec![serde_json::json!({"key": "test-key"})]);
}

#[tokio::test]
async fn test_client_reports_mandrill_error_object() {
    let stub = StubMandrill::start(
        StubResponse::ok(
            r#"{"status":"error","code":-1,"name":"Invalid_Key","message":"Invalid API key"}"#,
        )
        .with_status(StatusCode::INTERNAL_SERVER_ERROR),
    )
    .await;
    let mandrill = MandrillClient::new(stub.url.clone(), "");

    match mandrill.fetch_tag_statistics().await {
        Err(UpstreamError::Api {
            status,
            name,
            message,
        }) => {
            assert_eq!(status, 500);
            assert_eq!(name, "Invalid_Key");
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(stub.requests(), vec![serde_json::json!({"key": ""})]);
}

#[tokio::test]
async fn test_scrape_exports_every_metric_for_tag() {
    let stub = StubMandrill::start(StubResponse::ok(WELCOME_PAYLOAD)).await;
    let exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;

    let response = client()
        .get(exporter.url("/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();

    for (name, value) in [
        ("sent_total", 100),
        ("hard_bounces", 2),
        ("soft_bounces", 0),
        ("rejects", 0),
        ("complaints", 0),
        ("unsubs", 0),
        ("opens", 40),
        ("clicks", 0),
        ("unique_opens", 0),
        ("unique_clicks", 0),
        ("reputation", 85),
    ] {
        let line = format!("mandrill_{}{{tag=\"welcome\"}} {}", name, value);
        assert_eq!(body.matches(&line).count(), 1, "missing {}", line);
    }

    exporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_scrape_calls_upstream() {
    let stub = StubMandrill::start(StubResponse::ok(WELCOME_PAYLOAD)).await;
    let exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;

    let (first, second) = tokio::join!(
        client().get(exporter.url("/metrics")).send(),
        client().get(exporter.url("/metrics")).send()
    );
    assert_eq!(first.unwrap().status(), 200);
    assert_eq!(second.unwrap().status(), 200);
    assert_eq!(stub.requests().len(), 2);

    exporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scrape_succeeds_when_upstream_unreachable() {
    // Nothing listens on the discard port on loopback
    let exporter = RunningExporter::start(
        "http://127.0.0.1:9/api/1.0/tags/list.json",
        "key",
        Duration::from_secs(5),
    )
    .await;

    let response = client()
        .get(exporter.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(!body.contains("tag=\""));
    assert!(body.contains("mandrill_exporter_upstream_errors_total{kind=\"transport\"} 1"));

    exporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scrape_succeeds_when_upstream_returns_garbage() {
    let stub = StubMandrill::start(StubResponse::ok("<html>Bad Gateway</html>")).await;
    let exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;

    let response = client()
        .get(exporter.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("mandrill_exporter_upstream_errors_total{kind=\"parse\"} 1"));

    exporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_landing_page_and_unknown_paths() {
    let stub = StubMandrill::start(StubResponse::ok("[]")).await;
    let exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;

    let response = client().get(exporter.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Mandrill"));

    let response = client().get(exporter.url("/foo")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    exporter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_healthz_across_lifecycle() {
    let stub = StubMandrill::start(StubResponse::ok("[]")).await;
    let exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;
    let health = exporter.health.clone();

    let response = client()
        .get(exporter.url("/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert!(response.text().await.unwrap().is_empty());

    exporter.shutdown().await.unwrap();
    assert_eq!(health.status(), HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_scrape() {
    let stub = StubMandrill::start(
        StubResponse::ok(WELCOME_PAYLOAD).with_delay(Duration::from_millis(500)),
    )
    .await;
    let mut exporter = RunningExporter::start(&stub.url, "key", Duration::from_secs(5)).await;
    let addr = exporter.addr;

    let scrape_url = exporter.url("/metrics");
    let scrape = tokio::spawn(async move { client().get(scrape_url).send().await });

    // Wait until the scrape has reached the upstream call
    for _ in 0..100 {
        if !stub.requests().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(stub.requests().len(), 1);

    exporter.begin_shutdown();
    for _ in 0..100 {
        if exporter.health.status() == HealthStatus::Unhealthy {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(exporter.health.status(), HealthStatus::Unhealthy);

    // The slow scrape is still waiting on upstream, but new connections
    // are already refused
    assert!(!scrape.is_finished());
    let during_drain = client()
        .get(format!("http://{}/metrics", addr))
        .send()
        .await;
    assert!(during_drain.is_err());
    assert!(!scrape.is_finished());

    let response = scrape.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("mandrill_sent_total{tag=\"welcome\"} 100"));

    exporter.join().await.unwrap();

    let refused = client()
        .get(format!("http://{}/metrics", addr))
        .send()
        .await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn test_shutdown_times_out_on_hung_scrape() {
    let stub = StubMandrill::start(
        StubResponse::ok(WELCOME_PAYLOAD).with_delay(Duration::from_secs(3)),
    )
    .await;
    let mut exporter =
        RunningExporter::start(&stub.url, "key", Duration::from_millis(200)).await;

    let scrape_url = exporter.url("/metrics");
    let scrape = tokio::spawn(async move { client().get(scrape_url).send().await });

    for _ in 0..100 {
        if !stub.requests().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    exporter.begin_shutdown();
    let result = exporter.join().await;

    assert!(matches!(
        result,
        Err(ExporterError::ShutdownDrainTimeout { .. })
    ));

    // The hung scrape is cut off instead of completing after the deadline
    let response = scrape.await.unwrap();
    assert!(response.is_err());
}
