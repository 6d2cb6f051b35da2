//! Engine assembly and fixture-driven flows.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use courier::{config::Config, engine::Engine};
use courier_common::{
    campaign::CampaignStatus,
    job::JobStatus,
    provider::{Provider, ProviderCredentials},
    quota::QuotaLimits,
};
use courier_store::Store;

fn unreachable_http_provider() -> Provider {
    Provider {
        name: "primary".to_string(),
        priority: 1,
        enabled: true,
        credentials: ProviderCredentials::HttpApi {
            // Nothing listens on the discard port; sends fail fast.
            endpoint: "http://127.0.0.1:9/send".to_string(),
            api_key: "test-key".to_string(),
        },
    }
}

fn engine_with_fixtures(dir: &tempfile::TempDir) -> Engine {
    let payload_path = dir.path().join("payload.csv");
    std::fs::File::create(&payload_path)
        .unwrap()
        .write_all(b"sku,stock\nA-1,5\n")
        .unwrap();

    let fixtures_path = dir.path().join("fixtures.ron");
    let fixtures = format!(
        r#"(
            campaigns: [
                (
                    id: "c1",
                    subject: "Hello {{{{name}}}}",
                    content: "<p>Hi {{{{name}}}}</p>",
                    status: approved,
                ),
            ],
            subscribers: [
                ( id: "s1", email: "ada@example.org", status: active, name: Some("Ada") ),
                ( id: "s2", email: "blocked@example.org", status: active ),
            ],
            suppression: ["blocked@example.org"],
            jobs: [
                ( id: "j1", operation_type: inventory, status: pending, payload_ref: "upload-1" ),
            ],
            payloads: [
                ( reference: "upload-1", file: "{}" ),
            ],
        )"#,
        payload_path.display()
    );
    std::fs::write(&fixtures_path, fixtures).unwrap();

    let config = Config {
        quota: QuotaLimits {
            hourly: Some(100),
            daily: Some(100),
        },
        providers: vec![unreachable_http_provider()],
        fixtures: Some(fixtures_path),
        ..Config::default()
    };

    Engine::from_config(config).unwrap()
}

#[tokio::test]
async fn engine_reports_status_and_reserves_quota() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fixtures(&dir);
    engine.load_fixtures().await.unwrap();

    let status = engine.status();
    assert!(status.limits_configured);
    assert_eq!(status.providers, 1);

    let admission = engine.reserve(10).await.unwrap();
    assert!(admission.allowed);
    assert_eq!(admission.allow_count, 10);
}

#[tokio::test]
async fn engine_processes_fixture_job() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fixtures(&dir);
    engine.load_fixtures().await.unwrap();

    let summary = engine.process_job().await.unwrap().unwrap();
    assert_eq!(summary.job_id, "j1");
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.processed, 1);

    assert_eq!(engine.store().product("A-1").await.unwrap().unwrap().stock, 5);

    // One job per invocation; the second finds nothing due.
    assert!(engine.process_job().await.unwrap().is_none());
}

#[tokio::test]
async fn dispatch_records_failures_when_no_provider_is_reachable() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fixtures(&dir);
    engine.load_fixtures().await.unwrap();

    let summary = engine.dispatch("c1").await.unwrap();
    assert_eq!(summary.status, CampaignStatus::CompletedWithErrors);
    assert_eq!(summary.sent, 0);
    // Only the unsuppressed subscriber was attempted.
    assert_eq!(summary.failed, 1);

    let logs = engine.store().delivery_logs("c1").await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].recipient, "ada@example.org");
}

#[tokio::test]
async fn engine_refuses_to_start_without_providers() {
    let config = Config {
        quota: QuotaLimits {
            hourly: Some(100),
            daily: Some(100),
        },
        ..Config::default()
    };
    assert!(Engine::from_config(config).is_err());
}

#[tokio::test]
async fn draft_campaigns_cannot_be_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fixtures(&dir);
    engine.load_fixtures().await.unwrap();

    engine
        .store()
        .insert_campaign(courier_common::campaign::Campaign::new(
            "draft",
            "WIP",
            "<p>x</p>",
        ))
        .await
        .unwrap();

    assert!(engine.dispatch("draft").await.is_err());
}
