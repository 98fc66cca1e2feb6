use axum::http::StatusCode;
use serde_json::json;
use time::OffsetDateTime;
use vitals_server::services::{HandOff, VitalsGenerator};

mod common;
use common::mock_app::MockApp;

#[tokio::test]
async fn test_root_and_health() {
    let app = MockApp::new().await;

    let (status, body) = app.get("/api/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Vitals monitor API"));

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["database"], json!("connected"));
    assert_eq!(body["simulation"], json!("inactive"));
}

#[tokio::test]
async fn test_health_reports_closed_store() {
    let app = MockApp::new().await;
    app.context.storage.get_pool().close().await;

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("unhealthy"));

    let (status, body) = app.post("/api/esp32/data", json!({ "bpm": 70 })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], json!(503));
    assert!(body["error"]["error_id"].is_string());
}

#[tokio::test]
async fn test_simulation_toggle() {
    let app = MockApp::new().await;

    let (status, body) = app.post("/api/simulation/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], json!(true));
    assert!(app.context.simulator_control.is_active());

    let (_, body) = app.get("/api/health").await;
    assert_eq!(body["simulation"], json!("active"));

    let (_, body) = app.post("/api/simulation/stop", json!({})).await;
    assert_eq!(body["active"], json!(false));
    assert!(!app.context.simulator_control.is_active());
}

#[tokio::test]
async fn test_simulator_yields_to_real_device() {
    let app = MockApp::new().await;
    let simulator = app.context.simulator(&app.settings);
    let mut hand_off = HandOff::new(app.settings.simulator.resume_after_ticks);
    let mut generator = VitalsGenerator::seeded(42, 0.0);

    assert_eq!(simulator.tick(&mut hand_off, &mut generator).await.unwrap(), 5);

    // A real device takes over
    app.post("/api/esp32/data", json!({ "bpm": 70 })).await;
    assert_eq!(simulator.tick(&mut hand_off, &mut generator).await.unwrap(), 0);
    assert_eq!(simulator.tick(&mut hand_off, &mut generator).await.unwrap(), 0);
    assert_eq!(app.reading_count().await, 6);

    // It goes silent: the first quiet tick still waits, the second produces
    app.context.monitor.reset().await;
    assert!(!app.context.monitor.is_connected(OffsetDateTime::now_utc()).await);
    assert_eq!(simulator.tick(&mut hand_off, &mut generator).await.unwrap(), 0);
    assert_eq!(simulator.tick(&mut hand_off, &mut generator).await.unwrap(), 5);

    let (_, latest) = app.get("/api/vital-signs/latest").await;
    assert_eq!(latest["gsr"]["device_id"], json!("esp32_demo"));
}

#[tokio::test]
async fn test_openapi_document() {
    let app = MockApp::new().await;

    let (status, body) = app.get("/api/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/esp32/data"]["post"].is_object());
    assert!(body["components"]["schemas"]["Reading"].is_object());
}
