// tests for the http api

use serde_json::{Value, json};
use sqlgate::{Analyzer, Server};
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(Server::serve(listener, Analyzer::default()));
    format!("http://{addr}")
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_safe_endpoint() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/safe"))
        .json(&json!({ "sql": "DELETE FROM users" }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["ai_executable"], false);
    assert_eq!(body["risk_level"], "HIGH");

    let body: Value = client
        .post(format!("{base}/safe"))
        .json(&json!({ "sql": "SELECT id FROM users WHERE id = 1" }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["ai_executable"], true);
    assert_eq!(body["risk_score"], 10);
}

#[tokio::test]
async fn test_analyze_with_options() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{base}/analyze"))
        .json(&json!({
            "sql": "INSERT INTO users (name) VALUES ('x')",
            "options": { "read_only_mode": true }
        }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["ai_executable"], false);
    assert_eq!(body["query"]["is_modifying"], true);
    assert_eq!(body["classification"]["subcategory"], "DATA_INSERT");
}

#[tokio::test]
async fn test_report_endpoint() {
    let base = spawn_server().await;
    let text = reqwest::Client::new()
        .post(format!("{base}/report"))
        .json(&json!({ "sql": "TRUNCATE TABLE users" }))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("text body");
    assert!(text.starts_with("SQL Security Analysis Report"));
    assert!(text.contains("AI Executable: No"));
}

#[tokio::test]
async fn test_missing_sql_is_rejected() {
    let base = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/safe"))
        .json(&json!({ "query": "SELECT 1" }))
        .send()
        .await
        .expect("request");
    assert!(response.status().is_client_error());
}
