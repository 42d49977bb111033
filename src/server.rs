// http server mode - run the analyzer as an api

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{AnalysisResult, AnalyzeOptions, Analyzer, Error, Output, QueryRiskLevel};

struct AppState {
    analyzer: Analyzer,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    sql: String,
    #[serde(default)]
    options: AnalyzeOptions,
}

#[derive(Serialize)]
struct SafeResponse {
    ai_executable: bool,
    risk_level: QueryRiskLevel,
    risk_score: u32,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub struct Server;

impl Server {
    pub async fn run(analyzer: Analyzer, host: &str, port: u16) -> Result<(), Error> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;
        let policy = analyzer.config();
        info!(
            allowed_schemas = ?policy.allowed_schemas,
            read_only = policy.read_only_mode,
            custom_rules = policy.custom_rules.len(),
            "server running at http://{addr}"
        );

        Self::serve(listener, analyzer).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(listener: TcpListener, analyzer: Analyzer) -> Result<(), Error> {
        axum::serve(listener, Self::router(analyzer))
            .await
            .map_err(|e| Error::Server(e.to_string()))
    }

    pub fn router(analyzer: Analyzer) -> Router {
        let state = Arc::new(AppState { analyzer });

        Router::new()
            .route("/health", get(health))
            .route("/analyze", post(analyze))
            .route("/safe", post(safe))
            .route("/report", post(report))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

fn run_analysis(state: &AppState, req: &AnalyzeRequest) -> AnalysisResult {
    let result = state.analyzer.analyze(&req.sql, &req.options);
    info!(
        operation = %result.operation(),
        risk_level = %result.security.risk_level,
        ai_executable = result.ai_executable,
        "analyzed request"
    );
    result
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<AnalysisResult> {
    Json(run_analysis(&state, &req))
}

async fn safe(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<SafeResponse> {
    let result = run_analysis(&state, &req);
    Json(SafeResponse {
        ai_executable: result.ai_executable,
        risk_level: result.security.risk_level,
        risk_score: result.security.risk_score,
    })
}

async fn report(State(state): State<Arc<AppState>>, Json(req): Json<AnalyzeRequest>) -> String {
    Output::report(&run_analysis(&state, &req))
}
