//! HTTP server for the fuel log dashboard.
//!
//! An upload is parsed once and kept as a session; every filter change on
//! the dashboard is a cheap request against that session.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                          |
//! |--------|---------------------------------|--------------------------------------|
//! | GET    | `/health`                       | Health check                         |
//! | POST   | `/api/upload`                   | Upload CSV/XLSX, open a session      |
//! | POST   | `/api/sessions/{id}/dashboard`  | Metrics, charts and rows for filters |
//! | POST   | `/api/sessions/{id}/export`     | Filtered rows as XLSX or CSV         |
//! | DELETE | `/api/sessions/{id}`            | Drop a session                       |
//! | GET    | `/api/logs`                     | SSE stream for real-time logs        |

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{delete, get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_info, log_success, LOG_BROADCASTER};
use super::types::{DashboardRequest, ExportRequest, UploadResponse};
use crate::config::ServerConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::export::export;
use crate::models::FacetSelections;
use crate::session::SessionStore;
use crate::transform::{dashboard, filter, process_bytes, Dashboard, ProcessedLog};

/// Shared server state
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: RwLock<SessionStore>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ServerConfig) -> SharedState {
        let sessions = RwLock::new(SessionStore::new(config.max_sessions));
        Arc::new(Self { config, sessions })
    }
}

/// All routes, with body limit and CORS applied
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/dashboard", post(session_dashboard))
        .route("/api/sessions/{id}/export", post(session_export))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr();
    let app = router(AppState::new(config));

    println!("🚀 Fuelboard server running on http://{}", addr);
    println!("   POST   /api/upload                   - Upload CSV/XLSX file");
    println!("   POST   /api/sessions/{{id}}/dashboard  - Filtered dashboard");
    println!("   POST   /api/sessions/{{id}}/export     - Download filtered rows");
    println!("   DELETE /api/sessions/{{id}}            - Close a session");
    println!("   GET    /api/logs                     - SSE log stream");
    println!("   GET    /health                       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<Value> {
    let sessions = state.sessions.read().await;
    Json(json!({
        "status": "ok",
        "service": "fuelboard",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions.len(),
        "maxSessions": sessions.capacity(),
        "activeSessions": sessions.summaries(),
        "maxUploadBytes": state.config.max_upload_bytes,
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn multipart_error(err: MultipartError, limit: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge { limit }
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", err.body_text()))
    }
}

/// Upload endpoint: parse the `file` field and open a session
async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let limit = state.config.max_upload_bytes;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(String::from);
            let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    let processed = tokio::task::spawn_blocking(move || process_bytes(file_name.as_deref(), &bytes))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let processed = Arc::new(processed);
    let view = dashboard(&processed.log, &FacetSelections::new(), true);
    let session_id = state.sessions.write().await.insert(Arc::clone(&processed));

    log_success(format!(
        "Session {} ready ({} rows)",
        session_id,
        processed.log.len()
    ));

    Ok(Json(UploadResponse::new(session_id, &processed, view)))
}

async fn find_session(state: &AppState, id: &str) -> ServerResult<Arc<ProcessedLog>> {
    let uuid = Uuid::parse_str(id).map_err(|_| ServerError::SessionNotFound(id.to_string()))?;
    state
        .sessions
        .read()
        .await
        .processed(&uuid)
        .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
}

/// Recompute the dashboard for new facet selections
async fn session_dashboard(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<DashboardRequest>,
) -> ServerResult<Json<Dashboard>> {
    let processed = find_session(&state, &id).await?;
    let view = dashboard(&processed.log, &request.selections, request.include_rows);
    Ok(Json(view))
}

/// Download the filtered rows
async fn session_export(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> ServerResult<Response> {
    let processed = find_session(&state, &id).await?;
    let format = request.format;

    let bytes = tokio::task::spawn_blocking(move || {
        let filtered = filter(&processed.log, &request.selections);
        log_info(format!("📦 Exporting {} rows as {:?}", filtered.len(), format));
        export(&filtered, format)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))?
    .map_err(PipelineError::from)?;

    let headers = [
        (header::CONTENT_TYPE, format.mime().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let uuid = Uuid::parse_str(&id).map_err(|_| ServerError::SessionNotFound(id.clone()))?;
    if state.sessions.write().await.remove(&uuid) {
        log_info(format!("Session {} closed", uuid));
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportFormat, XLSX_MIME};
    use crate::models::Facet;
    use std::collections::BTreeSet;

    const CSV: &str = "\
Data;Placa;Motorista;Combustível;Litros;Preço Litro;Quilometragem
01/01/2024;AAA1A11;Ana;Gasolina;10;5,50;1000
15/01/2024;AAA1A11;Ana;Gasolina;15;6,00;1150
05/01/2024;BBB2B22;Bruno;Diesel;40;6,00;50000
";

    async fn state_with_upload() -> (SharedState, Uuid) {
        let state = AppState::new(ServerConfig::default());
        let processed = process_bytes(Some("frota.csv"), CSV.as_bytes()).unwrap();
        let id = state.sessions.write().await.insert(Arc::new(processed));
        (state, id)
    }

    fn diesel_only() -> FacetSelections {
        let mut selections = FacetSelections::new();
        selections.insert(Facet::Combustivel, BTreeSet::from(["Diesel".to_string()]));
        selections
    }

    #[tokio::test]
    async fn test_dashboard_for_session() {
        let (state, id) = state_with_upload().await;
        let request = DashboardRequest {
            selections: diesel_only(),
            include_rows: true,
        };

        let Json(view) = session_dashboard(State(state), Path(id.to_string()), Json(request))
            .await
            .unwrap();

        assert_eq!(view.total_rows, 3);
        assert_eq!(view.filtered_rows, 1);
        assert_eq!(view.aggregates.metrics.total_litres, Some(40.0));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let state = AppState::new(ServerConfig::default());

        let err = session_dashboard(
            State(Arc::clone(&state)),
            Path(Uuid::new_v4().to_string()),
            Json(DashboardRequest::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::SessionNotFound(_)));

        let err = find_session(&state, "not-a-uuid").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_sets_attachment_headers() {
        let (state, id) = state_with_upload().await;
        let request = ExportRequest {
            selections: diesel_only(),
            format: ExportFormat::Xlsx,
        };

        let response = session_export(State(state), Path(id.to_string()), Json(request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"dados_filtrados.xlsx\""
        );
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (state, id) = state_with_upload().await;

        let status = delete_session(State(Arc::clone(&state)), Path(id.to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.sessions.read().await.is_empty());

        let err = delete_session(State(state), Path(id.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_health_reports_sessions() {
        let (state, id) = state_with_upload().await;
        let Json(value) = health(State(state)).await;

        assert_eq!(value["status"], "ok");
        assert_eq!(value["sessions"], 1);
        assert_eq!(value["maxSessions"], 64);

        let active = &value["activeSessions"][0];
        assert_eq!(active["id"], id.to_string());
        assert_eq!(active["fileName"], "frota.csv");
        assert_eq!(active["rows"], 3);
        assert!(active["createdAt"].is_string());
    }

    #[test]
    fn test_router_builds() {
        let _app = router(AppState::new(ServerConfig::default()));
    }
}
