//! REST API types for the dashboard frontend.
//!
//! Wire names are camelCase; facet keys use their column labels
//! (`"Placa"`, `"Combustível"`, `"Mês"` ...).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{PipelineError, ServerError};
use crate::export::ExportFormat;
use crate::models::FacetSelections;
use crate::transform::{missing_columns, Dashboard, ProcessedLog, SourceInfo};

/// Response sent after an upload was parsed and stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Key for the follow-up dashboard/export requests
    pub session_id: Uuid,

    /// "ready", or "warning" when expected columns are missing
    pub status: &'static str,

    pub source: SourceInfo,

    /// Expected columns absent from the file; their metrics and charts are omitted
    pub missing_columns: Vec<&'static str>,

    /// Unfiltered dashboard
    pub dashboard: Dashboard,
}

impl UploadResponse {
    pub fn new(session_id: Uuid, processed: &ProcessedLog, dashboard: Dashboard) -> Self {
        let missing = missing_columns(&processed.log);

        UploadResponse {
            session_id,
            status: if missing.is_empty() { "ready" } else { "warning" },
            source: processed.source.clone(),
            missing_columns: missing,
            dashboard,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Body of `POST /api/sessions/{id}/dashboard`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    #[serde(default)]
    pub selections: FacetSelections,

    /// Include the filtered rows (the detail table)
    #[serde(default = "default_true")]
    pub include_rows: bool,
}

impl Default for DashboardRequest {
    fn default() -> Self {
        Self {
            selections: FacetSelections::new(),
            include_rows: true,
        }
    }
}

/// Body of `POST /api/sessions/{id}/export`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub selections: FacetSelections,

    #[serde(default)]
    pub format: ExportFormat,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(PipelineError::Parse(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::Export(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            crate::api::logs::log_error(self.to_string());
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExportError, ParseError};
    use crate::models::Facet;
    use crate::transform::{dashboard, process_bytes};

    #[test]
    fn test_status_codes() {
        let parse: ServerError = PipelineError::from(ParseError::EmptyFile).into();
        assert_eq!(parse.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let export: ServerError = PipelineError::from(ExportError::TooLarge("x".into())).into();
        assert_eq!(export.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            ServerError::SessionNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::BadRequest("No file provided".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_error_into_response() {
        let response = ServerError::SessionNotFound("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_dashboard_request_defaults() {
        let request: DashboardRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.selections.is_empty());
        assert!(request.include_rows);
    }

    #[test]
    fn test_dashboard_request_with_selections() {
        let request: DashboardRequest = serde_json::from_value(json!({
            "selections": {
                "Combustível": ["Diesel", "Gasolina"],
                "Placa": []
            },
            "includeRows": false
        }))
        .unwrap();

        assert!(!request.include_rows);
        assert_eq!(request.selections[&Facet::Combustivel].len(), 2);
        assert!(request.selections[&Facet::Placa].is_empty());
    }

    #[test]
    fn test_export_request_format() {
        let request: ExportRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.format, ExportFormat::Xlsx);

        let request: ExportRequest = serde_json::from_value(json!({ "format": "csv" })).unwrap();
        assert_eq!(request.format, ExportFormat::Csv);
    }

    #[test]
    fn test_upload_response_status() {
        let processed = process_bytes(Some("a.csv"), b"Placa,Litros\nAAA1A11,10\n").unwrap();
        let view = dashboard(&processed.log, &FacetSelections::new(), false);
        let response = UploadResponse::new(Uuid::new_v4(), &processed, view);

        assert_eq!(response.status, "warning");
        assert!(response.missing_columns.contains(&"Motorista"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["sessionId"].is_string());
        assert_eq!(json["source"]["rowCount"], 1);
        assert_eq!(json["dashboard"]["totalRows"], 1);
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}
