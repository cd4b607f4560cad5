use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::request::from_routing_table;
use crate::routing::{MappingRequest, UpdateError};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub external_ports: usize,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// `POST /v0/external_ports`
pub async fn map_external_ports(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id(&headers);

    let requests: Vec<MappingRequest> = match serde_json::from_slice(&body) {
        Ok(requests) => requests,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to decode mapping request");
            metrics::record_mapping_request("invalid");
            return error_response(StatusCode::BAD_REQUEST, format!("invalid JSON: {}", e));
        }
    };

    tracing::debug!(request_id = %request_id, requests = requests.len(), "Mapping external ports");

    // Table lock + file I/O are blocking.
    let updater = state.updater.clone();
    let result = tokio::task::spawn_blocking(move || updater.update(&requests)).await;

    match result {
        Ok(Ok(changed)) => {
            metrics::record_mapping_request(if changed { "changed" } else { "unchanged" });
            (StatusCode::OK, Json(MapResponse { changed })).into_response()
        }
        Ok(Err(UpdateError::Invalid(e))) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected mapping request");
            metrics::record_mapping_request("invalid");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to apply mapping request");
            metrics::record_mapping_request("error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Mapping update task failed");
            metrics::record_mapping_request("error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "update task failed")
        }
    }
}

/// `GET /v0/external_ports`
pub async fn list_external_ports(State(state): State<AppState>) -> Json<Vec<MappingRequest>> {
    Json(from_routing_table(&state.updater.snapshot()))
}

/// `GET /status`
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        external_ports: state.updater.snapshot().len(),
    })
}
