//! HTTP request handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::export::{ErrorKind, ExportError, ExportRequest};

/// Query parameters of `GET /funding-files/export`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub team_id: Option<String>,
    pub organization_id: Option<String>,
    pub query: Option<String>,
}

/// Handle GET /funding-files/export.
///
/// Responds with the archive as an attachment named
/// `funding-files-{YYYY-MM-DD}.zip`.
///
/// The caller is authenticated before the query string is looked at, so a
/// malformed query from an anonymous caller is still a 401.
///
/// # Errors
///
/// Returns `AppError` carrying the status that matches the export failure.
pub async fn handle_export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let identity = state.service.authenticate(bearer_token(&headers)).await?;
    let Query(params) =
        query.map_err(|rejection| ExportError::InvalidRequest(rejection.body_text()))?;

    tracing::debug!(
        user = %identity.user_id,
        team = ?params.team_id,
        organization = ?params.organization_id,
        "Handling export request"
    );

    let request = ExportRequest {
        team_id: params.team_id,
        organization_id: params.organization_id,
        query: params.query,
    };

    // Dropping the export future on timeout discards everything fetched so far
    let archive = tokio::time::timeout(
        state.export_timeout,
        state.service.export(&identity, request),
    )
    .await
    .map_err(|_| ExportError::TimedOut {
        after: state.export_timeout,
    })??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", archive.file_name),
            ),
        ],
        archive.data,
    )
        .into_response())
}

/// Handle GET /health.
pub async fn handle_health() -> &'static str {
    "ok"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Application-level error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError(pub ExportError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::UpstreamFailure => match self.0 {
                ExportError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "export failed");
        } else {
            tracing::debug!(error = %self.0, "export rejected");
        }

        let body = Json(ErrorBody {
            error: self.0.kind().as_str().to_string(),
            message: self.0.public_message(),
        });

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        Self(err)
    }
}
