use crate::auth::{AuthPrincipal, ClientInfo};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coursevault_core::models::{
    AccessAction, AccessDeniedResponse, AccessLogEntry, FileAccessResponse, FileSummary,
};
use coursevault_core::{AppError, DenyReason};
use coursevault_services::AccessOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    /// Requested action; defaults by file type (video streams, else downloads)
    pub action: Option<AccessAction>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFileResponse {
    pub file_id: Uuid,
    pub deleted: bool,
}

fn deny_status(reason: DenyReason) -> StatusCode {
    match reason {
        DenyReason::NotFound => StatusCode::NOT_FOUND,
        DenyReason::SuspiciousActivity => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::FORBIDDEN,
    }
}

/// Get a time-limited signed URL for a file
#[utoipa::path(
    get,
    path = "/api/v1/files/{file_id}/access",
    tag = "files",
    params(
        ("file_id" = Uuid, Path, description = "File ID"),
        ("action" = Option<String>, Query, description = "read | download | stream | edit")
    ),
    responses(
        (status = 200, description = "Access granted", body = FileAccessResponse),
        (status = 403, description = "Access denied", body = AccessDeniedResponse),
        (status = 404, description = "File not found", body = AccessDeniedResponse),
        (status = 429, description = "Access temporarily restricted", body = AccessDeniedResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, ctx),
    fields(file_id = %file_id, operation = "file_access")
)]
pub async fn get_file_access(
    AuthPrincipal(principal): AuthPrincipal,
    ClientInfo(ctx): ClientInfo,
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<AccessQuery>,
) -> Result<Response, HttpAppError> {
    let outcome = state
        .facade
        .request_access(file_id, principal, query.action, ctx, None)
        .await?;

    match outcome {
        AccessOutcome::Granted(access) => {
            let response = FileAccessResponse {
                file_id: access.file.id,
                file_name: access.file.name.clone(),
                file_type: access.file.file_type,
                file_size: access.file.file_size,
                signed_url: access.signed_url,
                expires_in: access.expires_in,
                access_type: access.action,
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        AccessOutcome::Denied(reason) => Ok((
            deny_status(reason),
            Json(AccessDeniedResponse {
                denied: true,
                reason,
            }),
        )
            .into_response()),
    }
}

/// List the authenticated user's active files
#[utoipa::path(
    get,
    path = "/api/v1/files/mine",
    tag = "files",
    responses(
        (status = 200, description = "Files retrieved", body = [FileSummary]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_my_files(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileSummary>>, HttpAppError> {
    let user_id = principal.user_id.ok_or_else(|| {
        AppError::Unauthorized("Authentication required to list files".to_string())
    })?;

    let files = state.facade.list_files(user_id).await?;
    Ok(Json(files.into_iter().map(FileSummary::from).collect()))
}

/// Soft-delete a file (owner or admin)
#[utoipa::path(
    delete,
    path = "/api/v1/files/{file_id}",
    tag = "files",
    params(("file_id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, ctx),
    fields(file_id = %file_id, operation = "file_delete")
)]
pub async fn delete_file(
    AuthPrincipal(principal): AuthPrincipal,
    ClientInfo(ctx): ClientInfo,
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<DeleteFileResponse>, HttpAppError> {
    state.facade.delete_file(file_id, principal, ctx).await?;

    Ok(Json(DeleteFileResponse {
        file_id,
        deleted: true,
    }))
}

/// Audit trail for a file (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/files/{file_id}/logs",
    tag = "files",
    params(
        ("file_id" = Uuid, Path, description = "File ID"),
        ("limit" = Option<i64>, Query, description = "Max entries (default 50, cap 500)")
    ),
    responses(
        (status = 200, description = "Audit log entries", body = [AccessLogEntry]),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn list_file_access_logs(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<AccessLogEntry>>, HttpAppError> {
    let entries = state
        .facade
        .list_access_logs(file_id, principal, query.limit.unwrap_or(50))
        .await?;
    Ok(Json(entries))
}
