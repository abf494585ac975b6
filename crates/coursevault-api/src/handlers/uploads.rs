use crate::auth::{AuthPrincipal, ClientInfo};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use coursevault_core::models::{
    CreateUploadSessionRequest, CreateUploadSessionResponse, UploadCompleteResponse,
};
use coursevault_core::AppError;
use std::sync::Arc;

/// Create an upload session and receive a signed upload token
#[utoipa::path(
    post,
    path = "/api/v1/files/upload/session",
    tag = "uploads",
    request_body = CreateUploadSessionRequest,
    responses(
        (status = 201, description = "Upload session created", body = CreateUploadSessionResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 413, description = "Declared size too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, ctx, request),
    fields(operation = "create_upload_session")
)]
pub async fn create_upload_session(
    AuthPrincipal(principal): AuthPrincipal,
    ClientInfo(ctx): ClientInfo,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUploadSessionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let owner = principal.user_id.ok_or_else(|| {
        AppError::Unauthorized("Authentication required to upload files".to_string())
    })?;

    let session = state
        .facade
        .create_upload_session(owner, request, ctx.ip_address)
        .await?;

    let response = CreateUploadSessionResponse {
        session_id: session.id,
        upload_url: format!("/api/v1/files/upload/{}", session.upload_token),
        upload_token: session.upload_token,
        expires_at: session.expires_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Upload the file bytes against a previously issued token
#[utoipa::path(
    post,
    path = "/api/v1/files/upload/{upload_token}",
    tag = "uploads",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Upload completed", body = UploadCompleteResponse),
        (status = 400, description = "Size mismatch", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
        (status = 409, description = "Session already consumed", body = ErrorResponse),
        (status = 410, description = "Token or session expired", body = ErrorResponse),
        (status = 500, description = "Storage failure (retryable)", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, ctx, upload_token, body),
    fields(operation = "upload_file", body_len = body.len())
)]
pub async fn upload_file(
    AuthPrincipal(principal): AuthPrincipal,
    ClientInfo(ctx): ClientInfo,
    State(state): State<Arc<AppState>>,
    Path(upload_token): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let owner = principal.user_id.ok_or_else(|| {
        AppError::Unauthorized("Authentication required to upload files".to_string())
    })?;

    let file = state
        .facade
        .finalize_upload(&upload_token, &body, owner, ctx)
        .await?;

    let response = UploadCompleteResponse {
        file_id: file.id,
        file_name: file.name,
        file_type: file.file_type,
        file_size: file.file_size,
        access_level: file.access_level,
        checksum: file.checksum.unwrap_or_default(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}
