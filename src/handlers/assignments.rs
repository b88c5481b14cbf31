// src/handlers/assignments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedCaller, i18n::Locale},
    models::asset::Assignment,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectAssignPayload {
    #[validate(email(message = "O e-mail do funcionário é inválido."))]
    pub employee_email: String,
    pub asset_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub message: String,
    pub assignment: Assignment,
}

#[utoipa::path(
    post,
    path = "/api/assignments",
    tag = "Assignments",
    request_body = DirectAssignPayload,
    responses(
        (status = 201, description = "Ativo atribuído", body = AssignmentResponse),
        (status = 403, description = "Chamador não é RH"),
        (status = 422, description = "Funcionário não afiliado, ativo de outra empresa ou sem estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_direct(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<DirectAssignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let assignment = app_state
        .workflow_service
        .assign_asset_direct(&caller, &payload.employee_email, payload.asset_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let message = if locale.0 == "pt" { "Ativo atribuído." } else { "Asset assigned." };
    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse { message: message.to_string(), assignment }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/assignments/me",
    tag = "Assignments",
    responses((status = 200, description = "Ativos em posse do chamador (e devolvidos)", body = [Assignment])),
    security(("api_jwt" = []))
)]
pub async fn list_my_assignments(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let assignments = app_state
        .asset_service
        .list_my_assignments(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(assignments)))
}

#[utoipa::path(
    post,
    path = "/api/assignments/{assignment_id}/return",
    tag = "Assignments",
    params(("assignment_id" = Uuid, Path, description = "ID da Atribuição")),
    responses(
        (status = 200, description = "Ativo devolvido, estoque restaurado", body = AssignmentResponse),
        (status = 403, description = "Chamador não está com o ativo"),
        (status = 404, description = "Atribuição não encontrada"),
        (status = 409, description = "Já devolvido")
    ),
    security(("api_jwt" = []))
)]
pub async fn return_assignment(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let assignment = app_state
        .workflow_service
        .return_assignment(&caller, assignment_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let message = if locale.0 == "pt" { "Ativo devolvido." } else { "Asset returned." };
    Ok((
        StatusCode::OK,
        Json(AssignmentResponse { message: message.to_string(), assignment }),
    ))
}
