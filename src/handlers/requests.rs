// src/handlers/requests.rs

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
    models::request::{AssetRequest, ProcessAction},
    services::workflow_service::{ProcessOutcome, SubmitRequestInput},
};

// ---
// Payload: SubmitRequest
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestPayload {
    pub asset_id: Uuid,

    #[validate(length(min = 1, max = 120, message = "O nome do ativo é obrigatório."))]
    pub asset_name: String,

    #[validate(length(min = 1, max = 60, message = "O tipo do ativo é obrigatório."))]
    pub asset_type: String,

    #[validate(email(message = "O e-mail do RH é inválido."))]
    pub hr_email: String,

    #[validate(length(min = 1, max = 120, message = "O nome da empresa é obrigatório."))]
    pub company_name: String,

    #[validate(length(max = 500, message = "A observação pode ter no máximo 500 caracteres."))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestResponse {
    pub request_id: Uuid,
}

// ---
// Payload: ProcessRequest
// ---
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRequestPayload {
    pub action: ProcessAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessRequestResponse {
    pub message: String,
    pub outcome: ProcessOutcome,
}

#[utoipa::path(
    post,
    path = "/api/requests",
    tag = "Requests",
    request_body = SubmitRequestPayload,
    responses(
        (status = 201, description = "Pedido criado como 'pending'", body = SubmitRequestResponse),
        (status = 401, description = "Identidade ausente ou inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_request(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<SubmitRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let request_id = app_state
        .workflow_service
        .submit_request(
            &caller,
            SubmitRequestInput {
                asset_id: payload.asset_id,
                asset_name: payload.asset_name,
                asset_type: payload.asset_type,
                hr_email: payload.hr_email,
                company_name: payload.company_name,
                note: payload.note,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(SubmitRequestResponse { request_id })))
}

#[utoipa::path(
    get,
    path = "/api/requests",
    tag = "Requests",
    responses((status = 200, description = "Pedidos endereçados ao RH, mais recentes primeiro", body = [AssetRequest])),
    security(("api_jwt" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let requests = app_state
        .workflow_service
        .list_requests_for_tenant(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(requests)))
}

#[utoipa::path(
    get,
    path = "/api/requests/{request_id}",
    tag = "Requests",
    params(("request_id" = Uuid, Path, description = "ID do Pedido")),
    responses(
        (status = 200, description = "Pedido", body = AssetRequest),
        (status = 403, description = "Nem solicitante nem RH destinatário"),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_request(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = app_state
        .workflow_service
        .get_request(&caller, request_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(request)))
}

#[utoipa::path(
    patch,
    path = "/api/requests/{request_id}",
    tag = "Requests",
    request_body = ProcessRequestPayload,
    params(("request_id" = Uuid, Path, description = "ID do Pedido")),
    responses(
        (status = 200, description = "Pedido aprovado ou rejeitado", body = ProcessRequestResponse),
        (status = 403, description = "Chamador não é o RH destinatário"),
        (status = 404, description = "Pedido não encontrado"),
        (status = 409, description = "Pedido já processado"),
        (status = 422, description = "Vetado: sem estoque ou sem vagas no pacote")
    ),
    security(("api_jwt" = []))
)]
pub async fn process_request(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ProcessRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .workflow_service
        .process_request(&caller, request_id, payload.action)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let message = match (&outcome, locale.0.as_str()) {
        (ProcessOutcome::Approved { .. }, "pt") => "Pedido aprovado.",
        (ProcessOutcome::Approved { .. }, _) => "Request approved.",
        (ProcessOutcome::Rejected, "pt") => "Pedido rejeitado.",
        (ProcessOutcome::Rejected, _) => "Request rejected.",
    };

    Ok((
        StatusCode::OK,
        Json(ProcessRequestResponse { message: message.to_string(), outcome }),
    ))
}
