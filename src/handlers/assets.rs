// src/handlers/assets.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedCaller, i18n::Locale},
    models::asset::Asset,
    services::asset_service::CreateAssetInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetPayload {
    #[validate(length(min = 1, max = 120, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, max = 60, message = "O tipo é obrigatório."))]
    #[schema(example = "returnable")]
    pub asset_type: String,

    #[validate(url(message = "A imagem deve ser uma URL válida."))]
    pub image: Option<String>,

    #[validate(range(min = 0, message = "A quantidade não pode ser negativa."))]
    pub quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/assets",
    tag = "Assets",
    request_body = CreateAssetPayload,
    responses(
        (status = 201, description = "Ativo cadastrado", body = Asset),
        (status = 403, description = "Apenas RH pode cadastrar ativos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_asset(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<CreateAssetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let asset = app_state
        .asset_service
        .create_asset(
            &caller,
            CreateAssetInput {
                name: payload.name,
                asset_type: payload.asset_type,
                image: payload.image,
                quantity: payload.quantity,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(asset)))
}

#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "Assets",
    responses((status = 200, description = "Ativos da empresa do chamador", body = [Asset])),
    security(("api_jwt" = []))
)]
pub async fn list_assets(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let assets = app_state
        .asset_service
        .list_assets(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(assets)))
}
