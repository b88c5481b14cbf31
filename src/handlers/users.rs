// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedCaller, i18n::Locale},
    models::{affiliation::Affiliation, user::{User, UserRole}},
    services::user_service::RegisterInput,
};

// ---
// Payload: Register
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_company", skip_on_field_errors = false))]
pub struct RegisterPayload {
    pub role: UserRole,

    #[validate(length(min = 1, max = 120, message = "O nome da empresa deve ter entre 1 e 120 caracteres."))]
    pub company_name: Option<String>,

    #[validate(url(message = "O logo deve ser uma URL válida."))]
    pub company_logo: Option<String>,

    #[validate(range(min = 0, max = 10000, message = "O limite do pacote deve estar entre 0 e 10000."))]
    pub package_limit: Option<i32>,
}

// RH sem empresa não faz sentido
fn validate_company(payload: &RegisterPayload) -> Result<(), ValidationError> {
    if payload.role == UserRole::Hr && payload.company_name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        let mut err = ValidationError::new("required");
        err.message = Some("O campo 'companyName' é obrigatório para RH.".into());
        return Err(err);
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "Usuário registrado", body = User),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let user = app_state
        .user_service
        .register(
            &caller,
            RegisterInput {
                role: payload.role,
                company_name: payload.company_name.map(|n| n.trim().to_string()),
                company_logo: payload.company_logo,
                package_limit: payload.package_limit,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Dados do usuário logado", body = User),
        (status = 404, description = "Chamador ainda não registrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .get_by_email(&caller.email)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{email}",
    tag = "Users",
    params(("email" = String, Path, description = "E-mail do usuário")),
    responses(
        (status = 200, description = "Usuário e seu papel", body = User),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user_by_email(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .user_service
        .get_by_email(&email)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(user)))
}

// ---
// Afiliações
// ---
#[utoipa::path(
    get,
    path = "/api/affiliations/me",
    tag = "Affiliations",
    responses((status = 200, description = "Empresas às quais o funcionário está afiliado", body = [Affiliation])),
    security(("api_jwt" = []))
)]
pub async fn list_my_affiliations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let affiliations = app_state
        .user_service
        .list_my_affiliations(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(affiliations)))
}

#[utoipa::path(
    get,
    path = "/api/affiliations/team",
    tag = "Affiliations",
    responses((status = 200, description = "Funcionários ativos do RH", body = [Affiliation])),
    security(("api_jwt" = []))
)]
pub async fn list_team(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Result<impl IntoResponse, ApiError> {
    let team = app_state
        .user_service
        .list_team(&caller)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(team)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(role: UserRole, company_name: Option<&str>) -> RegisterPayload {
        RegisterPayload {
            role,
            company_name: company_name.map(str::to_string),
            company_logo: None,
            package_limit: None,
        }
    }

    #[test]
    fn hr_requires_company_name() {
        assert!(payload(UserRole::Hr, None).validate().is_err());
        assert!(payload(UserRole::Hr, Some("  ")).validate().is_err());
        assert!(payload(UserRole::Hr, Some("Acme")).validate().is_ok());
        assert!(payload(UserRole::Employee, None).validate().is_ok());
    }
}
