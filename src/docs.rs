// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users ---
        handlers::users::register,
        handlers::users::get_me,
        handlers::users::get_user_by_email,

        // --- Affiliations ---
        handlers::users::list_my_affiliations,
        handlers::users::list_team,

        // --- Assets ---
        handlers::assets::create_asset,
        handlers::assets::list_assets,

        // --- Requests ---
        handlers::requests::submit_request,
        handlers::requests::list_requests,
        handlers::requests::get_request,
        handlers::requests::process_request,

        // --- Assignments ---
        handlers::assignments::assign_direct,
        handlers::assignments::list_my_assignments,
        handlers::assignments::return_assignment,
    ),
    components(
        schemas(
            // --- Users ---
            models::user::UserRole,
            models::user::User,
            models::auth::CallerIdentity,
            handlers::users::RegisterPayload,

            // --- Affiliations ---
            models::affiliation::AffiliationStatus,
            models::affiliation::Affiliation,

            // --- Assets ---
            models::asset::Asset,
            models::asset::AssignmentStatus,
            models::asset::Assignment,
            handlers::assets::CreateAssetPayload,

            // --- Requests ---
            models::request::RequestStatus,
            models::request::ProcessAction,
            models::request::AssetRequest,
            services::workflow_service::ProcessOutcome,
            handlers::requests::SubmitRequestPayload,
            handlers::requests::SubmitRequestResponse,
            handlers::requests::ProcessRequestPayload,
            handlers::requests::ProcessRequestResponse,

            // --- Assignments ---
            handlers::assignments::DirectAssignPayload,
            handlers::assignments::AssignmentResponse,
        )
    ),
    tags(
        (name = "Users", description = "Registro e Perfil"),
        (name = "Affiliations", description = "Vínculos Funcionário/Empresa"),
        (name = "Assets", description = "Catálogo de Ativos do RH"),
        (name = "Requests", description = "Pedidos de Ativos e Aprovação"),
        (name = "Assignments", description = "Atribuições e Devoluções")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
