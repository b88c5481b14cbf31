// src/router.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Todas as rotas de /api (exceto health) exigem identidade verificada
    let user_routes = Router::new()
        .route("/", post(handlers::users::register))
        .route("/me", get(handlers::users::get_me))
        .route("/{email}", get(handlers::users::get_user_by_email));

    let asset_routes = Router::new().route(
        "/",
        post(handlers::assets::create_asset).get(handlers::assets::list_assets),
    );

    let request_routes = Router::new()
        .route(
            "/",
            post(handlers::requests::submit_request).get(handlers::requests::list_requests),
        )
        .route(
            "/{request_id}",
            get(handlers::requests::get_request).patch(handlers::requests::process_request),
        );

    let assignment_routes = Router::new()
        .route("/", post(handlers::assignments::assign_direct))
        .route("/me", get(handlers::assignments::list_my_assignments))
        .route("/{assignment_id}/return", post(handlers::assignments::return_assignment));

    let affiliation_routes = Router::new()
        .route("/me", get(handlers::users::list_my_affiliations))
        .route("/team", get(handlers::users::list_team));

    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/assets", asset_routes)
        .nest("/api/requests", request_routes)
        .nest("/api/assignments", assignment_routes)
        .nest("/api/affiliations", affiliation_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .merge(protected)
        .with_state(app_state)
}

