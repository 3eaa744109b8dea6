pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod evaluator;
pub mod extractors;
pub mod handlers;
pub mod live;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prompt Arena API",
        version = "1.0.0",
        description = "API for the prompt engineering competition platform"
    ),
    tags(
        (name = "Auth", description = "Identity and role lookup"),
        (name = "Users", description = "Profiles and role assignment"),
        (name = "Competitions", description = "Competition CRUD operations"),
        (name = "Challenges", description = "Challenges within a competition"),
        (name = "Participants", description = "Registration and the participant dashboard"),
        (name = "Batches", description = "Level-2 batches and their members"),
        (name = "Submissions", description = "Prompt submissions and the live feed"),
        (name = "Judging", description = "Judge scores and participant locking"),
        (name = "Leaderboard", description = "Published rankings and per-participant results"),
        (name = "Evaluations", description = "LLM score cards and the evaluation browser"),
        (name = "Daily Challenges", description = "Daily challenges, votes and global totals"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
