//! Route composition (§6 "External interfaces").

pub mod health;
pub mod lookup;
pub mod search;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::telemetry::metrics_handler;

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl IntoResponse {
    axum::Json(<crate::openapi::ApiDoc as utoipa::OpenApi>::openapi())
}

/// Assemble the full application router: lookup, search, health, metrics,
/// and (when the `openapi`/`swagger-ui` features are enabled) the OpenAPI
/// document and Swagger UI (§6).
pub fn create_api_router() -> Router<AppState> {
    let router = Router::new()
        .merge(lookup::router())
        .merge(search::router())
        .merge(health::router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", crate::openapi::ApiDoc::openapi()))
    };

    router
}
