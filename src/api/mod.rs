//! HTTP layer: query endpoint, subscription upgrade route, system routes.

pub mod handlers;
pub mod hooks;
pub mod request_options;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::config::GatewayConfig;
use crate::ws::handler::subscription_handler;

/// OpenAPI description of the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(handlers::query::graphql_handler, handlers::system::health_handler),
    tags(
        (name = "GraphQL", description = "Query execution over HTTP"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router: queries, subscriptions and system routes.
pub fn build_router(config: &GatewayConfig) -> Router<AppState> {
    let query = get(handlers::query::graphql_handler).post(handlers::query::graphql_handler);

    let router = Router::new()
        .route(&config.graphql_path, query)
        .route(&config.subscriptions_path, get(subscription_handler))
        .merge(handlers::system::routes())
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
