use crate::server::Server;
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Subscription Tracker API",
        version = "1.0.0",
        description = "Monthly subscription records and cost aggregation over billing windows"
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::subscriptions::create_subscription,
        crate::routes::subscriptions::get_subscription,
        crate::routes::subscriptions::list_subscriptions,
        crate::routes::subscriptions::update_subscription,
        crate::routes::subscriptions::delete_subscription,
        crate::routes::subscriptions::aggregate_total,
    ),
    components(
        schemas(
            crate::routes::ApiErrorResponse,
            crate::routes::health::HealthCheckQuery,
            crate::health::HealthResponse,
            crate::health::HealthStatus,
            crate::health::HealthCheckResult,
            crate::health::HealthSummary,
            crate::routes::subscriptions::CreateSubscriptionRequest,
            crate::routes::subscriptions::UpdateSubscriptionRequest,
            crate::routes::subscriptions::SubscriptionResponse,
            crate::routes::subscriptions::ListSubscriptionsQuery,
            crate::routes::subscriptions::AggregateTotalQuery,
            crate::routes::subscriptions::AggregateTotalResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Subscriptions", description = "Subscription records and cost aggregation"),
    )
)]
pub struct ApiDoc;

/// Create documentation routes
pub fn create_docs_routes() -> Router<Server> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// Serve the OpenAPI document as JSON
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
