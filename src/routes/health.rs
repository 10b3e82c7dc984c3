use crate::{error::AppError, health::HealthResponse, server::Server};
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HealthCheckQuery {
    /// `all` or the name of a single checker, e.g. `database`
    #[serde(default)]
    pub check: Option<String>,
}

/// Create health check routes
pub fn create_health_routes() -> Router<Server> {
    Router::new().route("/", get(health_check))
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "Health Check",
    description = "Service health, optionally running registered checkers",
    tags = ["Health"],
    params(HealthCheckQuery),
    responses(
        (status = 200, description = "Health report", body = HealthResponse),
        (status = 500, description = "Internal server error", body = crate::routes::ApiErrorResponse)
    )
)]
pub async fn health_check(
    State(server): State<Server>,
    Query(params): Query<HealthCheckQuery>,
) -> Result<Json<HealthResponse>, AppError> {
    let health_response = server
        .health_service
        .check_health(params.check.as_deref())
        .await;
    Ok(Json(health_response))
}
