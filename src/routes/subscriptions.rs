use crate::{
    billing::{self, BillingWindow, SubscriptionFilter, format_month, parse_month},
    database::{
        NewSubscription, SubscriptionChanges, SubscriptionQuery, entities::SubscriptionRecord,
    },
    error::AppError,
    metrics,
    routes::ApiErrorResponse,
    server::Server,
};
use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Create subscription CRUD and aggregation routes
pub fn create_subscription_routes() -> Router<Server> {
    Router::new()
        .route(
            "/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route("/subscriptions/aggregate/total", get(aggregate_total))
        .route(
            "/subscriptions/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    #[schema(example = "Yandex Plus")]
    pub service_name: String,
    /// Monthly price in whole currency units
    #[schema(example = 400)]
    pub price: i64,
    pub user_id: Uuid,
    #[schema(example = "07-2025")]
    pub start_date: String,
    #[serde(default)]
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
}

/// Absent fields are left unchanged; `end_date: ""` removes the end month
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    #[schema(example = "07-2025")]
    pub start_date: String,
    pub end_date: Option<String>,
    pub created_at: NaiveDate,
}

impl From<SubscriptionRecord> for SubscriptionResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            start_date: record.start_month().to_string(),
            end_date: format_month(record.end_month()),
            id: record.id,
            service_name: record.service_name,
            price: record.price,
            user_id: record.user_id,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListSubscriptionsQuery {
    /// Only subscriptions of this user
    pub user_id: Option<String>,
    /// Exact service name
    pub service_name: Option<String>,
    /// Page size; values outside the accepted range fall back to the default
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AggregateTotalQuery {
    /// First billed month, MM-YYYY
    pub period_start: Option<String>,
    /// Last billed month, MM-YYYY
    pub period_end: Option<String>,
    pub user_id: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AggregateTotalResponse {
    pub total: u64,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid subscription id: {}", raw)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn parse_filter(
    user_id: Option<&str>,
    service_name: Option<&str>,
) -> Result<SubscriptionFilter, AppError> {
    let user_id = non_empty(user_id)
        .map(|raw| {
            Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid user_id: {}", raw)))
        })
        .transpose()?;

    Ok(SubscriptionFilter {
        user_id,
        service_name: non_empty(service_name).map(str::to_string),
    })
}

fn validate_service_name(name: &str) -> Result<String, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "service_name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_price(price: i64) -> Result<i32, AppError> {
    i32::try_from(price)
        .ok()
        .filter(|p| *p >= 0)
        .ok_or_else(|| {
            AppError::BadRequest(format!("price must be between 0 and {}, got {}", i32::MAX, price))
        })
}

fn parse_end_date(raw: &str) -> billing::BillingResult<Option<billing::YearMonth>> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_month(raw).map(Some)
    }
}

/// Create a subscription
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    summary = "Create Subscription",
    tags = ["Subscriptions"],
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid request body", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn create_subscription(
    State(server): State<Server>,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), AppError> {
    let request = json_body(payload)?;

    let new_subscription = NewSubscription {
        service_name: validate_service_name(&request.service_name)?,
        price: validate_price(request.price)?,
        user_id: request.user_id,
        start: parse_month(&request.start_date)?,
        end: request.end_date.as_deref().map(parse_month).transpose()?,
    };

    let result = server.database.subscriptions().create(&new_subscription).await;
    metrics::track_subscription_operation("create", result.is_ok());
    let record = result?;

    info!(
        subscription_id = %record.id,
        user_id = %record.user_id,
        service_name = %record.service_name,
        "Subscription created"
    );

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Get a subscription by id
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/{id}",
    summary = "Get Subscription",
    tags = ["Subscriptions"],
    params(
        ("id" = String, Path, description = "Subscription UUID")
    ),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "Subscription not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn get_subscription(
    State(server): State<Server>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let id = parse_id(&id)?;

    let result = server.database.subscriptions().find_by_id(id).await;
    metrics::track_subscription_operation("read", result.is_ok());

    let record = result?.ok_or_else(|| AppError::NotFound(format!("Subscription {} not found", id)))?;
    Ok(Json(record.into()))
}

/// List subscriptions
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions",
    summary = "List Subscriptions",
    description = "Subscriptions ordered by start month, optionally filtered by user and service",
    tags = ["Subscriptions"],
    params(ListSubscriptionsQuery),
    responses(
        (status = 200, description = "Page of subscriptions", body = Vec<SubscriptionResponse>),
        (status = 400, description = "Malformed user_id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn list_subscriptions(
    State(server): State<Server>,
    query: Result<Query<ListSubscriptionsQuery>, QueryRejection>,
) -> Result<Json<Vec<SubscriptionResponse>>, AppError> {
    let params = query_params(query)?;

    let requested_limit = params.limit.as_deref().and_then(|s| s.parse::<u64>().ok());
    let offset = params
        .offset
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let query = SubscriptionQuery {
        filter: parse_filter(params.user_id.as_deref(), params.service_name.as_deref())?,
        limit: Some(server.config.pagination.resolve_limit(requested_limit)),
        offset: Some(offset),
    };

    let result = server.database.subscriptions().list(&query).await;
    metrics::track_subscription_operation("list", result.is_ok());
    let records = result?;

    debug!(count = records.len(), ?query, "Listed subscriptions");

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Update a subscription
#[utoipa::path(
    put,
    path = "/api/v1/subscriptions/{id}",
    summary = "Update Subscription",
    tags = ["Subscriptions"],
    params(
        ("id" = String, Path, description = "Subscription UUID")
    ),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Updated subscription", body = SubscriptionResponse),
        (status = 400, description = "Invalid request", body = ApiErrorResponse),
        (status = 404, description = "Subscription not found", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn update_subscription(
    State(server): State<Server>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSubscriptionRequest>, JsonRejection>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let id = parse_id(&id)?;
    let request = json_body(payload)?;

    let changes = SubscriptionChanges {
        service_name: request
            .service_name
            .as_deref()
            .map(validate_service_name)
            .transpose()?,
        price: request.price.map(validate_price).transpose()?,
        start: request.start_date.as_deref().map(parse_month).transpose()?,
        end: request.end_date.as_deref().map(parse_end_date).transpose()?,
    };

    let result = server.database.subscriptions().update(id, &changes).await;
    metrics::track_subscription_operation("update", result.is_ok());
    let record = result?;

    info!(subscription_id = %record.id, "Subscription updated");

    Ok(Json(record.into()))
}

/// Delete a subscription
#[utoipa::path(
    delete,
    path = "/api/v1/subscriptions/{id}",
    summary = "Delete Subscription",
    description = "Deleting an unknown id also succeeds",
    tags = ["Subscriptions"],
    params(
        ("id" = String, Path, description = "Subscription UUID")
    ),
    responses(
        (status = 204, description = "Subscription deleted"),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn delete_subscription(
    State(server): State<Server>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;

    let result = server.database.subscriptions().delete(id).await;
    metrics::track_subscription_operation("delete", result.is_ok());
    let deleted = result?;

    info!(subscription_id = %id, deleted, "Subscription delete requested");

    Ok(StatusCode::NO_CONTENT)
}

/// Total cost of subscriptions over a billing window
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/aggregate/total",
    summary = "Aggregate Total Cost",
    description = "Sum of price times billed months for every matching subscription overlapping the window",
    tags = ["Subscriptions"],
    params(AggregateTotalQuery),
    responses(
        (status = 200, description = "Total cost", body = AggregateTotalResponse),
        (status = 400, description = "Missing or invalid period, or malformed user_id", body = ApiErrorResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    )
)]
pub async fn aggregate_total(
    State(server): State<Server>,
    query: Result<Query<AggregateTotalQuery>, QueryRejection>,
) -> Result<Json<AggregateTotalResponse>, AppError> {
    let params = query_params(query)?;

    let (Some(start), Some(end)) = (
        non_empty(params.period_start.as_deref()),
        non_empty(params.period_end.as_deref()),
    ) else {
        return Err(AppError::BadRequest(
            "period_start and period_end are required".to_string(),
        ));
    };

    let window = BillingWindow::new(parse_month(start)?, parse_month(end)?)?;
    let filter = parse_filter(params.user_id.as_deref(), params.service_name.as_deref())?;

    let started = Instant::now();
    let records = server.database.subscriptions().find_matching(&filter).await?;
    let total = billing::total(&records, &window, |record: &SubscriptionRecord| {
        filter.matches(record.user_id, &record.service_name)
    });
    metrics::track_aggregate_query(records.len(), started.elapsed());

    debug!(
        period_start = %window.start(),
        period_end = %window.end(),
        scanned = records.len(),
        total,
        "Aggregated subscription cost"
    );

    Ok(Json(AggregateTotalResponse { total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServerBuilder;
    use axum::{body::Body, http::Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let server = TestServerBuilder::new().build().await;
        Router::new()
            .nest("/api/v1", create_subscription_routes())
            .with_state(server)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_create_and_fetch_subscription() {
        let app = test_app().await;
        let user_id = Uuid::new_v4();

        let (status, created) = send(
            &app,
            "POST",
            "/api/v1/subscriptions",
            Some(json!({
                "service_name": "Yandex Plus",
                "price": 400,
                "user_id": user_id,
                "start_date": "07-2025"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["start_date"], "07-2025");
        assert_eq!(created["end_date"], Value::Null);
        assert_eq!(created["user_id"], user_id.to_string());

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = send(&app, "GET", &format!("/api/v1/subscriptions/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let app = test_app().await;
        let user_id = Uuid::new_v4();

        let cases = [
            json!({"service_name": "A", "price": 1, "user_id": user_id, "start_date": "2025-07"}),
            json!({"service_name": "A", "price": 1, "user_id": user_id, "start_date": "13-2025"}),
            json!({"service_name": "A", "price": -1, "user_id": user_id, "start_date": "07-2025"}),
            json!({"service_name": " ", "price": 1, "user_id": user_id, "start_date": "07-2025"}),
            json!({"service_name": "A", "price": 1, "user_id": "nope", "start_date": "07-2025"}),
            json!({"service_name": "A", "price": 1, "user_id": user_id, "start_date": "07-2025", "end_date": "7-2025"}),
            json!({"price": 1, "user_id": user_id, "start_date": "07-2025"}),
        ];

        for body in cases {
            let (status, json) = send(&app, "POST", "/api/v1/subscriptions", Some(body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert!(json["message"].is_string());
        }
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_ids() {
        let app = test_app().await;

        let (status, _) = send(&app, "GET", "/api/v1/subscriptions/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = format!("/api/v1/subscriptions/{}", Uuid::new_v4());
        let (status, json) = send(&app, "GET", &unknown, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Resource not found");

        let (status, _) = send(&app, "PUT", &unknown, Some(json!({"price": 5}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(&app, "DELETE", &unknown, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(json, Value::Null);
    }

    #[tokio::test]
    async fn test_aggregate_requires_valid_window() {
        let app = test_app().await;

        let (status, _) = send(&app, "GET", "/api/v1/subscriptions/aggregate/total", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "GET",
            "/api/v1/subscriptions/aggregate/total?period_start=01-2024",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(
            &app,
            "GET",
            "/api/v1/subscriptions/aggregate/total?period_start=05-2024&period_end=01-2024",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid period");

        let (status, json) = send(
            &app,
            "GET",
            "/api/v1/subscriptions/aggregate/total?period_start=01-2024&period_end=2024-05",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid date format");

        let (status, _) = send(
            &app,
            "GET",
            "/api/v1/subscriptions/aggregate/total?period_start=01-2024&period_end=05-2024&user_id=xyz",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_aggregate_total_over_window() {
        let app = test_app().await;
        let user_id = Uuid::new_v4();

        for body in [
            json!({"service_name": "Netflix", "price": 100, "user_id": user_id, "start_date": "01-2024", "end_date": "06-2024"}),
            json!({"service_name": "Spotify", "price": 50, "user_id": user_id, "start_date": "03-2024"}),
        ] {
            let (status, _) = send(&app, "POST", "/api/v1/subscriptions", Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, json) = send(
            &app,
            "GET",
            "/api/v1/subscriptions/aggregate/total?period_start=01-2024&period_end=04-2024",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"total": 500}));
    }

    #[test]
    fn test_validate_price_bounds() {
        assert_eq!(validate_price(0).unwrap(), 0);
        assert_eq!(validate_price(i64::from(i32::MAX)).unwrap(), i32::MAX);
        assert!(validate_price(-1).is_err());
        assert!(validate_price(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_parse_filter_treats_empty_as_absent() {
        let filter = parse_filter(Some(""), Some("")).unwrap();
        assert!(filter.is_empty());
        assert!(parse_filter(Some("garbage"), None).is_err());
    }
}
