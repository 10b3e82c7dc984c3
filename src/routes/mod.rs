pub mod docs;
pub mod health;
pub mod subscriptions;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use docs::create_docs_routes;
pub use health::create_health_routes;
pub use subscriptions::create_subscription_routes;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error kind, e.g. "Bad request"
    pub error: String,
    /// Human-readable detail
    pub message: String,
}
