//! Component health checks exposed on `/health`

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: Option<String>,
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
    pub duration_ms: Option<u64>,
}

impl HealthCheckResult {
    fn with_status(status: HealthStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            details: None,
            duration_ms: None,
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy, None)
    }

    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self::healthy().with_details(details)
    }

    pub fn degraded(message: String) -> Self {
        Self::with_status(HealthStatus::Degraded, Some(message))
    }

    pub fn unhealthy(message: String) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message))
    }

    pub fn unhealthy_with_details(message: String, details: serde_json::Value) -> Self {
        Self::unhealthy(message).with_details(details)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// The name of this health check component
    fn name(&self) -> &str;

    /// Perform the health check
    async fn check(&self) -> HealthCheckResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: BTreeMap<String, HealthCheckResult>,
    pub summary: HealthSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HealthSummary {
    pub total_checks: usize,
    pub healthy_count: usize,
    pub degraded_count: usize,
    pub unhealthy_count: usize,
    pub total_duration_ms: u64,
}

/// Reports degraded while schema migrations are still pending
pub struct MigrationsChecker {
    connection: DatabaseConnection,
}

impl MigrationsChecker {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl HealthChecker for MigrationsChecker {
    fn name(&self) -> &str {
        "migrations"
    }

    async fn check(&self) -> HealthCheckResult {
        use crate::database::migration::Migrator;
        use sea_orm_migration::MigratorTrait;

        match Migrator::get_pending_migrations(&self.connection).await {
            Ok(pending) if pending.is_empty() => HealthCheckResult::healthy(),
            Ok(pending) => {
                let names: Vec<String> = pending.iter().map(|m| m.name().to_string()).collect();
                HealthCheckResult::degraded(format!("{} pending migration(s)", names.len()))
                    .with_details(serde_json::json!({ "pending": names }))
            }
            Err(e) => HealthCheckResult::unhealthy(format!("Failed to read migration status: {}", e)),
        }
    }
}

#[derive(Default)]
pub struct HealthService {
    checkers: RwLock<BTreeMap<String, Arc<dyn HealthChecker>>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a health checker for a specific component
    pub async fn register(&self, checker: Arc<dyn HealthChecker>) {
        let name = checker.name().to_string();
        self.checkers.write().await.insert(name, checker);
    }

    pub async fn registered_checkers(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }

    /// Run checks selected by `filter`: `"all"`, a component name, or none
    pub async fn check_health(&self, filter: Option<&str>) -> HealthResponse {
        let checkers = self.checkers.read().await;
        let selected: Vec<_> = match filter {
            Some("all") => checkers.iter().collect(),
            Some(name) => checkers.iter().filter(|(n, _)| n.as_str() == name).collect(),
            None => Vec::new(),
        };

        let mut checks = BTreeMap::new();
        let mut summary = HealthSummary::default();
        for (name, checker) in selected {
            let start = Instant::now();
            let result = checker.check().await;
            let duration = start.elapsed().as_millis() as u64;

            summary.total_duration_ms += duration;
            match result.status {
                HealthStatus::Healthy => summary.healthy_count += 1,
                HealthStatus::Degraded => summary.degraded_count += 1,
                HealthStatus::Unhealthy => summary.unhealthy_count += 1,
            }
            checks.insert(name.clone(), result.with_duration(duration));
        }
        summary.total_checks = checks.len();

        // Worst status wins
        let status = if summary.unhealthy_count > 0 {
            HealthStatus::Unhealthy
        } else if summary.degraded_count > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
            summary,
        }
    }
}
