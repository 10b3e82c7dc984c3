pub mod config;
pub mod middleware;

use crate::{
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl},
    error::AppError,
    health::{HealthService, MigrationsChecker},
    metrics,
    routes::{create_docs_routes, create_health_routes, create_subscription_routes},
    server::middleware::request_response_logger,
    shutdown::ShutdownCoordinator,
    utils::request_id::request_id_middleware,
};
use axum::{Router, middleware::from_fn};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub database: Arc<dyn DatabaseManager>,
    pub health_service: Arc<HealthService>,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        // Initialize metrics if enabled
        if config.metrics.enabled {
            if let Err(e) = metrics::init_metrics_with_port(config.metrics.port) {
                error!(
                    "Failed to start metrics server on port {}: {}",
                    config.metrics.port, e
                );
                return Err(AppError::Internal(format!(
                    "Failed to start metrics server: {}",
                    e
                )));
            }
        }

        // Initialize database
        let database_impl = Arc::new(
            DatabaseManagerImpl::new_from_config(&config)
                .await
                .map_err(AppError::Database)?,
        );
        let database: Arc<dyn DatabaseManager> = database_impl.clone();

        // Initialize health service
        let health_service = Arc::new(HealthService::new());
        health_service
            .register(Arc::new(MigrationsChecker::new(
                database_impl.connection.clone(),
            )))
            .await;
        health_service.register(database_impl).await;

        Ok(Self {
            config: Arc::new(config),
            database,
            health_service,
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
        })
    }

    pub async fn run(&self) -> Result<(), AppError> {
        if self.config.database.migration_on_startup {
            info!("Running database migrations");
            self.database.migrate().await.map_err(AppError::Database)?;
            info!("Database migrations completed successfully");
        }

        let app = self.create_app();

        let listener = TcpListener::bind((self.config.server.host.as_str(), self.config.server.port))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AppError::Internal(format!("Failed to read bound address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        // Spawn shutdown signal handler
        let shutdown_coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            shutdown_coordinator.wait_for_shutdown_signal().await;
        });

        let shutdown_coordinator = self.shutdown_coordinator.clone();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_coordinator.wait_for_shutdown().await;
            info!("Graceful shutdown initiated");
        })
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

        info!("Server shutdown complete");
        Ok(())
    }

    // Creates an application router
    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .nest("/health", create_health_routes())
            .nest("/api/v1", create_subscription_routes())
            .nest("/api", create_docs_routes())
            .with_state(self.clone());

        if self.config.metrics.enabled {
            app = app.layer(from_fn(metrics::metrics_middleware));
        }
        if self.config.logging.log_request {
            app = app.layer(from_fn(request_response_logger));
        }

        // Outermost, so the logger and handlers see the id
        app.layer(from_fn(request_id_middleware))
    }
}
